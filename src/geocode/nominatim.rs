use anyhow::Context;
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use super::{GeocodeError, Geocoder};
use crate::fetch::{HttpClient, fetch_bytes};
use crate::records::Coordinates;

pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = "Savona_urban_mobility_analysis";

#[derive(Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

/// Geocoder backed by a Nominatim-compatible `/search` endpoint.
pub struct NominatimGeocoder<C> {
    client: C,
    search_url: Url,
}

impl<C: HttpClient> NominatimGeocoder<C> {
    pub fn new(client: C, endpoint: &str) -> anyhow::Result<Self> {
        let search_url = Url::parse(&format!("{}/search", endpoint.trim_end_matches('/')))
            .with_context(|| format!("invalid geocoder endpoint '{endpoint}'"))?;
        Ok(Self { client, search_url })
    }

    fn search(&self, query: &str) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("format", "json")
            .append_pair("limit", "1");
        url
    }
}

#[async_trait]
impl<C: HttpClient> Geocoder for NominatimGeocoder<C> {
    async fn resolve(&self, query: &str) -> Result<Option<Coordinates>, GeocodeError> {
        let (status, body) = fetch_bytes(&self.client, self.search(query)).await?;
        if !status.is_success() {
            return Err(GeocodeError::Status { status });
        }
        debug!(query, bytes = body.len(), "Geocoder response received");
        parse_search_response(&body)
    }
}

/// Reads the first place of a `/search?format=json` answer. An empty array
/// means no match.
pub fn parse_search_response(body: &[u8]) -> Result<Option<Coordinates>, GeocodeError> {
    let places: Vec<Place> = serde_json::from_slice(body)?;
    let Some(place) = places.into_iter().next() else {
        return Ok(None);
    };

    let parse = |value: &str| {
        value
            .trim()
            .parse::<f64>()
            .map_err(|_| GeocodeError::InvalidCoordinate {
                value: value.to_string(),
            })
    };
    let coordinates = Coordinates::new(parse(&place.lat)?, parse(&place.lon)?);
    if !coordinates.is_valid() {
        return Err(GeocodeError::InvalidCoordinate {
            value: format!("{},{}", place.lat, place.lon),
        });
    }
    Ok(Some(coordinates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;
    use reqwest::StatusCode;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers every request with a fixed status and body.
    struct CannedClient {
        status: StatusCode,
        body: &'static str,
        urls: Mutex<Vec<String>>,
    }

    impl CannedClient {
        fn new(status: StatusCode, body: &'static str) -> Self {
            Self {
                status,
                body,
                urls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpClient for CannedClient {
        async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            self.urls.lock().unwrap().push(req.url().to_string());
            let resp = http::Response::builder()
                .status(self.status)
                .body(self.body)
                .unwrap();
            Ok(reqwest::Response::from(resp))
        }
    }

    #[tokio::test]
    async fn test_resolve_error_status() {
        let client = CannedClient::new(StatusCode::SERVICE_UNAVAILABLE, "busy");
        let geocoder = NominatimGeocoder::new(client, DEFAULT_ENDPOINT).unwrap();

        let err = geocoder.resolve("Piazza Mameli, Savona, Italy").await.unwrap_err();
        assert!(matches!(
            err,
            GeocodeError::Status { status } if status == StatusCode::SERVICE_UNAVAILABLE
        ));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_resolve_forbidden_status_is_permanent() {
        let client = CannedClient::new(StatusCode::FORBIDDEN, "");
        let geocoder = NominatimGeocoder::new(client, DEFAULT_ENDPOINT).unwrap();

        let err = geocoder.resolve("Via Paleocapa").await.unwrap_err();
        assert!(matches!(err, GeocodeError::Status { .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_resolve_success() {
        let client = CannedClient::new(StatusCode::OK, r#"[{"lat": "44.3079", "lon": "8.4810"}]"#);
        let geocoder = NominatimGeocoder::new(client, "https://example.org").unwrap();

        let found = geocoder.resolve("Piazza Mameli").await.unwrap();
        assert_eq!(found, Some(Coordinates::new(44.3079, 8.4810)));

        let urls = geocoder.client.urls.lock().unwrap();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].starts_with("https://example.org/search?q=Piazza+Mameli"));
    }

    #[test]
    fn test_parse_first_place() {
        let body = br#"[
            {"place_id": 1, "lat": "44.3079", "lon": "8.4810", "display_name": "Piazza Mameli, Savona"},
            {"place_id": 2, "lat": "0", "lon": "0"}
        ]"#;
        let coordinates = parse_search_response(body).unwrap().unwrap();
        assert_eq!(coordinates, Coordinates::new(44.3079, 8.4810));
    }

    #[test]
    fn test_parse_no_match() {
        assert_eq!(parse_search_response(b"[]").unwrap(), None);
    }

    #[test]
    fn test_parse_malformed_body() {
        let err = parse_search_response(b"<html>rate limited</html>").unwrap_err();
        assert!(matches!(err, GeocodeError::Decode(_)));
    }

    #[test]
    fn test_parse_bad_coordinate() {
        let err = parse_search_response(br#"[{"lat": "abc", "lon": "8.48"}]"#).unwrap_err();
        assert!(matches!(err, GeocodeError::InvalidCoordinate { .. }));

        let err = parse_search_response(br#"[{"lat": "144.0", "lon": "8.48"}]"#).unwrap_err();
        assert!(matches!(err, GeocodeError::InvalidCoordinate { .. }));
    }

    #[test]
    fn test_search_url_encodes_query() {
        let client = BasicClient::new(DEFAULT_USER_AGENT, Duration::from_secs(5)).unwrap();
        let geocoder = NominatimGeocoder::new(client, "https://example.org/").unwrap();
        let url = geocoder.search("Via Paleocapa, Savona, Italy");

        assert_eq!(url.path(), "/search");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("q".to_string(), "Via Paleocapa, Savona, Italy".to_string()));
        assert!(pairs.contains(&("format".to_string(), "json".to_string())));
        assert!(pairs.contains(&("limit".to_string(), "1".to_string())));
    }
}
