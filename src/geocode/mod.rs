//! Stop-name geocoding.
//!
//! [`Geocoder`] is the lookup capability; [`NominatimGeocoder`] implements it
//! over HTTP and [`RateLimited`] paces any implementation. [`resolve_stops`]
//! is the batch step: one lookup per distinct stop name, failures recorded as
//! missing coordinates.

mod error;
mod nominatim;
mod rate_limit;

pub use error::GeocodeError;
pub use nominatim::{DEFAULT_ENDPOINT, DEFAULT_USER_AGENT, NominatimGeocoder, parse_search_response};
pub use rate_limit::{DEFAULT_ERROR_WAIT, DEFAULT_MAX_RETRIES, DEFAULT_MIN_INTERVAL, RateLimited};

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::records::{Coordinates, GeocodedRecord, GeocodedStop, RouteStopRecord};

/// Region appended to every stop name before lookup.
pub const DEFAULT_REGION: &str = "Savona, Italy";

/// Resolves a free-text place query to coordinates. `Ok(None)` means the
/// service found no match.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<Option<Coordinates>, GeocodeError>;
}

/// Builds the lookup query for a stop, e.g. `"Piazza Mameli, Savona, Italy"`.
pub fn stop_query(stop_name: &str, region: &str) -> String {
    let region = region.trim();
    if region.is_empty() {
        stop_name.to_string()
    } else {
        format!("{stop_name}, {region}")
    }
}

/// Distinct stop names in first-appearance order.
pub fn distinct_stop_names(records: &[RouteStopRecord]) -> Vec<&str> {
    let mut seen = HashSet::new();
    records
        .iter()
        .map(|r| r.stop_name.as_str())
        .filter(|name| seen.insert(*name))
        .collect()
}

/// Geocodes every distinct name exactly once, sequentially. A failed lookup
/// is logged and yields `None`; it never aborts the batch.
#[tracing::instrument(skip_all, fields(region = %region))]
pub async fn resolve_stops<G>(geocoder: &G, names: &[&str], region: &str) -> Vec<GeocodedStop>
where
    G: Geocoder + ?Sized,
{
    let mut seen = HashSet::new();
    let mut stops = Vec::new();
    let (mut matched, mut unmatched, mut failed) = (0usize, 0usize, 0usize);

    for name in names.iter().copied().filter(|n| seen.insert(*n)) {
        let query = stop_query(name, region);
        let coordinates = match geocoder.resolve(&query).await {
            Ok(Some(c)) => {
                debug!(stop = name, latitude = c.latitude, longitude = c.longitude, "Stop geocoded");
                matched += 1;
                Some(c)
            }
            Ok(None) => {
                debug!(stop = name, "No match for stop");
                unmatched += 1;
                None
            }
            Err(e) => {
                warn!(stop = name, error = %e, "Error geocoding stop");
                failed += 1;
                None
            }
        };
        stops.push(GeocodedStop {
            stop_name: name.to_string(),
            coordinates,
        });
    }

    info!(
        distinct = stops.len(),
        matched, unmatched, failed, "Stop geocoding finished"
    );
    stops
}

/// Joins resolved coordinates onto every record of the timetable.
pub fn attach_coordinates(
    records: Vec<RouteStopRecord>,
    stops: &[GeocodedStop],
) -> Vec<GeocodedRecord> {
    let by_name: HashMap<&str, Option<Coordinates>> = stops
        .iter()
        .map(|s| (s.stop_name.as_str(), s.coordinates))
        .collect();

    records
        .into_iter()
        .map(|record| {
            let coordinates = by_name.get(record.stop_name.as_str()).copied().flatten();
            GeocodedRecord {
                record,
                coordinates,
            }
        })
        .collect()
}

/// Resolves the stops of `records` and returns the augmented table.
pub async fn geocode_records<G>(
    geocoder: &G,
    records: Vec<RouteStopRecord>,
    region: &str,
) -> Vec<GeocodedRecord>
where
    G: Geocoder + ?Sized,
{
    let stops = {
        let names = distinct_stop_names(&records);
        resolve_stops(geocoder, &names, region).await
    };
    attach_coordinates(records, &stops)
}
