use geo::{Distance, Geodesic};
use serde::Serialize;

use super::TransitNetwork;
use crate::records::Coordinates;
use crate::stats::mean;

/// Average spacing between consecutive stops of a route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteScore {
    pub route_id: String,
    pub stops: usize,
    pub segments: usize,
    pub mean_distance_km: f64,
}

/// Geodesic distance on the WGS84 ellipsoid, in kilometres.
pub fn geodesic_km(a: Coordinates, b: Coordinates) -> f64 {
    Geodesic.distance(a.to_point(), b.to_point()) / 1000.0
}

/// Scores every route of the network, in route-table order.
///
/// A route with a single geocoded stop has no segment and scores `0.0`.
pub fn route_scores(network: &TransitNetwork) -> Vec<RouteScore> {
    network
        .routes
        .iter()
        .map(|route| {
            let distances: Vec<f64> = route
                .stops
                .windows(2)
                .map(|pair| geodesic_km(pair[0].coordinates, pair[1].coordinates))
                .collect();
            RouteScore {
                route_id: route.id.clone(),
                stops: route.stops.len(),
                segments: distances.len(),
                mean_distance_km: mean(&distances),
            }
        })
        .collect()
}
