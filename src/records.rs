//! Row-level data model shared by the three pipeline stages.

use serde::Serialize;

/// A latitude/longitude pair in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns `true` when both components are finite and inside the valid
    /// degree ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// `(longitude, latitude)`, the x/y order used for plotting.
    pub fn position(&self) -> (f64, f64) {
        (self.longitude, self.latitude)
    }

    pub fn to_point(self) -> geo::Point<f64> {
        geo::Point::new(self.longitude, self.latitude)
    }
}

/// One row of the long-format timetable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteStopRecord {
    pub route_id: String,
    pub stop_name: String,
    pub times: Vec<String>,
}

impl RouteStopRecord {
    pub fn new(route_id: &str, stop_name: &str, times: Vec<String>) -> Self {
        Self {
            route_id: route_id.to_string(),
            stop_name: stop_name.to_string(),
            times,
        }
    }

    /// Number of scheduled (non-empty) times at this stop.
    pub fn scheduled_times(&self) -> usize {
        self.times.iter().filter(|t| !t.trim().is_empty()).count()
    }
}

/// Result of geocoding one distinct stop name.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedStop {
    pub stop_name: String,
    pub coordinates: Option<Coordinates>,
}

/// A timetable row joined with the coordinates of its stop.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedRecord {
    pub record: RouteStopRecord,
    pub coordinates: Option<Coordinates>,
}

impl GeocodedRecord {
    pub fn route_id(&self) -> &str {
        &self.record.route_id
    }

    pub fn stop_name(&self) -> &str {
        &self.record.stop_name
    }
}

/// Widest `times` vector across `records`; the number of time columns a table
/// holding them needs.
pub fn table_width<'a>(records: impl IntoIterator<Item = &'a RouteStopRecord>) -> usize {
    records
        .into_iter()
        .map(|r| r.times.len())
        .max()
        .unwrap_or(0)
}
