use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::network::{DegreeClasses, RouteScore, TransitNetwork};

/// One row of the run history written by `analyze`.
#[derive(Debug, Default, Serialize)]
pub struct NetworkSummary {
    pub timestamp: DateTime<Utc>,
    pub source: Option<String>,

    // input
    pub records: usize,
    pub geocoded_records: usize,

    // graph
    pub nodes: usize,
    pub edges: usize,
    pub routes: usize,
    pub high_degree_nodes: usize,
    pub low_degree_nodes: usize,

    // scores
    pub mean_route_score_km: f64,
    pub max_route_score_km: f64,

    pub merged_routes: Option<String>,
}

impl NetworkSummary {
    /// Summarises a network as built, before any merge.
    pub fn from_network(
        network: &TransitNetwork,
        classes: &DegreeClasses,
        scores: &[RouteScore],
    ) -> Self {
        let values: Vec<f64> = scores.iter().map(|s| s.mean_distance_km).collect();

        NetworkSummary {
            timestamp: Utc::now(),
            nodes: network.graph.node_count(),
            edges: network.graph.edge_count(),
            routes: network.routes.len(),
            high_degree_nodes: classes.high.len(),
            low_degree_nodes: classes.low.len(),
            mean_route_score_km: mean(&values),
            max_route_score_km: values.iter().copied().fold(0.0, f64::max),
            ..Default::default()
        }
    }

    pub fn with_input(mut self, source: &str, records: usize, geocoded_records: usize) -> Self {
        self.source = Some(source.to_string());
        self.records = records;
        self.geocoded_records = geocoded_records;
        self
    }

    /// Records the names of the routes produced by merges.
    pub fn with_merges(mut self, merged: &[String]) -> Self {
        if !merged.is_empty() {
            self.merged_routes = Some(merged.join("|"));
        }
        self
    }

    /// Share of input records that carried coordinates, in percent.
    pub fn geocoded_pct(&self) -> f64 {
        pct(self.geocoded_records, self.records)
    }
}

pub fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(pct(50, 100), 50.0);
        assert_eq!(pct(1, 4), 25.0);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
    }

    #[test]
    fn test_with_merges() {
        let summary = NetworkSummary::default().with_merges(&[]);
        assert!(summary.merged_routes.is_none());

        let summary = NetworkSummary::default()
            .with_merges(&["MergedRoute_31_33".to_string(), "A+B".to_string()]);
        assert_eq!(summary.merged_routes.as_deref(), Some("MergedRoute_31_33|A+B"));
    }

    #[test]
    fn test_geocoded_pct() {
        let summary = NetworkSummary::default().with_input("in.csv", 8, 6);
        assert_eq!(summary.geocoded_pct(), 75.0);
    }
}
