//! Bus network construction and analysis.
//!
//! [`TransitNetwork`] pairs the stop graph with the ordered route table it
//! was built from. The submodules derive views from it: degree classes,
//! distance scores, route merges and the demand simulation.

mod degree;
mod graph;
mod merge;
mod score;
mod simulate;

pub use degree::{DegreeClasses, classify_degrees};
pub use graph::NetworkGraph;
pub use merge::{MergeReport, NetworkError, default_merge_name, merge_routes};
pub use score::{RouteScore, geodesic_km, route_scores};
pub use simulate::{DEFAULT_SAMPLE_SIZE, simulate_dynamic_routing};

use tracing::{debug, info};

use crate::records::{Coordinates, GeocodedRecord};

/// A geocoded stop as it appears along a route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteStop {
    pub name: String,
    pub coordinates: Coordinates,
}

/// A route and its geocoded stops in timetable order.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub id: String,
    pub stops: Vec<RouteStop>,
}

impl Route {
    pub fn stop_names(&self) -> impl Iterator<Item = &str> {
        self.stops.iter().map(|s| s.name.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitNetwork {
    pub graph: NetworkGraph,
    pub routes: Vec<Route>,
}

impl TransitNetwork {
    /// Builds the network from geocoded rows.
    ///
    /// Rows without coordinates are dropped first. Routes keep the order in
    /// which their id first appears; a route whose stops all lack coordinates
    /// is left out. Consecutive stops of each route are linked.
    #[tracing::instrument(skip_all, fields(records = records.len()))]
    pub fn from_records(records: &[GeocodedRecord]) -> Self {
        let mut network = TransitNetwork::default();
        let mut dropped = 0usize;

        for geocoded in records {
            let Some(coordinates) = geocoded.coordinates else {
                dropped += 1;
                continue;
            };

            network.graph.add_node(geocoded.stop_name(), coordinates);
            let stop = RouteStop {
                name: geocoded.stop_name().to_string(),
                coordinates,
            };
            match network.route_mut(geocoded.route_id()) {
                Some(route) => route.stops.push(stop),
                None => network.routes.push(Route {
                    id: geocoded.route_id().to_string(),
                    stops: vec![stop],
                }),
            }
        }

        for route in &network.routes {
            for pair in route.stops.windows(2) {
                if !network.graph.add_edge(&pair[0].name, &pair[1].name) && pair[0].name == pair[1].name {
                    debug!(route = %route.id, stop = %pair[0].name, "Skipping self-loop");
                }
            }
        }

        info!(
            nodes = network.graph.node_count(),
            edges = network.graph.edge_count(),
            routes = network.routes.len(),
            dropped_without_coordinates = dropped,
            "Network graph built"
        );
        network
    }

    pub fn route(&self, id: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.id == id)
    }

    fn route_mut(&mut self, id: &str) -> Option<&mut Route> {
        self.routes.iter_mut().find(|r| r.id == id)
    }

    /// Ids of the routes stopping at `stop`, in route-table order.
    pub fn routes_serving(&self, stop: &str) -> Vec<&str> {
        self.routes
            .iter()
            .filter(|r| r.stop_names().any(|s| s == stop))
            .map(|r| r.id.as_str())
            .collect()
    }

    /// Every route-stop position; the input of the density heatmap.
    pub fn stop_positions(&self) -> Vec<Coordinates> {
        self.routes
            .iter()
            .flat_map(|r| r.stops.iter().map(|s| s.coordinates))
            .collect()
    }

    /// Mean latitude and longitude over all route stops.
    pub fn centroid(&self) -> Option<Coordinates> {
        let positions = self.stop_positions();
        if positions.is_empty() {
            return None;
        }
        let n = positions.len() as f64;
        let (lat, lon) = positions
            .iter()
            .fold((0.0, 0.0), |(lat, lon), c| (lat + c.latitude, lon + c.longitude));
        Some(Coordinates::new(lat / n, lon / n))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::records::RouteStopRecord;

    pub(crate) fn geocoded(route: &str, stop: &str, lat: f64, lon: f64) -> GeocodedRecord {
        GeocodedRecord {
            record: RouteStopRecord::new(route, stop, vec!["07:00".to_string()]),
            coordinates: Some(Coordinates::new(lat, lon)),
        }
    }

    pub(crate) fn missing(route: &str, stop: &str) -> GeocodedRecord {
        GeocodedRecord {
            record: RouteStopRecord::new(route, stop, vec![]),
            coordinates: None,
        }
    }

    /// LINEA 10: A, B, C then LINEA 20: C, D.
    pub(crate) fn two_line_network() -> TransitNetwork {
        TransitNetwork::from_records(&[
            geocoded("10", "A", 44.300, 8.470),
            geocoded("10", "B", 44.305, 8.475),
            geocoded("10", "C", 44.310, 8.480),
            geocoded("20", "C", 44.310, 8.480),
            geocoded("20", "D", 44.320, 8.490),
        ])
    }

    #[test]
    fn test_two_line_scenario() {
        let network = two_line_network();
        let g = &network.graph;

        let nodes: Vec<_> = g.nodes().map(|(n, _)| n).collect();
        assert_eq!(nodes, vec!["A", "B", "C", "D"]);
        let edges: Vec<_> = g.edges().collect();
        assert_eq!(edges, vec![("A", "B"), ("B", "C"), ("C", "D")]);
        assert_eq!(g.degree("C"), Some(2));
    }

    #[test]
    fn test_missing_coordinates_are_dropped() {
        let network = TransitNetwork::from_records(&[
            geocoded("1", "A", 44.30, 8.47),
            missing("1", "B"),
            geocoded("1", "C", 44.31, 8.48),
        ]);

        assert_eq!(network.graph.node_count(), 2);
        assert!(!network.graph.contains("B"));
        // the gap left by B does not break the chain
        assert!(network.graph.has_edge("A", "C"));
    }

    #[test]
    fn test_all_missing_gives_empty_graph() {
        let network = TransitNetwork::from_records(&[missing("1", "A"), missing("2", "B")]);
        assert!(network.graph.is_empty());
        assert!(network.routes.is_empty());
        assert!(network.centroid().is_none());
    }

    #[test]
    fn test_node_count_bounded_by_distinct_geocoded_names() {
        let network = TransitNetwork::from_records(&[
            geocoded("1", "A", 44.30, 8.47),
            geocoded("2", "A", 44.30, 8.47),
            geocoded("2", "a", 44.30, 8.47),
            missing("3", "Z"),
        ]);
        assert_eq!(network.graph.node_count(), 2);
    }

    #[test]
    fn test_shared_stop_pair_collapses() {
        let network = TransitNetwork::from_records(&[
            geocoded("1", "A", 44.30, 8.47),
            geocoded("1", "B", 44.31, 8.48),
            geocoded("2", "B", 44.31, 8.48),
            geocoded("2", "A", 44.30, 8.47),
        ]);
        assert_eq!(network.graph.edge_count(), 1);
    }

    #[test]
    fn test_repeated_stop_is_not_a_self_loop() {
        let network = TransitNetwork::from_records(&[
            geocoded("1", "A", 44.30, 8.47),
            geocoded("1", "A", 44.30, 8.47),
            geocoded("1", "B", 44.31, 8.48),
        ]);
        assert_eq!(network.graph.degree("A"), Some(1));
        assert_eq!(network.route("1").unwrap().stops.len(), 3);
    }

    #[test]
    fn test_routes_serving_and_centroid() {
        let network = two_line_network();
        assert_eq!(network.routes_serving("C"), vec!["10", "20"]);
        assert!(network.routes_serving("Z").is_empty());

        let c = network.centroid().unwrap();
        assert!((c.latitude - 44.309).abs() < 1e-9);
    }
}
