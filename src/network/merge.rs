use std::collections::HashSet;
use thiserror::Error;
use tracing::info;

use super::{Route, RouteStop, TransitNetwork};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("No such route {route_id:?} in the network")]
    UnknownRoute { route_id: String },

    #[error("A route named {route_id:?} already exists")]
    DuplicateRoute { route_id: String },
}

/// What a merge changed. Informational only: merges cannot be undone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub merged_route: String,
    pub removed_nodes: usize,
    pub removed_edges: Vec<(String, String)>,
    pub added_edges: usize,
}

pub fn default_merge_name(route1: &str, route2: &str) -> String {
    format!("MergedRoute_{route1}_{route2}")
}

/// Replaces two routes by a single one named `new_name`.
///
/// Every stop of either route is removed from the graph together with all of
/// its edges, including edges contributed by other routes. The union of both
/// stop lists, in first-occurrence order of `route1 ++ route2`, is then
/// re-inserted as one consecutive chain. In the route table the merged route
/// takes the place of `route1` and `route2` disappears.
///
/// The network is left untouched when a route id is unknown or `new_name`
/// collides with a third route.
pub fn merge_routes(
    network: &mut TransitNetwork,
    route1: &str,
    route2: &str,
    new_name: &str,
) -> Result<MergeReport, NetworkError> {
    let unknown = |route_id: &str| NetworkError::UnknownRoute {
        route_id: route_id.to_string(),
    };
    let first = network
        .routes
        .iter()
        .position(|r| r.id == route1)
        .ok_or_else(|| unknown(route1))?;
    let second = network
        .routes
        .iter()
        .position(|r| r.id == route2)
        .ok_or_else(|| unknown(route2))?;
    if network
        .routes
        .iter()
        .any(|r| r.id == new_name && r.id != route1 && r.id != route2)
    {
        return Err(NetworkError::DuplicateRoute {
            route_id: new_name.to_string(),
        });
    }

    let mut seen = HashSet::new();
    let combined: Vec<RouteStop> = network.routes[first]
        .stops
        .iter()
        .chain(&network.routes[second].stops)
        .filter(|s| seen.insert(s.name.clone()))
        .cloned()
        .collect();

    let mut removed_edges = Vec::new();
    for stop in &combined {
        if let Some(neighbours) = network.graph.remove_node(&stop.name) {
            removed_edges.extend(neighbours.into_iter().map(|n| (stop.name.clone(), n)));
        }
    }

    for stop in &combined {
        network.graph.add_node(&stop.name, stop.coordinates);
    }
    let added_edges = combined
        .windows(2)
        .filter(|pair| network.graph.add_edge(&pair[0].name, &pair[1].name))
        .count();

    let merged = Route {
        id: new_name.to_string(),
        stops: combined,
    };
    let removed_nodes = seen.len();
    network.routes[first] = merged;
    if second != first {
        network.routes.remove(second);
    }

    info!(
        route1,
        route2,
        merged = new_name,
        removed_nodes,
        removed_edges = removed_edges.len(),
        added_edges,
        "Routes merged"
    );

    Ok(MergeReport {
        merged_route: new_name.to_string(),
        removed_nodes,
        removed_edges,
        added_edges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::tests::{geocoded, two_line_network};

    fn edges(network: &TransitNetwork) -> Vec<(String, String)> {
        network
            .graph
            .edges()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    fn pair(a: &str, b: &str) -> (String, String) {
        (a.to_string(), b.to_string())
    }

    #[test]
    fn test_merge_two_lines_into_chain() {
        let mut network = two_line_network();
        let report = merge_routes(&mut network, "10", "20", "10+20").unwrap();

        assert_eq!(report.removed_nodes, 4);
        assert_eq!(report.added_edges, 3);
        assert_eq!(edges(&network), vec![pair("A", "B"), pair("B", "C"), pair("C", "D")]);

        assert_eq!(network.routes.len(), 1);
        let merged = network.route("10+20").unwrap();
        assert_eq!(merged.stop_names().collect::<Vec<_>>(), vec!["A", "B", "C", "D"]);
        assert!(network.route("10").is_none());
        assert!(network.route("20").is_none());
    }

    #[test]
    fn test_merge_order_follows_concatenation() {
        let mut network = two_line_network();
        merge_routes(&mut network, "20", "10", "20+10").unwrap();

        // chain C-D-A-B replaces A-B, B-C, C-D
        assert_eq!(edges(&network), vec![pair("A", "B"), pair("A", "D"), pair("C", "D")]);
        assert!(!network.graph.has_edge("B", "C"));
        assert_eq!(network.graph.position("D"), two_line_network().graph.position("D"));
    }

    #[test]
    fn test_merge_cuts_edges_of_other_routes() {
        let mut network = TransitNetwork::from_records(&[
            geocoded("1", "A", 44.30, 8.47),
            geocoded("1", "B", 44.31, 8.48),
            geocoded("2", "C", 44.32, 8.49),
            geocoded("3", "B", 44.31, 8.48),
            geocoded("3", "E", 44.33, 8.50),
        ]);
        assert!(network.graph.has_edge("B", "E"));

        let report = merge_routes(&mut network, "1", "2", "M").unwrap();

        assert!(!network.graph.has_edge("B", "E"));
        assert!(report.removed_edges.contains(&pair("B", "E")));
        assert_eq!(network.routes.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["M", "3"]);
    }

    #[test]
    fn test_unknown_route_leaves_network_untouched() {
        let mut network = two_line_network();
        let before = network.clone();

        let err = merge_routes(&mut network, "10", "99", "x").unwrap_err();
        assert_eq!(
            err,
            NetworkError::UnknownRoute {
                route_id: "99".to_string()
            }
        );
        assert_eq!(network, before);
    }

    #[test]
    fn test_name_collision_is_rejected() {
        let mut network = TransitNetwork::from_records(&[
            geocoded("1", "A", 44.30, 8.47),
            geocoded("2", "B", 44.31, 8.48),
            geocoded("3", "C", 44.32, 8.49),
        ]);
        assert!(matches!(
            merge_routes(&mut network, "1", "2", "3"),
            Err(NetworkError::DuplicateRoute { .. })
        ));
    }

    #[test]
    fn test_default_merge_name() {
        assert_eq!(default_merge_name("31", "33"), "MergedRoute_31_33");
    }
}
