use petgraph::stable_graph::{NodeIndex, StableUnGraph};
use std::collections::{BTreeMap, BTreeSet};

use crate::records::Coordinates;

#[derive(Debug, Clone)]
struct StopNode {
    name: String,
    coordinates: Coordinates,
}

/// Undirected simple graph of stops keyed by stop name.
///
/// Parallel edges collapse into one and self-loops are never stored, so the
/// degree of a node is its number of distinct neighbours. Indices stay valid
/// across removals, and `index` maps every stop name to its node.
#[derive(Debug, Clone, Default)]
pub struct NetworkGraph {
    graph: StableUnGraph<StopNode, ()>,
    index: BTreeMap<String, NodeIndex>,
}

impl NetworkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node, or updates the position of an existing one.
    pub fn add_node(&mut self, name: &str, coordinates: Coordinates) {
        if let Some(node) = self
            .index
            .get(name)
            .and_then(|&ix| self.graph.node_weight_mut(ix))
        {
            node.coordinates = coordinates;
            return;
        }
        let ix = self.graph.add_node(StopNode {
            name: name.to_string(),
            coordinates,
        });
        self.index.insert(name.to_string(), ix);
    }

    /// Links two existing nodes. Returns `false` for self-loops, unknown
    /// nodes and edges already present.
    pub fn add_edge(&mut self, a: &str, b: &str) -> bool {
        let (Some(&ia), Some(&ib)) = (self.index.get(a), self.index.get(b)) else {
            return false;
        };
        if ia == ib || self.graph.find_edge(ia, ib).is_some() {
            return false;
        }
        self.graph.add_edge(ia, ib, ());
        true
    }

    /// Removes a node with all its incident edges and returns its former
    /// neighbours.
    pub fn remove_node(&mut self, name: &str) -> Option<BTreeSet<String>> {
        let ix = self.index.remove(name)?;
        let neighbours = self
            .graph
            .neighbors(ix)
            .filter_map(|n| self.graph.node_weight(n))
            .map(|n| n.name.clone())
            .collect();
        self.graph.remove_node(ix);
        Some(neighbours)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn position(&self, name: &str) -> Option<Coordinates> {
        let ix = *self.index.get(name)?;
        self.graph.node_weight(ix).map(|n| n.coordinates)
    }

    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        match (self.index.get(a), self.index.get(b)) {
            (Some(&ia), Some(&ib)) => self.graph.find_edge(ia, ib).is_some(),
            _ => false,
        }
    }

    pub fn degree(&self, name: &str) -> Option<usize> {
        let ix = *self.index.get(name)?;
        Some(self.graph.neighbors(ix).count())
    }

    /// Nodes with their positions, sorted by name.
    pub fn nodes(&self) -> impl Iterator<Item = (&str, Coordinates)> {
        self.index.iter().filter_map(|(name, &ix)| {
            self.graph
                .node_weight(ix)
                .map(|n| (name.as_str(), n.coordinates))
        })
    }

    /// Nodes with their degrees, sorted by name.
    pub fn degrees(&self) -> impl Iterator<Item = (&str, usize)> {
        self.index
            .iter()
            .map(|(name, &ix)| (name.as_str(), self.graph.neighbors(ix).count()))
    }

    /// Each edge once, as `(a, b)` with `a < b`, sorted.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        let mut edges: Vec<(&str, &str)> = self
            .graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .filter_map(|(ia, ib)| {
                let a = self.graph.node_weight(ia)?.name.as_str();
                let b = self.graph.node_weight(ib)?.name.as_str();
                Some(if a < b { (a, b) } else { (b, a) })
            })
            .collect();
        edges.sort_unstable();
        edges.into_iter()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}

impl PartialEq for NetworkGraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes().eq(other.nodes()) && self.edges().eq(other.edges())
    }
}
