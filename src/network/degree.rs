use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::NetworkGraph;

/// Nodes singled out by connectivity.
///
/// `high` holds interchange candidates (degree > 2) with their degree, `low`
/// holds terminals and isolated stops (degree < 2). Through-stops of degree
/// exactly 2 belong to neither set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DegreeClasses {
    pub high: BTreeMap<String, usize>,
    pub low: BTreeSet<String>,
}

impl DegreeClasses {
    pub fn is_high(&self, name: &str) -> bool {
        self.high.contains_key(name)
    }

    pub fn is_low(&self, name: &str) -> bool {
        self.low.contains(name)
    }
}

pub fn classify_degrees(graph: &NetworkGraph) -> DegreeClasses {
    let mut classes = DegreeClasses::default();
    for (name, degree) in graph.degrees() {
        match degree {
            0 | 1 => {
                classes.low.insert(name.to_string());
            }
            2 => {}
            _ => {
                classes.high.insert(name.to_string(), degree);
            }
        }
    }
    classes
}
