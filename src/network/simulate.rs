use rand::Rng;
use rand::seq::IndexedRandom;
use std::collections::HashSet;
use tracing::info;

use crate::records::GeocodedRecord;

pub const DEFAULT_SAMPLE_SIZE: usize = 5;

/// Picks `sample_size` distinct stops at random, treats them as high-demand
/// and logs every route whose frequency would be increased to cover them.
///
/// Stops without coordinates are eligible; nothing is persisted.
pub fn simulate_dynamic_routing<R: Rng + ?Sized>(
    records: &[GeocodedRecord],
    sample_size: usize,
    rng: &mut R,
) {
    let mut seen = HashSet::new();
    let stops: Vec<&str> = records
        .iter()
        .map(GeocodedRecord::stop_name)
        .filter(|name| seen.insert(*name))
        .collect();

    for stop in stops.choose_multiple(rng, sample_size) {
        let mut routes = HashSet::new();
        for route in records
            .iter()
            .filter(|r| r.stop_name() == *stop)
            .map(GeocodedRecord::route_id)
            .filter(|route| routes.insert(*route))
        {
            info!(route, stop = *stop, "Increasing frequency of route to cover high-demand stop");
        }
    }
}
