//! Timetable adjustment for high-demand stops.
//!
//! A stop is "high demand" when it has strictly more scheduled times than the
//! average stop of the table. Its empty time slots are filled with a
//! placeholder departure so that the adjusted table shows every slot served.

use chrono::NaiveTime;
use tracing::debug;

use crate::records::{RouteStopRecord, table_width};
use crate::stats::mean;

/// Placeholder departure for a 1-based time slot: odd slots at 08:30, even
/// slots at 08:00.
pub fn placeholder_time(slot: usize) -> NaiveTime {
    let minute = if slot % 2 == 1 { 30 } else { 0 };
    NaiveTime::from_hms_opt(8, minute, 0).unwrap_or_default()
}

/// Returns a copy of `records` where every high-demand record has its empty
/// slots, up to the table width, filled with [`placeholder_time`].
pub fn adjust_for_high_demand(records: &[RouteStopRecord]) -> Vec<RouteStopRecord> {
    let counts: Vec<f64> = records
        .iter()
        .map(|r| r.scheduled_times() as f64)
        .collect();
    let threshold = mean(&counts);
    let width = table_width(records);

    records
        .iter()
        .map(|record| {
            if (record.scheduled_times() as f64) <= threshold {
                return record.clone();
            }

            debug!(
                route = %record.route_id,
                stop = %record.stop_name,
                times = record.scheduled_times(),
                threshold,
                "Filling empty slots of high-demand stop"
            );

            let mut times = record.times.clone();
            times.resize(width, String::new());
            for (idx, slot) in times.iter_mut().enumerate() {
                if slot.trim().is_empty() {
                    *slot = placeholder_time(idx + 1).format("%H:%M").to_string();
                }
            }

            RouteStopRecord {
                times,
                ..record.clone()
            }
        })
        .collect()
}
