//! Parser for the raw, semicolon-delimited timetable export.
//!
//! The export interleaves route headers ("LINEA 31 ...") with one row per
//! stop. Parsing is a fold over the rows: [`ParseState::step`] consumes a row
//! and may emit the [`RouteGroup`] that the row closed.

use tracing::{debug, warn};

use crate::records::RouteStopRecord;

/// Prefix of the first cell of a route header row.
pub const MARKER_PREFIX: &str = "LINEA";

/// How a raw row is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKind {
    /// Route boundary carrying the new route id.
    Marker(String),
    Stop { name: String, times: Vec<String> },
    /// Nothing usable: blank row or a marker without a route token.
    Skip,
}

/// Classifies a single raw row.
pub fn classify_row<S: AsRef<str>>(row: &[S]) -> RowKind {
    if let Some(first) = row.first() {
        let first = first.as_ref();
        if first.starts_with(MARKER_PREFIX) {
            return match first.split_whitespace().nth(1) {
                Some(route) => RowKind::Marker(route.to_string()),
                None => {
                    warn!(cell = first, "Route marker without a route id, skipping row");
                    RowKind::Skip
                }
            };
        }
    }

    let mut cells = row
        .iter()
        .map(|c| c.as_ref())
        .filter(|c| !c.trim().is_empty())
        .map(str::to_string);

    match cells.next() {
        Some(name) => RowKind::Stop {
            name,
            times: cells.collect(),
        },
        None => RowKind::Skip,
    }
}

/// Stop rows collected between two route markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGroup {
    pub route_id: String,
    pub stops: Vec<(String, Vec<String>)>,
}

impl RouteGroup {
    /// Number of time columns needed by the widest stop row of the group.
    pub fn width(&self) -> usize {
        self.stops.iter().map(|(_, t)| t.len()).max().unwrap_or(0)
    }

    pub fn into_records(self) -> Vec<RouteStopRecord> {
        let route_id = self.route_id;
        self.stops
            .into_iter()
            .map(|(stop_name, times)| RouteStopRecord {
                route_id: route_id.clone(),
                stop_name,
                times,
            })
            .collect()
    }
}

/// Accumulator of the parsing fold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseState {
    current_route: Option<String>,
    pending: Vec<(String, Vec<String>)>,
    orphaned: usize,
}

impl ParseState {
    pub fn current_route(&self) -> Option<&str> {
        self.current_route.as_deref()
    }

    /// Number of stop rows dropped because no marker preceded them.
    pub fn orphaned_rows(&self) -> usize {
        self.orphaned
    }

    /// Consumes one raw row, returning the next state and the group closed by
    /// the row, if any.
    pub fn step<S: AsRef<str>>(mut self, row: &[S]) -> (ParseState, Option<RouteGroup>) {
        match classify_row(row) {
            RowKind::Marker(route) => {
                let flushed = self.take_group();
                debug!(route = %route, "Route marker");
                self.current_route = Some(route);
                (self, flushed)
            }
            RowKind::Stop { name, times } => {
                if self.current_route.is_some() {
                    self.pending.push((name, times));
                } else {
                    warn!(stop = %name, "Stop row before any route marker, dropping");
                    self.orphaned += 1;
                }
                (self, None)
            }
            RowKind::Skip => (self, None),
        }
    }

    /// Flushes the last group at end of input.
    pub fn finish(mut self) -> Option<RouteGroup> {
        self.take_group()
    }

    fn take_group(&mut self) -> Option<RouteGroup> {
        if self.pending.is_empty() {
            return None;
        }
        let route_id = self.current_route.clone()?;
        Some(RouteGroup {
            route_id,
            stops: std::mem::take(&mut self.pending),
        })
    }
}

/// Folds all raw rows into route groups, in file order.
pub fn parse_groups<I, R>(rows: I) -> Vec<RouteGroup>
where
    I: IntoIterator<Item = R>,
    R: AsRef<[String]>,
{
    let (state, mut groups) = rows.into_iter().fold(
        (ParseState::default(), Vec::new()),
        |(state, mut groups), row| {
            let (state, flushed) = state.step(row.as_ref());
            groups.extend(flushed);
            (state, groups)
        },
    );

    if state.orphaned_rows() > 0 {
        warn!(
            rows = state.orphaned_rows(),
            "Dropped stop rows preceding the first route marker"
        );
    }
    groups.extend(state.finish());
    groups
}

/// Parses raw rows straight into long-format records.
pub fn parse_timetable<I, R>(rows: I) -> Vec<RouteStopRecord>
where
    I: IntoIterator<Item = R>,
    R: AsRef<[String]>,
{
    parse_groups(rows)
        .into_iter()
        .flat_map(RouteGroup::into_records)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_classify_marker() {
        assert_eq!(
            classify_row(&["LINEA 31 Zinola - Legino", "", ""]),
            RowKind::Marker("31".to_string())
        );
    }

    #[test]
    fn test_indented_marker_is_a_stop_row() {
        assert_eq!(
            classify_row(&[" LINEA 10", "07:00"]),
            RowKind::Stop {
                name: " LINEA 10".to_string(),
                times: vec!["07:00".to_string()],
            }
        );
    }

    #[test]
    fn test_classify_marker_without_id_is_skipped() {
        assert_eq!(classify_row(&["LINEA", "07:00"]), RowKind::Skip);
    }

    #[test]
    fn test_classify_stop_strips_empty_cells() {
        assert_eq!(
            classify_row(&["", "Via Paleocapa", "", "07:10", " ", "07:40"]),
            RowKind::Stop {
                name: "Via Paleocapa".to_string(),
                times: vec!["07:10".to_string(), "07:40".to_string()],
            }
        );
    }

    #[test]
    fn test_classify_blank_row() {
        assert_eq!(classify_row(&["", "  ", ""]), RowKind::Skip);
        assert_eq!(classify_row::<&str>(&[]), RowKind::Skip);
    }

    #[test]
    fn test_step_flushes_previous_route_on_marker() {
        let state = ParseState::default();
        let (state, out) = state.step(&["LINEA 10"]);
        assert!(out.is_none());
        let (state, out) = state.step(&["A", "07:00"]);
        assert!(out.is_none());
        let (state, out) = state.step(&["LINEA 20"]);
        let group = out.expect("group for route 10");
        assert_eq!(group.route_id, "10");
        assert_eq!(group.stops.len(), 1);
        assert_eq!(state.current_route(), Some("20"));
        assert!(state.finish().is_none());
    }

    #[test]
    fn test_parse_assigns_most_recent_marker() {
        let raw = rows(&[
            &["LINEA 10", ""],
            &["A", "07:00", "08:00"],
            &["B", "07:05"],
            &["", ""],
            &["LINEA 20", ""],
            &["C", "09:00"],
        ]);
        let records = parse_timetable(&raw);

        assert_eq!(records.len(), 3);
        assert_eq!(records[0], RouteStopRecord::new("10", "A", vec!["07:00".into(), "08:00".into()]));
        assert_eq!(records[1].route_id, "10");
        assert_eq!(records[2].route_id, "20");
        assert_eq!(records[2].stop_name, "C");
    }

    #[test]
    fn test_rows_before_first_marker_are_dropped() {
        let raw = rows(&[&["Orphan", "06:00"], &["LINEA 5"], &["A", "07:00"]]);
        let records = parse_timetable(&raw);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].stop_name, "A");
        assert!(records.iter().all(|r| !r.route_id.is_empty()));
    }

    #[test]
    fn test_consecutive_markers_emit_no_empty_group() {
        let raw = rows(&[&["LINEA 1"], &["LINEA 2"], &["X", "10:00"]]);
        let groups = parse_groups(&raw);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].route_id, "2");
    }

    #[test]
    fn test_group_width_is_widest_row() {
        let raw = rows(&[&["LINEA 7"], &["A", "1", "2", "3"], &["B", "1"]]);
        let groups = parse_groups(&raw);
        assert_eq!(groups[0].width(), 3);
    }

    #[test]
    fn test_reparsing_marker_form_is_idempotent() {
        let raw = rows(&[
            &["LINEA 10"],
            &["A", "07:00"],
            &["B", "07:05", "08:05"],
            &["LINEA 20"],
            &["C", "09:00"],
        ]);
        let first = parse_groups(&raw);

        let regenerated: Vec<Vec<String>> = first
            .iter()
            .flat_map(|g| {
                std::iter::once(vec![format!("{MARKER_PREFIX} {}", g.route_id)]).chain(
                    g.stops.iter().map(|(name, times)| {
                        std::iter::once(name.clone()).chain(times.iter().cloned()).collect()
                    }),
                )
            })
            .collect();

        assert_eq!(parse_groups(&regenerated), first);
    }
}
