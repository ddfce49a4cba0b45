//! Reading and writing the pipeline's flat tables.
//!
//! - raw export: semicolon-delimited, no header, ragged rows
//! - route table: `Route,Stop Name,Time 1..Time N`
//! - geocoded table: the route table plus `Latitude,Longitude`

use anyhow::{Context, Result, anyhow};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use encoding_rs::WINDOWS_1252;
use std::path::Path;
use tracing::{debug, warn};

use crate::output::with_atomic_path;
use crate::records::{Coordinates, GeocodedRecord, RouteStopRecord, table_width};

pub const ROUTE_COLUMN: &str = "Route";
pub const STOP_COLUMN: &str = "Stop Name";
pub const LATITUDE_COLUMN: &str = "Latitude";
pub const LONGITUDE_COLUMN: &str = "Longitude";

/// Decodes one raw cell. Spreadsheet exports are often Windows-1252 rather
/// than UTF-8, so a cell that is not valid UTF-8 is read as Windows-1252,
/// which maps every byte and keeps distinct names distinct.
fn decode_cell(cell: &[u8]) -> (String, bool) {
    match std::str::from_utf8(cell) {
        Ok(text) => (text.to_string(), false),
        Err(_) => {
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(cell);
            (text.into_owned(), true)
        }
    }
}

/// Reads every row of the raw export. Cells that are not valid UTF-8 are
/// decoded as Windows-1252.
pub fn read_raw_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open timetable export '{}'", path.display()))?;

    let mut rows = Vec::new();
    let mut legacy_rows = 0usize;
    for (row_number, result) in reader.byte_records().enumerate() {
        let record = result
            .with_context(|| format!("failed to read row of '{}'", path.display()))?;
        let mut legacy = false;
        let row: Vec<String> = record
            .iter()
            .map(|cell| {
                let (text, fallback) = decode_cell(cell);
                legacy |= fallback;
                text
            })
            .collect();
        if legacy {
            legacy_rows += 1;
            debug!(row = row_number + 1, "Row is not valid UTF-8, decoded as Windows-1252");
        }
        rows.push(row);
    }

    if legacy_rows > 0 {
        warn!(
            path = %path.display(),
            rows = legacy_rows,
            "Export is not UTF-8, decoded as Windows-1252"
        );
    }
    debug!(path = %path.display(), rows = rows.len(), "Raw export loaded");
    Ok(rows)
}

fn header(width: usize, with_coordinates: bool) -> Vec<String> {
    let mut columns = vec![ROUTE_COLUMN.to_string(), STOP_COLUMN.to_string()];
    columns.extend((1..=width).map(|i| format!("Time {i}")));
    if with_coordinates {
        columns.push(LATITUDE_COLUMN.to_string());
        columns.push(LONGITUDE_COLUMN.to_string());
    }
    columns
}

fn record_row(record: &RouteStopRecord, width: usize) -> Vec<String> {
    let mut row = Vec::with_capacity(width + 2);
    row.push(record.route_id.clone());
    row.push(record.stop_name.clone());
    row.extend(record.times.iter().cloned());
    row.resize(width + 2, String::new());
    row
}

/// Writes the long-format route table, padding short rows with empty slots.
pub fn write_route_table(path: &Path, records: &[RouteStopRecord]) -> Result<()> {
    let width = table_width(records);

    with_atomic_path(path, |tmp| {
        let mut writer = WriterBuilder::new().from_path(tmp)?;
        writer.write_record(header(width, false))?;
        for record in records {
            writer.write_record(record_row(record, width))?;
        }
        writer.flush()?;
        Ok(())
    })
    .with_context(|| format!("failed to write route table '{}'", path.display()))?;

    debug!(path = %path.display(), rows = records.len(), width, "Route table written");
    Ok(())
}

/// Writes the route table augmented with nullable `Latitude`/`Longitude`.
pub fn write_geocoded_table(path: &Path, records: &[GeocodedRecord]) -> Result<()> {
    let width = table_width(records.iter().map(|r| &r.record));

    with_atomic_path(path, |tmp| {
        let mut writer = WriterBuilder::new().from_path(tmp)?;
        writer.write_record(header(width, true))?;
        for geocoded in records {
            let mut row = record_row(&geocoded.record, width);
            match geocoded.coordinates {
                Some(c) => {
                    row.push(c.latitude.to_string());
                    row.push(c.longitude.to_string());
                }
                None => {
                    row.push(String::new());
                    row.push(String::new());
                }
            }
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    })
    .with_context(|| format!("failed to write geocoded table '{}'", path.display()))?;

    debug!(path = %path.display(), rows = records.len(), width, "Geocoded table written");
    Ok(())
}

/// Column positions resolved from a table header.
struct Layout {
    route: usize,
    stop: usize,
    times: Vec<usize>,
    latitude: Option<usize>,
    longitude: Option<usize>,
}

impl Layout {
    fn from_header(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);

        let route = find(ROUTE_COLUMN).ok_or_else(|| anyhow!("missing '{ROUTE_COLUMN}' column"))?;
        let stop = find(STOP_COLUMN).ok_or_else(|| anyhow!("missing '{STOP_COLUMN}' column"))?;
        let times = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| h.contains("Time"))
            .map(|(i, _)| i)
            .collect();

        Ok(Layout {
            route,
            stop,
            times,
            latitude: find(LATITUDE_COLUMN),
            longitude: find(LONGITUDE_COLUMN),
        })
    }

    fn record(&self, row: &StringRecord) -> RouteStopRecord {
        let cell = |i: usize| row.get(i).unwrap_or("").to_string();
        RouteStopRecord {
            route_id: cell(self.route),
            stop_name: cell(self.stop),
            times: self
                .times
                .iter()
                .filter_map(|&i| row.get(i))
                .filter(|t| !t.trim().is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Unparseable or out-of-range values read as missing.
    fn coordinates(&self, row: &StringRecord) -> Option<Coordinates> {
        let parse = |i: Option<usize>| row.get(i?)?.trim().parse::<f64>().ok();
        let coordinates = Coordinates::new(parse(self.latitude)?, parse(self.longitude)?);
        coordinates.is_valid().then_some(coordinates)
    }
}

fn read_rows(path: &Path) -> Result<(Layout, Vec<StringRecord>)> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open table '{}'", path.display()))?;

    let layout = Layout::from_header(reader.headers()?)
        .with_context(|| format!("unexpected header in '{}'", path.display()))?;

    let rows = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to read rows of '{}'", path.display()))?;

    Ok((layout, rows))
}

/// Reads a route table. Empty time cells are dropped, so `times` holds only
/// scheduled values.
pub fn read_route_table(path: &Path) -> Result<Vec<RouteStopRecord>> {
    let (layout, rows) = read_rows(path)?;
    Ok(rows.iter().map(|row| layout.record(row)).collect())
}

/// Reads a geocoded table. Fails if the coordinate columns are absent.
pub fn read_geocoded_table(path: &Path) -> Result<Vec<GeocodedRecord>> {
    let (layout, rows) = read_rows(path)?;
    if layout.latitude.is_none() || layout.longitude.is_none() {
        return Err(anyhow!(
            "'{}' has no {LATITUDE_COLUMN}/{LONGITUDE_COLUMN} columns; run the geocode stage first",
            path.display()
        ));
    }

    Ok(rows
        .iter()
        .map(|row| GeocodedRecord {
            record: layout.record(row),
            coordinates: layout.coordinates(row),
        })
        .collect())
}
