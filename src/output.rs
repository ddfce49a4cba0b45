//! Output formatting and persistence for analysis results.
//!
//! Supports log previews, JSON logging, CSV append and whole-file writes that
//! replace their target only once fully written.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::records::{GeocodedRecord, RouteStopRecord};
use csv::WriterBuilder;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// Number of rows shown by the preview helpers.
pub const PREVIEW_ROWS: usize = 5;

/// Logs a value as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Logs the first rows of a timetable.
pub fn preview_records(label: &str, records: &[RouteStopRecord]) {
    info!(table = label, rows = records.len(), "Table preview");
    for record in records.iter().take(PREVIEW_ROWS) {
        info!(
            route = %record.route_id,
            stop = %record.stop_name,
            times = %record.times.join(" "),
            "{label}"
        );
    }
}

/// Logs the first rows of a geocoded timetable.
pub fn preview_geocoded(label: &str, records: &[GeocodedRecord]) {
    info!(table = label, rows = records.len(), "Table preview");
    for geocoded in records.iter().take(PREVIEW_ROWS) {
        let (lat, lon) = match geocoded.coordinates {
            Some(c) => (c.latitude.to_string(), c.longitude.to_string()),
            None => ("-".to_string(), "-".to_string()),
        };
        info!(
            route = %geocoded.route_id(),
            stop = %geocoded.stop_name(),
            latitude = %lat,
            longitude = %lon,
            "{label}"
        );
    }
}

/// Appends a record as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}

/// Overwrites `path` with the serialized `rows`, headers included.
pub fn write_records<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    with_atomic_path(path, |tmp| {
        let mut writer = WriterBuilder::new().from_path(tmp)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    })
    .with_context(|| format!("failed to write '{}'", path.display()))
}

/// Overwrites `path` with `contents`.
pub fn write_artifact(path: &Path, contents: &str) -> Result<()> {
    with_atomic_path(path, |tmp| Ok(fs::write(tmp, contents)?))
        .with_context(|| format!("failed to write '{}'", path.display()))?;
    info!(path = %path.display(), bytes = contents.len(), "Artifact written");
    Ok(())
}

/// Runs `write` against a temporary sibling of `path`, then renames it over
/// `path`. On failure the temporary file is removed and `path` is untouched.
pub fn with_atomic_path<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = tmp_path(path);
    if let Err(e) = write(&tmp) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[derive(Debug, Default, Serialize)]
    struct Row {
        timestamp: String,
        value: usize,
    }

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&Row::default()).unwrap();
    }

    #[test]
    fn test_preview_empty_tables() {
        preview_records("routes", &[]);
        preview_geocoded("geocoded", &[]);
    }

    #[test]
    fn test_append_record_writes_header_once() {
        let path = temp_path("bus_network_test_header.csv");
        let _ = fs::remove_file(&path);

        append_record(&path, &Row::default()).unwrap();
        append_record(&path, &Row::default()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.contains("timestamp")).count();
        assert_eq!(header_count, 1);
        // 1 header + 2 data rows
        assert_eq!(content.lines().count(), 3);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_artifact_overwrites_whole_file() {
        let path = temp_path("bus_network_test_artifact.html");
        write_artifact(&path, "first version, longer").unwrap();
        write_artifact(&path, "second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        assert!(!tmp_path(&path).exists());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_failed_write_leaves_target_untouched() {
        let path = temp_path("bus_network_test_failed.csv");
        fs::write(&path, "original").unwrap();

        let result = with_atomic_path(&path, |tmp| {
            fs::write(tmp, "partial")?;
            Err(anyhow::anyhow!("boom"))
        });

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "original");
        assert!(!tmp_path(&path).exists());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_records_creates_parent_dir() {
        let dir = temp_path("bus_network_test_out_dir");
        let path = dir.join("rows.csv");
        let _ = fs::remove_dir_all(&dir);

        write_records(&path, &[Row::default(), Row::default()]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 3);

        fs::remove_dir_all(&dir).unwrap();
    }
}
