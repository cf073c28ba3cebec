/// Persistence of batch results.
///
/// Two artifacts per run:
/// - the latest snapshot, a pretty-printed JSON document overwritten each run
/// - the history log, a CSV file with one row per station per run, appended

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::{AlertLevel, StationResult, StationResults, TrendDirection};
use crate::pipeline::ProcessingSettings;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("history CSV error: {0}")]
    Csv(#[from] csv::Error),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SnapshotError + '_ {
    move |source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    }
}

// ---------------------------------------------------------------------------
// Latest snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub total_stations: usize,
    pub data_source: String,
    pub update_interval_seconds: u64,
}

/// Everything one batch run produced, as served to readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub last_updated: DateTime<FixedOffset>,
    pub stations: StationResults,
    pub metadata: SnapshotMetadata,
}

impl Snapshot {
    pub fn new(
        stations: StationResults,
        settings: &ProcessingSettings,
        generated_at: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            last_updated: generated_at,
            metadata: SnapshotMetadata {
                total_stations: stations.len(),
                data_source: settings.data_source.clone(),
                update_interval_seconds: settings.update_interval_seconds,
            },
            stations,
        }
    }

    /// Stations at WARNING or above, most severe first.
    pub fn alerts(&self) -> Vec<&StationResult> {
        let mut alerting: Vec<_> = self
            .stations
            .values()
            .filter(|r| r.alert.level >= AlertLevel::Warning)
            .collect();
        // Stable sort keeps station id order within a tier.
        alerting.sort_by(|a, b| b.alert.level.cmp(&a.alert.level));
        alerting
    }
}

/// Writes the snapshot as pretty JSON, creating parent directories.
pub fn write_latest(path: &Path, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let json = serde_json::to_string_pretty(snapshot)?;
    fs::write(path, json).map_err(io_error(path))
}

pub fn read_latest(path: &Path) -> Result<Snapshot, SnapshotError> {
    let contents = fs::read_to_string(path).map_err(io_error(path))?;
    Ok(serde_json::from_str(&contents)?)
}

// ---------------------------------------------------------------------------
// History log
// ---------------------------------------------------------------------------

/// One station's row in the history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub timestamp: DateTime<FixedOffset>,
    pub station_id: String,
    pub station_name: String,
    pub water_level: f64,
    pub alert_level: AlertLevel,
    pub trend_direction: TrendDirection,
}

impl HistoryRow {
    pub fn from_snapshot(snapshot: &Snapshot) -> Vec<HistoryRow> {
        snapshot
            .stations
            .values()
            .map(|r| HistoryRow {
                timestamp: snapshot.last_updated,
                station_id: r.station_id.clone(),
                station_name: r.station_name.clone(),
                water_level: r.current.water_level,
                alert_level: r.alert.level,
                trend_direction: r.trend.direction,
            })
            .collect()
    }
}

/// Appends one row per station. The header is written only when the file
/// is missing or empty. Returns the number of rows written.
pub fn append_history(path: &Path, snapshot: &Snapshot) -> Result<usize, SnapshotError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let is_new = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_error(path))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(is_new)
        .from_writer(file);

    let rows = HistoryRow::from_snapshot(snapshot);
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(io_error(path))?;

    Ok(rows.len())
}

/// Reads the history log, optionally for one station, keeping at most the
/// last `limit` matching rows.
pub fn read_history(
    path: &Path,
    station_id: Option<&str>,
    limit: usize,
) -> Result<Vec<HistoryRow>, SnapshotError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: HistoryRow = record?;
        if station_id.is_none_or(|id| row.station_id == id) {
            rows.push(row);
        }
    }
    let skip = rows.len().saturating_sub(limit);
    Ok(rows.split_off(skip))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
