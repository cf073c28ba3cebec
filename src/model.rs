/// Core data types for the Mekong gauge analytics service.
///
/// This module defines the shared domain model imported by all other modules:
/// samples and series, detected peaks, forecasts, trend and statistics
/// summaries, alert tiers, and the composed per-station result. It holds
/// no I/O. The only logic here is what keeps the types' invariants
/// (a `Series` is always sorted) and display rounding.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Display constants
// ---------------------------------------------------------------------------

/// Unit of every water level handled by the service.
pub const LEVEL_UNIT: &str = "m";

/// Local display format for timestamps, day first.
pub const LOCAL_TIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Rounds to two decimal places, the display precision for levels.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rounds to four decimal places, the display precision for slopes.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Formats an instant in the day-first local display format.
pub fn format_local(timestamp: &DateTime<FixedOffset>) -> String {
    timestamp.format(LOCAL_TIME_FORMAT).to_string()
}

// ---------------------------------------------------------------------------
// Samples and series
// ---------------------------------------------------------------------------

/// One gauge reading, already converted to the reference timezone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<FixedOffset>,
    pub value: f64,
}

/// Time-ordered readings for one station.
///
/// The only way to build a non-empty `Series` is `from_samples`, which
/// stable-sorts by timestamp, so every `Series` is ascending. Duplicate
/// timestamps are kept in arrival order. An empty series is valid but
/// cannot be processed further.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    station_id: String,
    samples: Vec<Sample>,
}

impl Series {
    pub fn empty(station_id: &str) -> Self {
        Self {
            station_id: station_id.to_string(),
            samples: Vec::new(),
        }
    }

    pub fn from_samples(station_id: &str, mut samples: Vec<Sample>) -> Self {
        samples.sort_by_key(|s| s.timestamp);
        Self {
            station_id: station_id.to_string(),
            samples,
        }
    }

    pub fn station_id(&self) -> &str {
        &self.station_id
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The most recent sample, which the service treats as "current".
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// The last `n` samples (all of them if the series is shorter).
    pub fn recent(&self, n: usize) -> &[Sample] {
        let start = self.samples.len().saturating_sub(n);
        &self.samples[start..]
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.value)
    }
}

// ---------------------------------------------------------------------------
// Peaks and forecasts
// ---------------------------------------------------------------------------

/// Whether a peak is a local maximum (high tide) or minimum (low tide).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeakKind {
    High,
    Low,
}

impl PeakKind {
    pub fn label(&self) -> &'static str {
        match self {
            PeakKind::High => "High tide",
            PeakKind::Low => "Low tide",
        }
    }
}

/// A sample classified as a strict local extremum, with its series index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub index: usize,
    pub sample: Sample,
}

/// Peaks of one kind, in series (chronological) order.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakSet {
    pub kind: PeakKind,
    pub peaks: Vec<Peak>,
}

impl PeakSet {
    pub fn new(kind: PeakKind) -> Self {
        Self { kind, peaks: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    pub fn last(&self) -> Option<&Peak> {
        self.peaks.last()
    }
}

/// Forecast strength indicator. Currently always `Medium`: the cycle
/// extrapolation does not compute a variance-based confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Medium,
}

/// Extrapolated next occurrence of a high or low tide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    #[serde(rename = "time")]
    pub predicted_time: DateTime<FixedOffset>,
    #[serde(rename = "time_local")]
    pub predicted_time_local: String,
    pub predicted_level: f64,
    pub kind: PeakKind,
    pub label: String,
    pub confidence: Confidence,
}

/// Next high and low tide forecasts; either may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TideForecast {
    pub next_high_tide: Option<Forecast>,
    pub next_low_tide: Option<Forecast>,
}

// ---------------------------------------------------------------------------
// Trend and statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Rising,
    Falling,
    Stable,
    Unknown,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Rising => write!(f, "rising"),
            TrendDirection::Falling => write!(f, "falling"),
            TrendDirection::Stable => write!(f, "stable"),
            TrendDirection::Unknown => write!(f, "unknown"),
        }
    }
}

/// Short-window level direction. `slope` is in meters per sample step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub direction: TrendDirection,
    pub slope: f64,
    pub rate_description: String,
}

/// Descriptive statistics over a full series, rounded for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub max: f64,
    pub min: f64,
    pub mean: f64,
    pub std: f64,
    pub range: f64,
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

/// Alert tiers, ordered `Normal < Warning < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Normal,
    Warning,
    Critical,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::Normal => write!(f, "NORMAL"),
            AlertLevel::Warning => write!(f, "WARNING"),
            AlertLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Alert tier for the current level, with the thresholds it was judged by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
    pub threshold_warning: f64,
    pub threshold_flood: f64,
}

// ---------------------------------------------------------------------------
// Station result
// ---------------------------------------------------------------------------

/// WGS84 position of a station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentReading {
    pub water_level: f64,
    pub timestamp: DateTime<FixedOffset>,
    pub timestamp_local: String,
    pub unit: String,
}

/// One entry of the bounded recent-sample window kept for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub datetime: DateTime<FixedOffset>,
    pub water_level: f64,
}

/// Analytic snapshot of one station, built fresh on every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationResult {
    pub station_id: String,
    pub station_name: String,
    pub station_name_en: String,
    pub coordinates: Coordinates,
    pub current: CurrentReading,
    pub forecast: TideForecast,
    pub alert: Alert,
    pub trend: TrendResult,
    pub statistics: Statistics,
    pub data_points: Vec<DataPoint>,
    pub last_updated: DateTime<FixedOffset>,
}

/// Batch output, keyed by station id. Stations that yielded no result
/// are simply absent.
pub type StationResults = BTreeMap<String, StationResult>;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Caller-contract violations that fail a whole batch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The raw document is not a mapping of station id to batch.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Why a single station produced no result. Never fatal to the batch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SkipReason {
    #[error("station '{0}' is not configured")]
    UnknownStation(String),
    #[error("no samples in batch")]
    EmptyBatch,
    #[error("malformed batch: {0}")]
    MalformedBatch(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
