/// Injected logging for the analytic pipeline.
///
/// Components never reach for a process-wide logger. They receive a
/// `&dyn PipelineLog` (the processor holds an `Arc<dyn PipelineLog>`) and
/// record station-scoped messages through it. `TracingLog` forwards to
/// `tracing` with a structured `station` field; `MemoryLog` keeps records
/// in memory so tests can assert on what was logged.

use std::fmt;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging capability
// ---------------------------------------------------------------------------

/// Logging capability handed to every pipeline component.
pub trait PipelineLog: Send + Sync {
    fn record(&self, level: LogLevel, station_id: Option<&str>, message: &str);

    fn debug(&self, station_id: Option<&str>, message: &str) {
        self.record(LogLevel::Debug, station_id, message);
    }

    fn info(&self, station_id: Option<&str>, message: &str) {
        self.record(LogLevel::Info, station_id, message);
    }

    fn warn(&self, station_id: Option<&str>, message: &str) {
        self.record(LogLevel::Warning, station_id, message);
    }

    fn error(&self, station_id: Option<&str>, message: &str) {
        self.record(LogLevel::Error, station_id, message);
    }
}

/// Forwards records to the `tracing` subscriber installed by the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl PipelineLog for TracingLog {
    fn record(&self, level: LogLevel, station_id: Option<&str>, message: &str) {
        let station = station_id.unwrap_or("-");
        match level {
            LogLevel::Debug => tracing::debug!(station, "{}", message),
            LogLevel::Info => tracing::info!(station, "{}", message),
            LogLevel::Warning => tracing::warn!(station, "{}", message),
            LogLevel::Error => tracing::error!(station, "{}", message),
        }
    }
}

/// A single captured log line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub station_id: Option<String>,
    pub message: String,
}

/// Captures records in memory, below `min_level` discarded.
pub struct MemoryLog {
    min_level: LogLevel,
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::with_min_level(LogLevel::Debug)
    }

    pub fn with_min_level(min_level: LogLevel) -> Self {
        Self {
            min_level,
            records: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of everything recorded so far.
    pub fn records(&self) -> Vec<LogRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Records at exactly `level` that mention `station_id`.
    pub fn count_for(&self, level: LogLevel, station_id: &str) -> usize {
        self.records()
            .iter()
            .filter(|r| r.level == level && r.station_id.as_deref() == Some(station_id))
            .count()
    }
}

impl Default for MemoryLog {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLog for MemoryLog {
    fn record(&self, level: LogLevel, station_id: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }
        let entry = LogRecord {
            level,
            station_id: station_id.map(String::from),
            message: message.to_string(),
        };
        match self.records.lock() {
            Ok(mut records) => records.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}

// ---------------------------------------------------------------------------
// Batch Summary Logging
// ---------------------------------------------------------------------------

/// Logs how many of the requested stations produced a result.
pub fn log_batch_summary(log: &dyn PipelineLog, requested: usize, processed: usize) {
    let skipped = requested.saturating_sub(processed);
    let message = format!(
        "Batch complete: {}/{} stations processed, {} skipped",
        processed, requested, skipped
    );

    if skipped == 0 {
        log.info(None, &message);
    } else if processed == 0 {
        log.error(None, &message);
    } else {
        log.warn(None, &message);
    }
}
