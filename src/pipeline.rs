/// Station Result Assembler and batch orchestration.
///
/// For one station: registry lookup → series build → peaks, forecasts,
/// alert, trend and statistics → one immutable `StationResult`. For a batch:
/// the same path for every supplied station, with skipped stations simply
/// absent from the output map. Partial success is the normal case.
///
/// Stations share no mutable state, so the batch can also run on a thread
/// pool (`process_all_parallel`); it joins before assembling the map and
/// yields the same map as the sequential path.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use std::collections::BTreeMap;
use std::sync::mpsc;
use std::sync::Arc;
use threadpool::ThreadPool;

use crate::alert::thresholds::check_alert;
use crate::analysis::forecast::forecast_next_peak;
use crate::analysis::peaks::extract_peaks;
use crate::analysis::statistics::summarize;
use crate::analysis::trend::estimate_trend;
use crate::config::{ConfigError, ServiceSettings, StationConfig};
use crate::ingest::raw::{RawBatch, RawBatches};
use crate::ingest::series::{log_rejection, try_build_series};
use crate::logging::{log_batch_summary, PipelineLog};
use crate::model::{
    format_local, round2, CurrentReading, DataPoint, Series, SkipReason, StationResult,
    StationResults, TideForecast, LEVEL_UNIT,
};
use crate::stations::StationRegistry;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Run-wide settings, immutable for the lifetime of a processor.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingSettings {
    /// Reference timezone for every timestamp.
    pub timezone: FixedOffset,
    /// How many recent samples each result keeps for display.
    pub recent_window: usize,
    /// Source label carried into snapshot metadata.
    pub data_source: String,
    /// Configured refresh interval, carried into snapshot metadata.
    pub update_interval_seconds: u64,
}

impl ProcessingSettings {
    pub fn from_service(service: &ServiceSettings) -> Result<Self, ConfigError> {
        Ok(Self {
            timezone: service.timezone()?,
            recent_window: service.recent_window,
            data_source: service.data_source.clone(),
            update_interval_seconds: service.update_interval_seconds,
        })
    }
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        let service = ServiceSettings::default();
        Self {
            timezone: service.timezone().unwrap_or_else(|_| Utc.fix()),
            recent_window: service.recent_window,
            data_source: service.data_source,
            update_interval_seconds: service.update_interval_seconds,
        }
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Composes the analytic result for one station from a non-empty series.
pub fn assemble_result(
    station: &StationConfig,
    series: &Series,
    recent_window: usize,
    generated_at: DateTime<FixedOffset>,
) -> Result<StationResult, SkipReason> {
    let current = *series.latest().ok_or(SkipReason::EmptyBatch)?;
    let statistics = summarize(series).ok_or(SkipReason::EmptyBatch)?;

    let (highs, lows) = extract_peaks(series);
    let forecast = TideForecast {
        next_high_tide: forecast_next_peak(&highs),
        next_low_tide: forecast_next_peak(&lows),
    };

    let data_points = series
        .recent(recent_window)
        .iter()
        .map(|s| DataPoint {
            timestamp: s.timestamp.timestamp_millis(),
            datetime: s.timestamp,
            water_level: round2(s.value),
        })
        .collect();

    Ok(StationResult {
        station_id: station.station_id.clone(),
        station_name: station.name.clone(),
        station_name_en: station.name_en.clone(),
        coordinates: station.coordinates(),
        current: CurrentReading {
            water_level: round2(current.value),
            timestamp: current.timestamp,
            timestamp_local: format_local(&current.timestamp),
            unit: LEVEL_UNIT.to_string(),
        },
        forecast,
        alert: check_alert(current.value, station),
        trend: estimate_trend(series),
        statistics,
        data_points,
        last_updated: generated_at,
    })
}

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

/// Runs the per-station pipeline against a fixed registry and settings.
///
/// Cloning is cheap; clones share the registry and the log.
#[derive(Clone)]
pub struct StationProcessor {
    registry: Arc<StationRegistry>,
    settings: ProcessingSettings,
    log: Arc<dyn PipelineLog>,
}

impl StationProcessor {
    pub fn new(
        registry: StationRegistry,
        settings: ProcessingSettings,
        log: Arc<dyn PipelineLog>,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            settings,
            log,
        }
    }

    pub fn registry(&self) -> &StationRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &ProcessingSettings {
        &self.settings
    }

    /// Current wall-clock time in the reference timezone.
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.settings.timezone)
    }

    pub fn process_station(&self, batch: &RawBatch) -> Result<StationResult, SkipReason> {
        self.process_station_at(batch, self.now())
    }

    /// Like `process_station`, with the generation timestamp supplied.
    pub fn process_station_at(
        &self,
        batch: &RawBatch,
        generated_at: DateTime<FixedOffset>,
    ) -> Result<StationResult, SkipReason> {
        let station = self
            .registry
            .get(&batch.station_id)
            .ok_or_else(|| SkipReason::UnknownStation(batch.station_id.clone()))?;

        self.log.info(
            Some(&batch.station_id),
            &format!("Processing station {}", station.name),
        );

        let series = try_build_series(&self.registry, batch, &self.settings.timezone)?;
        self.log.debug(
            Some(&batch.station_id),
            &format!("Built series of {} samples", series.len()),
        );

        assemble_result(station, &series, self.settings.recent_window, generated_at)
    }

    /// Processes every batch in order.
    pub fn process_all(&self, batches: &RawBatches) -> StationResults {
        self.process_all_at(batches, self.now())
    }

    pub fn process_all_at(
        &self,
        batches: &RawBatches,
        generated_at: DateTime<FixedOffset>,
    ) -> StationResults {
        let mut results = BTreeMap::new();
        for (key, batch) in batches {
            let outcome = self.process_keyed(key, batch, generated_at);
            self.record_outcome(&mut results, key, outcome);
        }
        log_batch_summary(self.log.as_ref(), batches.len(), results.len());
        results
    }

    /// Processes batches on a pool of `workers` threads (at least one).
    pub fn process_all_parallel(&self, batches: RawBatches, workers: usize) -> StationResults {
        let generated_at = self.now();
        self.process_all_parallel_at(batches, workers, generated_at)
    }

    pub fn process_all_parallel_at(
        &self,
        batches: RawBatches,
        workers: usize,
        generated_at: DateTime<FixedOffset>,
    ) -> StationResults {
        let requested = batches.len();
        let pool = ThreadPool::new(workers.max(1));
        let (tx, rx) = mpsc::channel();

        for (key, batch) in batches {
            let tx = tx.clone();
            let processor = self.clone();
            pool.execute(move || {
                let outcome = processor.process_keyed(&key, &batch, generated_at);
                // Receiver is held until every sender is dropped.
                let _ = tx.send((key, outcome));
            });
        }
        drop(tx);

        let mut results = BTreeMap::new();
        for (key, outcome) in rx {
            self.record_outcome(&mut results, &key, outcome);
        }
        log_batch_summary(self.log.as_ref(), requested, results.len());
        results
    }

    /// A batch submitted under one key but naming another station is
    /// malformed, so every result key has exactly one source batch.
    fn process_keyed(
        &self,
        key: &str,
        batch: &RawBatch,
        generated_at: DateTime<FixedOffset>,
    ) -> Result<StationResult, SkipReason> {
        if batch.station_id != key {
            return Err(SkipReason::MalformedBatch(format!(
                "batch submitted as '{}' names station '{}'",
                key, batch.station_id
            )));
        }
        self.process_station_at(batch, generated_at)
    }

    fn record_outcome(
        &self,
        results: &mut StationResults,
        key: &str,
        outcome: Result<StationResult, SkipReason>,
    ) {
        match outcome {
            Ok(result) => {
                self.log.info(Some(key), &result.alert.message);
                results.insert(key.to_string(), result);
            }
            Err(reason) => log_rejection(self.log.as_ref(), key, &reason),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::raw::RawSample;
    use crate::logging::{LogLevel, MemoryLog};
    use crate::model::{AlertLevel, PeakKind, TrendDirection};
    use chrono::TimeZone;

    const HOUR_MS: i64 = 3_600_000;
    const T0: i64 = 1_727_740_800_000; // 2024-10-01T00:00:00Z

    fn processor_with(log: Arc<MemoryLog>) -> StationProcessor {
        StationProcessor::new(StationRegistry::builtin(), ProcessingSettings::default(), log)
    }

    fn generated_at() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 10, 2, 0, 0, 0)
            .unwrap()
    }

    fn hourly_batch(station_id: &str, values: &[f64]) -> RawBatch {
        let samples = values
            .iter()
            .enumerate()
            .map(|(i, &value)| RawSample {
                timestamp_ms: T0 + i as i64 * HOUR_MS,
                value,
            })
            .collect();
        RawBatch::new(station_id, samples)
    }

    #[test]
    fn test_default_settings_use_utc_plus_seven() {
        let settings = ProcessingSettings::default();
        assert_eq!(settings.timezone.local_minus_utc(), 7 * 3600);
        assert_eq!(settings.recent_window, 48);
    }

    #[test]
    fn test_single_station_result_is_fully_populated() {
        let processor = processor_with(Arc::new(MemoryLog::new()));
        let batch = hourly_batch("can_tho", &[1.0, 1.4, 1.1, 1.6, 1.2, 1.7, 1.3]);

        let result = processor.process_station_at(&batch, generated_at()).unwrap();

        assert_eq!(result.station_id, "can_tho");
        assert_eq!(result.station_name_en, "Can Tho");
        assert_eq!(result.current.water_level, 1.3);
        assert_eq!(result.current.unit, "m");
        assert_eq!(result.current.timestamp_local, "01/10/2024 13:00:00");
        assert_eq!(result.alert.level, AlertLevel::Normal);
        assert_eq!(result.last_updated, generated_at());
        assert_eq!(result.data_points.len(), 7);

        let high = result.forecast.next_high_tide.expect("three highs should forecast");
        assert_eq!(high.kind, PeakKind::High);
        assert!(high.predicted_time > result.current.timestamp - chrono::Duration::hours(2));
        assert!(result.forecast.next_low_tide.is_some());
    }

    #[test]
    fn test_recent_window_is_bounded() {
        let log = Arc::new(MemoryLog::new());
        let settings = ProcessingSettings {
            recent_window: 3,
            ..ProcessingSettings::default()
        };
        let processor = StationProcessor::new(StationRegistry::builtin(), settings, log);
        let batch = hourly_batch("my_thuan", &[1.0, 1.1, 1.2, 1.3, 1.4]);

        let result = processor.process_station_at(&batch, generated_at()).unwrap();

        let levels: Vec<f64> = result.data_points.iter().map(|p| p.water_level).collect();
        assert_eq!(levels, vec![1.2, 1.3, 1.4]);
        assert_eq!(result.data_points[2].timestamp, T0 + 4 * HOUR_MS);
        assert_eq!(result.trend.direction, TrendDirection::Rising);
    }

    #[test]
    fn test_short_series_still_produces_result_without_forecast() {
        let processor = processor_with(Arc::new(MemoryLog::new()));
        let result = processor
            .process_station_at(&hourly_batch("vinh_long", &[1.9]), generated_at())
            .unwrap();

        assert!(result.forecast.next_high_tide.is_none());
        assert!(result.forecast.next_low_tide.is_none());
        assert_eq!(result.trend.direction, TrendDirection::Unknown);
        assert_eq!(result.alert.level, AlertLevel::Warning);
        assert_eq!(result.statistics.std, 0.0);
    }

    #[test]
    fn test_batch_omits_skipped_stations_and_logs_them() {
        let log = Arc::new(MemoryLog::new());
        let processor = processor_with(log.clone());

        let mut batches = RawBatches::new();
        batches.insert("can_tho".into(), hourly_batch("can_tho", &[1.0, 1.2, 1.1]));
        batches.insert("chau_doc".into(), hourly_batch("chau_doc", &[]));
        batches.insert("ghost".into(), hourly_batch("ghost", &[1.0]));
        batches.insert("my_thuan".into(), RawBatch::malformed("my_thuan", "bad"));

        let results = processor.process_all_at(&batches, generated_at());

        assert_eq!(results.keys().collect::<Vec<_>>(), vec!["can_tho"]);
        assert_eq!(log.count_for(LogLevel::Warning, "chau_doc"), 1);
        assert_eq!(log.count_for(LogLevel::Warning, "ghost"), 1);
        assert_eq!(log.count_for(LogLevel::Error, "my_thuan"), 1);
        assert!(log
            .records()
            .iter()
            .any(|r| r.station_id.is_none() && r.message.contains("1/4 stations processed")));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let processor = processor_with(Arc::new(MemoryLog::new()));

        let mut batches = RawBatches::new();
        for (i, id) in ["can_tho", "my_thuan", "vinh_long", "tan_chau", "chau_doc"]
            .iter()
            .enumerate()
        {
            let base = 1.0 + i as f64;
            batches.insert(
                id.to_string(),
                hourly_batch(id, &[base, base + 0.3, base + 0.1, base + 0.4, base + 0.2]),
            );
        }
        batches.insert("ghost".into(), hourly_batch("ghost", &[1.0, 2.0]));

        let sequential = processor.process_all_at(&batches, generated_at());
        let parallel = processor.process_all_parallel_at(batches, 3, generated_at());

        assert_eq!(sequential.len(), 5);
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_batches_naming_another_station_are_skipped() {
        let log = Arc::new(MemoryLog::new());
        let processor = processor_with(log.clone());

        let mut batches = RawBatches::new();
        batches.insert("a_alias".into(), hourly_batch("can_tho", &[1.0]));
        batches.insert("can_tho".into(), hourly_batch("can_tho", &[1.9]));
        batches.insert("ghost".into(), hourly_batch("can_tho", &[1.5]));

        let sequential = processor.process_all_at(&batches, generated_at());
        assert_eq!(sequential.keys().collect::<Vec<_>>(), vec!["can_tho"]);
        assert_eq!(sequential["can_tho"].current.water_level, 1.9);
        assert_eq!(log.count_for(LogLevel::Error, "a_alias"), 1);
        assert_eq!(log.count_for(LogLevel::Error, "ghost"), 1);

        for _ in 0..20 {
            let pooled = processor.process_all_parallel_at(batches.clone(), 3, generated_at());
            assert_eq!(pooled, sequential);
        }
    }

    #[test]
    fn test_zero_workers_still_processes() {
        let processor = processor_with(Arc::new(MemoryLog::new()));
        let mut batches = RawBatches::new();
        batches.insert("can_tho".into(), hourly_batch("can_tho", &[1.0, 1.1]));
        let results = processor.process_all_parallel_at(batches, 0, generated_at());
        assert_eq!(results.len(), 1);
    }
}
