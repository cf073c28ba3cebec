/// Synthetic tidal batches for demos and tests.
///
/// When no upstream batch is available the service can still be exercised
/// end to end with a generated curve: hourly samples of a semidiurnal tide
/// (period 12.42 h) oscillating around half a meter below the station's
/// warning threshold. The phase is tied to the absolute sample time, so
/// consecutive runs line up, and output is deterministic for a fixed `now`.

use chrono::{DateTime, Duration, Utc};
use std::f64::consts::PI;

use crate::config::StationConfig;
use crate::ingest::raw::{RawBatch, RawBatches, RawSample};
use crate::model::round2;
use crate::stations::StationRegistry;

/// Principal lunar semidiurnal period, in hours.
pub const SEMIDIURNAL_PERIOD_HOURS: f64 = 12.42;

const AMPLITUDE_M: f64 = 0.4;
const HOUR_MS: f64 = 3_600_000.0;

/// Generates `hours` hourly samples ending at `now` for one station.
pub fn synthetic_batch(station: &StationConfig, now: DateTime<Utc>, hours: usize) -> RawBatch {
    let base_level = station.warning_threshold - 0.5;

    let samples = (0..hours)
        .map(|i| {
            let back = (hours - 1 - i) as i64;
            let at = now - Duration::hours(back);
            let timestamp_ms = at.timestamp_millis();
            let phase = 2.0 * PI * (timestamp_ms as f64 / HOUR_MS) / SEMIDIURNAL_PERIOD_HOURS;
            RawSample {
                timestamp_ms,
                value: round2(base_level + AMPLITUDE_M * phase.sin()),
            }
        })
        .collect();

    RawBatch::new(&station.station_id, samples)
}

/// Generates a batch for every registered station.
pub fn synthetic_batches(registry: &StationRegistry, now: DateTime<Utc>, hours: usize) -> RawBatches {
    registry
        .sorted()
        .into_iter()
        .map(|station| (station.station_id.clone(), synthetic_batch(station, now, hours)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::raw::RawPayload;
    use chrono::TimeZone;

    fn samples_of(batch: &RawBatch) -> &[RawSample] {
        match &batch.payload {
            RawPayload::Samples(samples) => samples,
            RawPayload::Malformed(reason) => panic!("unexpected malformed batch: {}", reason),
        }
    }

    #[test]
    fn test_synthetic_batch_is_hourly_and_ends_at_now() {
        let registry = StationRegistry::builtin();
        let station = registry.get("can_tho").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap();

        let batch = synthetic_batch(station, now, 24);
        let samples = samples_of(&batch);

        assert_eq!(samples.len(), 24);
        assert_eq!(samples[23].timestamp_ms, now.timestamp_millis());
        for pair in samples.windows(2) {
            assert_eq!(pair[1].timestamp_ms - pair[0].timestamp_ms, 3_600_000);
        }
    }

    #[test]
    fn test_synthetic_levels_stay_within_amplitude() {
        let registry = StationRegistry::builtin();
        let station = registry.get("tan_chau").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap();
        let base = station.warning_threshold - 0.5;

        for sample in samples_of(&synthetic_batch(station, now, 48)) {
            assert!((sample.value - base).abs() <= AMPLITUDE_M + 0.005);
        }
    }

    #[test]
    fn test_synthetic_batches_cover_every_station() {
        let registry = StationRegistry::builtin();
        let now = Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap();
        let batches = synthetic_batches(&registry, now, 24);
        assert_eq!(batches.len(), registry.len());
        assert_eq!(batches["vinh_long"].station_id, "vinh_long");
    }
}
