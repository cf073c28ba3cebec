//! Sample Series Builder.
//!
//! Validates a raw batch against the station registry, converts epoch
//! milliseconds into the reference timezone and stable-sorts by time. This
//! is the only validation boundary: everything downstream trusts `Series`.

use chrono::{FixedOffset, TimeZone};

use crate::ingest::raw::{RawBatch, RawPayload, RawSample};
use crate::logging::PipelineLog;
use crate::model::{Sample, Series, SkipReason};
use crate::stations::StationRegistry;

/// Largest level magnitude accepted, in meters. Anything beyond is a
/// gauge or transcription fault, and keeps every downstream sum finite.
pub const MAX_ABS_LEVEL_M: f64 = 10_000.0;

/// Builds a series, or says why the batch cannot be processed.
///
/// Any single sample that fails conversion (timestamp out of range,
/// non-finite or implausibly large value) makes the whole batch malformed.
pub fn try_build_series(
    registry: &StationRegistry,
    batch: &RawBatch,
    timezone: &FixedOffset,
) -> Result<Series, SkipReason> {
    if !registry.contains(&batch.station_id) {
        return Err(SkipReason::UnknownStation(batch.station_id.clone()));
    }

    let raw = match &batch.payload {
        RawPayload::Samples(samples) => samples,
        RawPayload::Malformed(reason) => return Err(SkipReason::MalformedBatch(reason.clone())),
    };

    if raw.is_empty() {
        return Err(SkipReason::EmptyBatch);
    }

    let samples = raw
        .iter()
        .enumerate()
        .map(|(i, r)| convert_sample(i, r, timezone))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Series::from_samples(&batch.station_id, samples))
}

/// Builds a series, collapsing any rejection to an explicitly empty one.
pub fn build_series(
    registry: &StationRegistry,
    batch: &RawBatch,
    timezone: &FixedOffset,
    log: &dyn PipelineLog,
) -> Series {
    match try_build_series(registry, batch, timezone) {
        Ok(series) => {
            log.debug(
                Some(&batch.station_id),
                &format!("Converted {} samples", series.len()),
            );
            series
        }
        Err(reason) => {
            log_rejection(log, &batch.station_id, &reason);
            Series::empty(&batch.station_id)
        }
    }
}

/// Logs a skipped station at a level matching how surprising the cause is.
pub fn log_rejection(log: &dyn PipelineLog, station_id: &str, reason: &SkipReason) {
    let message = format!("Skipping station: {}", reason);
    match reason {
        SkipReason::MalformedBatch(_) => log.error(Some(station_id), &message),
        SkipReason::UnknownStation(_) | SkipReason::EmptyBatch => {
            log.warn(Some(station_id), &message)
        }
    }
}

fn convert_sample(
    position: usize,
    raw: &RawSample,
    timezone: &FixedOffset,
) -> Result<Sample, SkipReason> {
    if !raw.value.is_finite() {
        return Err(SkipReason::MalformedBatch(format!(
            "sample {} has non-finite value",
            position
        )));
    }
    if raw.value.abs() > MAX_ABS_LEVEL_M {
        return Err(SkipReason::MalformedBatch(format!(
            "sample {} has implausible level {}",
            position, raw.value
        )));
    }

    let timestamp = timezone
        .timestamp_millis_opt(raw.timestamp_ms)
        .single()
        .ok_or_else(|| {
            SkipReason::MalformedBatch(format!(
                "sample {} has out-of-range timestamp {}",
                position, raw.timestamp_ms
            ))
        })?;

    Ok(Sample {
        timestamp,
        value: raw.value,
    })
}
