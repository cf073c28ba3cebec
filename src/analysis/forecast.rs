/// Peak Forecaster.
///
/// Extrapolates the next high or low tide from the peaks already seen:
///   - cycle length  = mean gap between consecutive peaks of the set
///   - predicted time  = last peak time + cycle length
///   - predicted level = mean of the last (up to) three peak values
///
/// This is cycle averaging, not harmonic tide prediction. Irregular
/// spacing degrades it and no smoothing or outlier rejection is applied.

use chrono::Duration;

use crate::model::{format_local, round2, Confidence, Forecast, PeakSet};

/// How many of the most recent peaks feed the level estimate.
pub const LEVEL_PEAKS: usize = 3;

/// Forecasts the next peak of the set's kind.
///
/// Returns `None` with fewer than two peaks (no cycle to measure), when
/// every peak shares one timestamp so the mean cycle is zero, or when the
/// predicted time falls outside the representable range.
pub fn forecast_next_peak(peaks: &PeakSet) -> Option<Forecast> {
    if peaks.len() < 2 {
        return None;
    }

    let cycle = mean_cycle(peaks)?;
    let last = peaks.last()?;
    let predicted_time = last.sample.timestamp.checked_add_signed(cycle)?;

    let recent = &peaks.peaks[peaks.len().saturating_sub(LEVEL_PEAKS)..];
    let predicted_level =
        recent.iter().map(|p| p.sample.value).sum::<f64>() / recent.len() as f64;

    Some(Forecast {
        predicted_time,
        predicted_time_local: format_local(&predicted_time),
        predicted_level: round2(predicted_level),
        kind: peaks.kind,
        label: peaks.kind.label().to_string(),
        confidence: Confidence::Medium,
    })
}

/// Mean gap between consecutive peaks, at millisecond resolution.
fn mean_cycle(peaks: &PeakSet) -> Option<Duration> {
    let gaps: Vec<i64> = peaks
        .peaks
        .windows(2)
        .map(|pair| (pair[1].sample.timestamp - pair[0].sample.timestamp).num_milliseconds())
        .collect();

    let mean_ms = gaps.iter().sum::<i64>() / gaps.len() as i64;
    if mean_ms <= 0 {
        return None;
    }
    Some(Duration::milliseconds(mean_ms))
}
