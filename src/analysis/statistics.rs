/// Statistics Summarizer: descriptive statistics over a full series.

use crate::model::{round2, Series, Statistics};

/// Max, min, mean, population standard deviation and range, each rounded
/// to two decimals. `None` for an empty series.
pub fn summarize(series: &Series) -> Option<Statistics> {
    if series.is_empty() {
        return None;
    }

    let n = series.len() as f64;
    let (min, max, sum) = series.values().fold(
        (f64::INFINITY, f64::NEG_INFINITY, 0.0),
        |(min, max, sum), v| (min.min(v), max.max(v), sum + v),
    );
    let mean = sum / n;

    // Second pass over deviations keeps the variance non-negative.
    let variance = series.values().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.max(0.0).sqrt();

    Some(Statistics {
        max: round2(max),
        min: round2(min),
        mean: round2(mean),
        std: round2(std),
        range: round2(max - min),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sample;
    use chrono::{Duration, FixedOffset, TimeZone};

    fn hourly(values: &[f64]) -> Series {
        let tz = FixedOffset::east_opt(7 * 3600).unwrap();
        let start = tz.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap();
        let samples = values
            .iter()
            .enumerate()
            .map(|(i, &value)| Sample {
                timestamp: start + Duration::hours(i as i64),
                value,
            })
            .collect();
        Series::from_samples("can_tho", samples)
    }

    #[test]
    fn test_empty_series_has_no_statistics() {
        assert!(summarize(&hourly(&[])).is_none());
    }

    #[test]
    fn test_reference_series() {
        let stats = summarize(&hourly(&[1.0, 1.2, 1.5, 1.3, 1.1, 1.4])).unwrap();
        assert_eq!(stats.max, 1.5);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.mean, 1.25);
        // Population variance 0.175 / 6 = 0.02917, std = 0.1708
        assert_eq!(stats.std, 0.17);
        assert_eq!(stats.range, 0.5);
    }

    #[test]
    fn test_constant_series() {
        let stats = summarize(&hourly(&[2.35; 7])).unwrap();
        assert_eq!(stats.max, 2.35);
        assert_eq!(stats.min, 2.35);
        assert_eq!(stats.mean, 2.35);
        assert_eq!(stats.std, 0.0);
        assert_eq!(stats.range, 0.0);
    }

    #[test]
    fn test_single_sample_has_zero_spread() {
        let stats = summarize(&hourly(&[4.6])).unwrap();
        assert_eq!(stats.std, 0.0);
        assert_eq!(stats.range, 0.0);
        assert_eq!(stats.mean, 4.6);
    }
}
