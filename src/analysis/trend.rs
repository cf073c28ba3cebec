/// Trend Estimator.
///
/// Fits an ordinary least-squares line through the last `TREND_WINDOW`
/// samples against their position (0, 1, … k-1), not against elapsed time,
/// and classifies the slope with fixed thresholds.
///
/// Because x is the sample position, `slope` is meters per sample step.
/// `rate_description` scales it by 100 and labels it cm/h, which holds only
/// while samples are roughly hourly. Irregular spacing silently distorts
/// both.

use crate::model::{round4, Series, TrendDirection, TrendResult};

/// Number of most recent samples the fit uses.
pub const TREND_WINDOW: usize = 6;

/// Slope above which the level is rising, in meters per step.
pub const RISING_SLOPE: f64 = 0.05;

/// Slope below which the level is falling, in meters per step.
pub const FALLING_SLOPE: f64 = -0.05;

/// Classifies the short-term direction of the series.
///
/// Fewer than two samples gives `Unknown` with a zero slope.
pub fn estimate_trend(series: &Series) -> TrendResult {
    let window: Vec<f64> = series.recent(TREND_WINDOW).iter().map(|s| s.value).collect();

    if window.len() < 2 {
        return TrendResult {
            direction: TrendDirection::Unknown,
            slope: 0.0,
            rate_description: describe_rate(0.0),
        };
    }

    let slope = least_squares_slope(&window);

    TrendResult {
        direction: classify_slope(slope),
        slope: round4(slope),
        rate_description: describe_rate(slope),
    }
}

/// Slope of the OLS fit of `values` against their indices.
///
/// Returns 0.0 for fewer than two values or a fit that is not finite, so a
/// degenerate fit reads as stable rather than NaN.
pub fn least_squares_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }

    let mean_x = (n - 1) as f64 / 2.0;
    let mean_y = values.iter().sum::<f64>() / n as f64;

    let (ss_xy, ss_xx) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(xy, xx), (i, &y)| {
            let dx = i as f64 - mean_x;
            (xy + dx * (y - mean_y), xx + dx * dx)
        });

    let slope = ss_xy / ss_xx;
    if ss_xx.abs() < 1e-12 || !slope.is_finite() {
        return 0.0;
    }
    slope
}

pub fn classify_slope(slope: f64) -> TrendDirection {
    if slope > RISING_SLOPE {
        TrendDirection::Rising
    } else if slope < FALLING_SLOPE {
        TrendDirection::Falling
    } else {
        TrendDirection::Stable
    }
}

fn describe_rate(slope: f64) -> String {
    format!("{:.2} cm/h", (slope * 100.0).abs())
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
    fn test_reference_series_is_stable() {
        // Centered sums: Sxy = 0.75, Sxx = 17.5, slope = 0.042857…
        let trend = estimate_trend(&hourly(&[1.0, 1.2, 1.5, 1.3, 1.1, 1.4]));
        assert_eq!(trend.direction, TrendDirection::Stable);
        assert!((trend.slope - 0.0429).abs() < 1e-9);
        assert_eq!(trend.rate_description, "4.29 cm/h");
    }

    #[test]
    fn test_uses_only_last_six_samples() {
        // A steep early fall followed by a steady rise of 0.1 per step.
        let trend = estimate_trend(&hourly(&[9.0, 5.0, 1.0, 1.1, 1.2, 1.3, 1.4, 1.5]));
        assert_eq!(trend.direction, TrendDirection::Rising);
        assert!((trend.slope - 0.1).abs() < 1e-9);
        assert_eq!(trend.rate_description, "10.00 cm/h");
    }

    #[test]
    fn test_falling_series() {
        let trend = estimate_trend(&hourly(&[2.0, 1.9, 1.8, 1.7]));
        assert_eq!(trend.direction, TrendDirection::Falling);
        assert!((trend.slope + 0.1).abs() < 1e-9);
        assert_eq!(trend.rate_description, "10.00 cm/h");
    }

    #[test]
    fn test_fewer_than_two_samples_is_unknown() {
        for values in [&[][..], &[1.0][..]] {
            let trend = estimate_trend(&hourly(values));
            assert_eq!(trend.direction, TrendDirection::Unknown);
            assert_eq!(trend.slope, 0.0);
        }
    }

    #[test]
    fn test_constant_window_is_stable_with_zero_slope() {
        let trend = estimate_trend(&hourly(&[1.7; 6]));
        assert_eq!(trend.direction, TrendDirection::Stable);
        assert_eq!(trend.slope, 0.0);
        assert!(!trend.slope.is_nan());
    }

    #[test]
    fn test_overflowing_fit_falls_back_to_zero() {
        assert_eq!(least_squares_slope(&[1e308, 1e308, 1e308]), 0.0);
        assert_eq!(least_squares_slope(&[-1e308, 1e308, -1e308, 1e308]), 0.0);
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        assert_eq!(classify_slope(0.05), TrendDirection::Stable);
        assert_eq!(classify_slope(-0.05), TrendDirection::Stable);
        assert_eq!(classify_slope(0.0501), TrendDirection::Rising);
        assert_eq!(classify_slope(-0.0501), TrendDirection::Falling);
    }
}
