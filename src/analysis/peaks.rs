/// Peak Extractor.
///
/// A high peak is a sample strictly greater than both neighbours, a low
/// peak strictly smaller than both. Only interior indices are candidates,
/// so the first and last sample never qualify, and equal neighbours
/// (plateaus) never produce a peak. One linear pass, O(n).

use crate::model::{Peak, PeakKind, PeakSet, Series};

/// Scans the series once and returns `(highs, lows)` in series order.
///
/// Series shorter than three samples have no interior and yield two empty
/// sets.
pub fn extract_peaks(series: &Series) -> (PeakSet, PeakSet) {
    let mut highs = PeakSet::new(PeakKind::High);
    let mut lows = PeakSet::new(PeakKind::Low);

    for (offset, window) in series.samples().windows(3).enumerate() {
        let (prev, here, next) = (window[0].value, window[1].value, window[2].value);
        let peak = Peak {
            index: offset + 1,
            sample: window[1],
        };

        if here > prev && here > next {
            highs.peaks.push(peak);
        } else if here < prev && here < next {
            lows.peaks.push(peak);
        }
    }

    (highs, lows)
}
