/// Per-station analytics over a sorted `Series`.
///
/// Submodules:
/// - `peaks`      — strict local maxima / minima (tidal highs and lows)
/// - `forecast`   — next high/low extrapolated from the mean peak cycle
/// - `trend`      — short-window least-squares slope and direction
/// - `statistics` — max / min / mean / population std / range
///
/// Every function here is pure and total: an empty or too-short series
/// yields an empty or absent result, never a panic or a NaN.

pub mod forecast;
pub mod peaks;
pub mod statistics;
pub mod trend;
