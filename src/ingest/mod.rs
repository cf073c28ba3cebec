/// Acquisition boundary: everything that turns an already-extracted raw
/// batch into a validated `Series`.
///
/// Submodules:
/// - `raw`      — tolerant decoding of the station-id → batch JSON mapping
/// - `series`   — the Sample Series Builder (validation, timezone, sorting)
/// - `fixtures` — synthetic tidal batches for demos and tests

pub mod fixtures;
pub mod raw;
pub mod series;
