/// Alerting for the gauge service.
///
/// Submodules:
/// - `thresholds` — current level against per-station warning/flood levels

pub mod thresholds;
