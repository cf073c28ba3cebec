/// mekong_gauge_service: Mekong delta water level analytics service.
///
/// # Module structure
///
/// ```text
/// mekong_gauge_service
/// ├── model       — shared data types (Sample, Series, StationResult, SkipReason, …)
/// ├── config      — service and station configuration loader (stations.toml)
/// ├── stations    — compiled-in station table and the runtime StationRegistry
/// ├── logging     — injected PipelineLog capability (tracing-backed and in-memory)
/// ├── ingest
/// │   ├── raw      — tolerant decoding of upstream JSON batches
/// │   ├── series   — raw batch → ordered, timezone-converted Series
/// │   └── fixtures — synthetic semidiurnal batches for demos and tests
/// ├── analysis
/// │   ├── peaks      — strict local extrema (high/low tides)
/// │   ├── forecast   — next-peak extrapolation from the mean cycle
/// │   ├── trend      — short-window least-squares direction
/// │   └── statistics — max/min/mean/std/range summary
/// ├── alert
/// │   └── thresholds — warning/flood tier classification and message
/// ├── pipeline    — per-station result assembly, sequential and pooled batches
/// ├── snapshot    — latest JSON snapshot and CSV history log
/// └── endpoint    — read-only HTTP API over the snapshot
/// ```

/// Public modules
pub mod alert;
pub mod analysis;
pub mod config;
pub mod endpoint;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod snapshot;
pub mod stations;
