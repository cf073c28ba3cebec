/// Read-only HTTP API over the latest snapshot.
///
/// Endpoints:
/// - GET /api/health                   - Service health and data freshness
/// - GET /api/stations                 - Configured stations and thresholds
/// - GET /api/latest                   - Whole latest snapshot
/// - GET /api/stations/{id}            - One station's latest result
/// - GET /api/alerts                   - Stations at WARNING or CRITICAL
/// - GET /api/history/{id}?limit=N     - Recent history log rows for a station
///
/// Every body is `{"success": true, "data": …}` or
/// `{"success": false, "error": "…"}`. Routing is a pure function of the
/// request path and a `RouteContext`, which the server reloads from disk
/// for every request so a concurrent `run` is picked up without restart.

use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use crate::model::AlertLevel;
use crate::snapshot::{read_history, read_latest, HistoryRow, Snapshot};
use crate::stations::StationRegistry;

const SERVICE_NAME: &str = "mekong_gauge_service";
const DEFAULT_HISTORY_LIMIT: usize = 100;
const ROUTES: [&str; 6] = [
    "/api/health",
    "/api/stations",
    "/api/latest",
    "/api/stations/{station_id}",
    "/api/alerts",
    "/api/history/{station_id}?limit=N",
];

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Data a request is answered from.
pub struct RouteContext<'a> {
    pub registry: &'a StationRegistry,
    pub snapshot: Option<Snapshot>,
    pub history: Vec<HistoryRow>,
}

/// Status code plus JSON body, before it is put on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok(data: Value) -> Self {
        Self {
            status: 200,
            body: json!({ "success": true, "data": data }),
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "success": false, "error": message.into() }),
        }
    }
}

/// Answers one GET request path (query string included).
pub fn route(url: &str, ctx: &RouteContext) -> ApiResponse {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    let path = path.trim_end_matches('/');

    match path {
        "/api/health" => handle_health(ctx),
        "/api/stations" => handle_stations(ctx),
        "/api/latest" => handle_latest(ctx),
        "/api/alerts" => handle_alerts(ctx),
        _ => {
            if let Some(station_id) = path.strip_prefix("/api/stations/") {
                handle_station(ctx, station_id)
            } else if let Some(station_id) = path.strip_prefix("/api/history/") {
                handle_history(ctx, station_id, query)
            } else {
                ApiResponse {
                    status: 404,
                    body: json!({
                        "success": false,
                        "error": format!("Not found: {}", path),
                        "available_endpoints": ROUTES,
                    }),
                }
            }
        }
    }
}

fn handle_health(ctx: &RouteContext) -> ApiResponse {
    ApiResponse::ok(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "has_data": ctx.snapshot.is_some(),
        "last_updated": ctx.snapshot.as_ref().map(|s| s.last_updated),
    }))
}

fn handle_stations(ctx: &RouteContext) -> ApiResponse {
    let stations: Vec<Value> = ctx
        .registry
        .sorted()
        .into_iter()
        .map(|s| {
            json!({
                "station_id": s.station_id,
                "name": s.name,
                "name_en": s.name_en,
                "coordinates": s.coordinates(),
                "thresholds": {
                    "warning": s.warning_threshold,
                    "flood": s.flood_threshold,
                },
            })
        })
        .collect();
    ApiResponse::ok(json!(stations))
}

fn no_data() -> ApiResponse {
    ApiResponse::error(404, "No data yet. Wait for the first update.")
}

fn handle_latest(ctx: &RouteContext) -> ApiResponse {
    match &ctx.snapshot {
        Some(snapshot) => ApiResponse::ok(json!(snapshot)),
        None => no_data(),
    }
}

fn handle_station(ctx: &RouteContext, station_id: &str) -> ApiResponse {
    if !ctx.registry.contains(station_id) {
        return ApiResponse::error(404, format!("Station not found: {}", station_id));
    }
    let Some(snapshot) = &ctx.snapshot else {
        return no_data();
    };
    match snapshot.stations.get(station_id) {
        Some(result) => ApiResponse::ok(json!(result)),
        None => ApiResponse::error(404, format!("No data for station {}", station_id)),
    }
}

fn handle_alerts(ctx: &RouteContext) -> ApiResponse {
    let Some(snapshot) = &ctx.snapshot else {
        return no_data();
    };
    let alerting = snapshot.alerts();
    let alerts: Vec<Value> = alerting
        .iter()
        .map(|r| {
            json!({
                "station_id": r.station_id,
                "station_name": r.station_name,
                "alert_level": r.alert.level,
                "message": r.alert.message,
                "current_water_level": r.current.water_level,
                "timestamp": r.current.timestamp,
            })
        })
        .collect();

    ApiResponse::ok(json!({
        "total": alerts.len(),
        "has_critical": alerting.iter().any(|r| r.alert.level == AlertLevel::Critical),
        "alerts": alerts,
    }))
}

fn handle_history(ctx: &RouteContext, station_id: &str, query: &str) -> ApiResponse {
    if !ctx.registry.contains(station_id) {
        return ApiResponse::error(404, format!("Station not found: {}", station_id));
    }
    let limit = match parse_limit(query) {
        Ok(limit) => limit,
        Err(message) => return ApiResponse::error(400, message),
    };

    let rows: Vec<&HistoryRow> = ctx
        .history
        .iter()
        .filter(|r| r.station_id == station_id)
        .collect();
    if rows.is_empty() {
        return ApiResponse::error(404, format!("No history for station {}", station_id));
    }
    let records = &rows[rows.len().saturating_sub(limit)..];

    ApiResponse::ok(json!({
        "station_id": station_id,
        "total": records.len(),
        "records": records,
    }))
}

fn parse_limit(query: &str) -> Result<usize, String> {
    let raw = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "limit")
        .map(|(_, value)| value);

    match raw {
        None => Ok(DEFAULT_HISTORY_LIMIT),
        Some(value) => value
            .parse::<usize>()
            .map_err(|_| format!("limit must be a non-negative integer, got '{}'", value)),
    }
}

// ---------------------------------------------------------------------------
// HTTP Server
// ---------------------------------------------------------------------------

/// Where the server reads its data from on each request.
#[derive(Debug, Clone)]
pub struct EndpointSources {
    pub snapshot_path: PathBuf,
    pub history_path: PathBuf,
}

impl EndpointSources {
    /// Loads the current context. A missing or unreadable file reads as no data.
    pub fn load<'a>(&self, registry: &'a StationRegistry) -> RouteContext<'a> {
        RouteContext {
            registry,
            snapshot: load_snapshot(&self.snapshot_path),
            history: load_history(&self.history_path),
        }
    }
}

fn load_snapshot(path: &Path) -> Option<Snapshot> {
    if !path.exists() {
        return None;
    }
    match read_latest(path) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            tracing::warn!("Failed to read snapshot {}: {}", path.display(), e);
            None
        }
    }
}

fn load_history(path: &Path) -> Vec<HistoryRow> {
    if !path.exists() {
        return Vec::new();
    }
    read_history(path, None, usize::MAX).unwrap_or_else(|e| {
        tracing::warn!("Failed to read history {}: {}", path.display(), e);
        Vec::new()
    })
}

/// Start the HTTP endpoint server on the specified port. Blocks forever.
pub fn start_endpoint_server(
    port: u16,
    registry: &StationRegistry,
    sources: &EndpointSources,
) -> Result<(), String> {
    let server = tiny_http::Server::http(format!("0.0.0.0:{}", port))
        .map_err(|e| format!("Failed to start HTTP server: {}", e))?;

    tracing::info!("HTTP endpoint listening on http://0.0.0.0:{}", port);
    for path in ROUTES {
        tracing::info!("   GET {}", path);
    }

    for request in server.incoming_requests() {
        let response = if *request.method() == tiny_http::Method::Get {
            let ctx = sources.load(registry);
            route(request.url(), &ctx)
        } else {
            ApiResponse::error(405, "Only GET is supported")
        };

        tracing::debug!(url = request.url(), status = response.status, "request served");
        if let Err(e) = request.respond(create_response(&response)) {
            tracing::warn!("Failed to send response: {}", e);
        }
    }

    Ok(())
}

/// Create HTTP response with JSON body
fn create_response(response: &ApiResponse) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let body = serde_json::to_string_pretty(&response.body)
        .unwrap_or_else(|_| response.body.to_string());

    let mut http = tiny_http::Response::from_data(body.into_bytes())
        .with_status_code(tiny_http::StatusCode::from(response.status));
    if let Ok(header) =
        tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json; charset=utf-8"[..])
    {
        http = http.with_header(header);
    }
    http
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures::synthetic_batches;
    use crate::logging::MemoryLog;
    use crate::pipeline::{ProcessingSettings, StationProcessor};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn demo_snapshot(registry: &StationRegistry) -> Snapshot {
        let settings = ProcessingSettings::default();
        let processor =
            StationProcessor::new(registry.clone(), settings.clone(), Arc::new(MemoryLog::new()));
        let now = Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap();
        let generated_at = now.with_timezone(&settings.timezone);
        let results = processor.process_all_at(&synthetic_batches(registry, now, 48), generated_at);
        Snapshot::new(results, &settings, generated_at)
    }

    fn context_with_data(registry: &StationRegistry) -> RouteContext<'_> {
        let snapshot = demo_snapshot(registry);
        let history = HistoryRow::from_snapshot(&snapshot);
        RouteContext {
            registry,
            snapshot: Some(snapshot),
            history,
        }
    }

    fn empty_context(registry: &StationRegistry) -> RouteContext<'_> {
        RouteContext {
            registry,
            snapshot: None,
            history: Vec::new(),
        }
    }

    #[test]
    fn test_health_reports_missing_data() {
        let registry = StationRegistry::builtin();
        let response = route("/api/health", &empty_context(&registry));
        assert_eq!(response.status, 200);
        assert_eq!(response.body["data"]["has_data"], json!(false));
        assert_eq!(response.body["data"]["service"], json!(SERVICE_NAME));
    }

    #[test]
    fn test_stations_lists_thresholds() {
        let registry = StationRegistry::builtin();
        let response = route("/api/stations", &empty_context(&registry));
        let stations = response.body["data"].as_array().unwrap();
        assert_eq!(stations.len(), 5);
        let tan_chau = stations
            .iter()
            .find(|s| s["station_id"] == json!("tan_chau"))
            .unwrap();
        assert_eq!(tan_chau["thresholds"]["flood"], json!(4.5));
    }

    #[test]
    fn test_latest_without_snapshot_is_404() {
        let registry = StationRegistry::builtin();
        let response = route("/api/latest", &empty_context(&registry));
        assert_eq!(response.status, 404);
        assert_eq!(response.body["success"], json!(false));
    }

    #[test]
    fn test_station_lookup() {
        let registry = StationRegistry::builtin();
        let ctx = context_with_data(&registry);

        let found = route("/api/stations/can_tho", &ctx);
        assert_eq!(found.status, 200);
        assert_eq!(found.body["data"]["station_id"], json!("can_tho"));
        assert_eq!(found.body["data"]["current"]["unit"], json!("m"));

        assert_eq!(route("/api/stations/ghost", &ctx).status, 404);
    }

    #[test]
    fn test_alerts_flag_critical() {
        let registry = StationRegistry::builtin();
        let mut ctx = context_with_data(&registry);
        if let Some(snapshot) = ctx.snapshot.as_mut() {
            snapshot.stations.get_mut("chau_doc").unwrap().alert.level = AlertLevel::Critical;
        }

        let response = route("/api/alerts", &ctx);
        assert_eq!(response.body["data"]["total"], json!(1));
        assert_eq!(response.body["data"]["has_critical"], json!(true));
        assert_eq!(response.body["data"]["alerts"][0]["alert_level"], json!("CRITICAL"));
    }

    #[test]
    fn test_history_limit() {
        let registry = StationRegistry::builtin();
        let mut ctx = context_with_data(&registry);
        let extra = ctx.history.clone();
        ctx.history.extend(extra);

        let all = route("/api/history/my_thuan", &ctx);
        assert_eq!(all.body["data"]["total"], json!(2));

        let one = route("/api/history/my_thuan?limit=1", &ctx);
        assert_eq!(one.body["data"]["total"], json!(1));

        assert_eq!(route("/api/history/my_thuan?limit=abc", &ctx).status, 400);
    }

    #[test]
    fn test_unknown_path_lists_routes() {
        let registry = StationRegistry::builtin();
        let response = route("/nope", &empty_context(&registry));
        assert_eq!(response.status, 404);
        assert_eq!(response.body["available_endpoints"].as_array().unwrap().len(), ROUTES.len());
    }
}
