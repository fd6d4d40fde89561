//! HTTP API for the fleet dashboard
//!
//! Routes:
//! - GET    /api/health
//! - GET    /metrics                       (Prometheus text)
//! - GET    /api/arrets?from=&to=&status=&camion=
//! - GET    /api/camions
//! - GET    /api/camions/{plate}/trajet
//! - GET    /api/poi, POST /api/poi
//! - PUT    /api/poi/{id}, DELETE /api/poi/{id}
//!
//! JSON bodies use `{success, data}` / `{success: false, message}` envelopes.

use crate::domain::stop::ConformityStatus;
use crate::domain::types::PoiDraft;
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::api::{Envelope, ErrorEnvelope, PoiRow, StopListing, VehicleRow};
use crate::io::prometheus::format_prometheus_metrics;
use crate::io::store::{FleetStore, StoreError};
use crate::services::audit::{run_audit, StopFilter};
use crate::services::fleet::{fleet_overview, trajectory};
use crate::services::position::GpsHistory;
use crate::services::stop_enricher::StopEnricher;
use bytes::Bytes;
use chrono::NaiveDate;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Largest accepted request body (POI drafts are tiny)
const MAX_BODY_BYTES: usize = 64 * 1024;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared handler state
pub struct AppState {
    pub store: Arc<dyn FleetStore>,
    pub config: Config,
    pub metrics: Arc<Metrics>,
    pub enricher: StopEnricher,
}

impl AppState {
    pub fn new(store: Arc<dyn FleetStore>, config: Config, metrics: Arc<Metrics>) -> Self {
        let enricher = StopEnricher::with_threshold(config.threshold_m());
        Self { store, config, metrics, enricher }
    }
}

type HttpResponse = Response<Full<Bytes>>;

fn build_response(status: StatusCode, content_type: Option<&str>, body: Bytes) -> HttpResponse {
    let mut builder = Response::builder()
        .status(status)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization");
    if let Some(content_type) = content_type {
        builder = builder.header("Content-Type", content_type);
    }
    builder.body(Full::new(body)).expect("static response should not fail")
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> HttpResponse {
    match serde_json::to_vec(body) {
        Ok(bytes) => build_response(status, Some("application/json"), Bytes::from(bytes)),
        Err(e) => {
            error!(error = %e, "response_serialize_failed");
            build_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                Some("application/json"),
                Bytes::from_static(br#"{"success":false,"message":"Internal server error"}"#),
            )
        }
    }
}

fn ok<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::OK, &Envelope::ok(data))
}

fn fail(status: StatusCode, message: &str) -> HttpResponse {
    json_response(status, &ErrorEnvelope::new(message))
}

/// Map a store failure to a response; `context` is the user-facing message
fn store_failure(e: StoreError, context: &str) -> HttpResponse {
    match e {
        StoreError::NotFound { id } => {
            debug!(id = %id, "record_not_found");
            fail(StatusCode::NOT_FOUND, "POI not found")
        }
        StoreError::Invalid(reason) => fail(StatusCode::BAD_REQUEST, &reason),
        StoreError::Unavailable(reason) => {
            error!(error = %reason, context = %context, "store_unavailable");
            fail(StatusCode::INTERNAL_SERVER_ERROR, context)
        }
    }
}

/// Raw `/api/arrets` query parameters; empty values count as absent
#[derive(Debug, Default, Deserialize)]
struct StopQuery {
    from: Option<String>,
    to: Option<String>,
    status: Option<String>,
    camion: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_day(value: String) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| format!("invalid date: {value}"))
}

/// Parse the stop listing query string into a filter
pub fn parse_stop_filter(query: Option<&str>) -> Result<StopFilter, String> {
    let query: StopQuery = serde_urlencoded::from_str(query.unwrap_or(""))
        .map_err(|e| format!("invalid query string: {e}"))?;

    Ok(StopFilter {
        from: non_empty(query.from).map(parse_day).transpose()?,
        to: non_empty(query.to).map(parse_day).transpose()?,
        status: non_empty(query.status).map(|v| v.parse::<ConformityStatus>()).transpose()?,
        plate: non_empty(query.camion),
    })
}

async fn read_json<T, B>(req: Request<B>) -> Result<T, String>
where
    T: DeserializeOwned,
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let body = Limited::new(req.into_body(), MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| format!("unreadable body: {e}"))?;
    serde_json::from_slice(&body.to_bytes()).map_err(|e| format!("invalid JSON body: {e}"))
}

async fn list_stops(state: &AppState, query: Option<&str>) -> HttpResponse {
    let filter = match parse_stop_filter(query) {
        Ok(filter) => filter,
        Err(reason) => return fail(StatusCode::BAD_REQUEST, &reason),
    };
    match run_audit(state.store.as_ref(), &state.enricher, Some(&state.metrics)).await {
        Ok(stops) => ok(StopListing::new(&filter.apply(stops))),
        Err(e) => store_failure(e, "Failed to load stops"),
    }
}

async fn list_vehicles(state: &AppState) -> HttpResponse {
    let loaded = tokio::try_join!(state.store.vehicles(), state.store.gps_fixes());
    match loaded {
        Ok((vehicles, fixes)) => {
            let history = GpsHistory::from_fixes(&fixes);
            let rows: Vec<VehicleRow> = fleet_overview(&vehicles, &history)
                .iter()
                .enumerate()
                .map(|(i, snapshot)| VehicleRow::from_snapshot(i, snapshot))
                .collect();
            ok(rows)
        }
        Err(e) => store_failure(e, "Failed to load vehicles"),
    }
}

async fn vehicle_trajectory(state: &AppState, plate: &str) -> HttpResponse {
    match state.store.gps_fixes_for(plate).await {
        Ok(fixes) => {
            let history = GpsHistory::from_fixes(&fixes);
            let points: Vec<[f64; 2]> =
                trajectory(&history, plate).into_iter().map(|c| [c.lat, c.lng]).collect();
            ok(points)
        }
        Err(e) => store_failure(e, "Failed to load trajectory"),
    }
}

async fn list_pois(state: &AppState) -> HttpResponse {
    match state.store.pois().await {
        Ok(pois) => {
            let rows: Vec<PoiRow> = pois.into_iter().map(|p| PoiRow::new(p, &state.config)).collect();
            ok(rows)
        }
        Err(e) => store_failure(e, "Failed to load POIs"),
    }
}

async fn create_poi<B>(state: &AppState, req: Request<B>) -> HttpResponse
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let draft: PoiDraft = match read_json(req).await {
        Ok(draft) => draft,
        Err(reason) => return fail(StatusCode::BAD_REQUEST, &reason),
    };
    match state.store.create_poi(draft).await {
        Ok(poi) => {
            state.metrics.record_poi_mutation();
            info!(id = %poi.id, name = %poi.name, "poi_created");
            json_response(StatusCode::CREATED, &Envelope::ok(PoiRow::new(poi, &state.config)))
        }
        Err(e) => store_failure(e, "Failed to create POI"),
    }
}

async fn update_poi<B>(state: &AppState, id: i64, req: Request<B>) -> HttpResponse
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let draft: PoiDraft = match read_json(req).await {
        Ok(draft) => draft,
        Err(reason) => return fail(StatusCode::BAD_REQUEST, &reason),
    };
    match state.store.update_poi(id, draft).await {
        Ok(poi) => {
            state.metrics.record_poi_mutation();
            info!(id = %poi.id, name = %poi.name, "poi_updated");
            ok(PoiRow::new(poi, &state.config))
        }
        Err(e) => store_failure(e, "Failed to update POI"),
    }
}

async fn delete_poi(state: &AppState, id: i64) -> HttpResponse {
    match state.store.delete_poi(id).await {
        Ok(()) => {
            state.metrics.record_poi_mutation();
            info!(id = %id, "poi_deleted");
            json_response(
                StatusCode::OK,
                &serde_json::json!({ "success": true, "message": "POI deleted" }),
            )
        }
        Err(e) => store_failure(e, "Failed to delete POI"),
    }
}

fn health(state: &AppState) -> HttpResponse {
    ok(serde_json::json!({
        "message": "Server is running",
        "site": state.config.site_id(),
        "version": env!("GIT_HASH"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

fn metrics_text(state: &AppState) -> HttpResponse {
    let body = format_prometheus_metrics(&state.metrics, state.config.site_id());
    build_response(StatusCode::OK, Some("text/plain; version=0.0.4; charset=utf-8"), Bytes::from(body))
}

/// Route a request to its handler
async fn route<B>(req: Request<B>, state: &AppState) -> HttpResponse
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    if method == Method::OPTIONS {
        return build_response(StatusCode::NO_CONTENT, None, Bytes::new());
    }

    match (&method, segments.as_slice()) {
        (&Method::GET, ["metrics"]) => metrics_text(state),
        (&Method::GET, ["api", "health"]) => health(state),
        (&Method::GET, ["api", "arrets"]) => list_stops(state, query.as_deref()).await,
        (&Method::GET, ["api", "camions"]) => list_vehicles(state).await,
        (&Method::GET, ["api", "camions", plate, "trajet"]) => {
            let plate = percent_decode_str(plate).decode_utf8_lossy();
            vehicle_trajectory(state, &plate).await
        }
        (&Method::GET, ["api", "poi"]) => list_pois(state).await,
        (&Method::POST, ["api", "poi"]) => create_poi(state, req).await,
        (&Method::PUT, ["api", "poi", id]) | (&Method::DELETE, ["api", "poi", id]) => {
            let Ok(id) = id.parse::<i64>() else {
                return fail(StatusCode::BAD_REQUEST, "invalid POI id");
            };
            if method == Method::PUT {
                update_poi(state, id, req).await
            } else {
                delete_poi(state, id).await
            }
        }
        _ => fail(StatusCode::NOT_FOUND, "Route not found"),
    }
}

/// Handle HTTP requests
async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Result<HttpResponse, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    state.metrics.record_request();

    let response = route(req, &state).await;

    let status = response.status();
    if status.is_server_error() {
        state.metrics.record_request_error();
        warn!(method = %method, path = %path, status = %status.as_u16(), "http_request_failed");
    } else {
        debug!(method = %method, path = %path, status = %status.as_u16(), "http_request");
    }
    Ok(response)
}

/// Start the API HTTP server
pub async fn start_http_server(
    addr: SocketAddr,
    state: Arc<AppState>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    info!(addr = %addr, site = %state.config.site_id(), "http_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let state = state.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let state = state.clone();
                                async move { handle_request(req, state).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "http_connection_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "http_accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("http_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}
