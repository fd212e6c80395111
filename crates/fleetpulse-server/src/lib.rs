//! HTTP telemetry server.
//!
//! Devices post heartbeats and upload stats; clients read back uptime and
//! average upload time. All state lives in a shared [`Registry`].

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use fleetpulse_core::{Registry, RegistryError, StatsReport};

/// Shared server state.
struct AppState {
    registry: Arc<Registry>,
}

#[derive(Debug, Deserialize)]
struct HeartbeatRequest {
    sent_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct UploadStatRequest {
    /// When the device finished the upload. Informational only.
    sent_at: Option<DateTime<Utc>>,
    /// Upload duration in nanoseconds.
    upload_time: i64,
}

#[derive(Serialize)]
struct ErrorResponse {
    msg: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    devices: usize,
}

#[derive(Serialize)]
struct DevicesResponse {
    devices: Vec<String>,
    total: usize,
}

/// Request failures, rendered as `{"msg": ...}` bodies.
#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("Device not found")]
    DeviceNotFound,

    #[error("Invalid json")]
    InvalidJson(#[source] serde_json::Error),

    #[error("upload_time must not be negative")]
    NegativeUploadTime,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::DeviceNotFound => StatusCode::NOT_FOUND,
            Self::InvalidJson(_) | Self::NegativeUploadTime => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DeviceNotFound { .. } => Self::DeviceNotFound,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            msg: self.to_string(),
        });
        (self.status(), body).into_response()
    }
}

fn decode<'a, T: Deserialize<'a>>(device_id: &str, body: &'a [u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        warn!("rejected body for {device_id}: {e}");
        ApiError::InvalidJson(e)
    })
}

async fn handle_heartbeat(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let stats = state.registry.lookup(&device_id)?;
    let heartbeat: HeartbeatRequest = decode(&device_id, &body)?;

    stats.record_heartbeat(heartbeat.sent_at);
    debug!("heartbeat {device_id} at {}", heartbeat.sent_at);
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_post_stats(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let stats = state.registry.lookup(&device_id)?;
    let upload: UploadStatRequest = decode(&device_id, &body)?;
    let nanos = u64::try_from(upload.upload_time).map_err(|_| {
        warn!(
            "rejected upload_time {} for {device_id}",
            upload.upload_time
        );
        ApiError::NegativeUploadTime
    })?;

    stats.record_upload(Duration::from_nanos(nanos));
    debug!(
        "upload {device_id}: {nanos}ns (sent_at {:?})",
        upload.sent_at
    );
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_get_stats(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
) -> Result<Json<StatsReport>, ApiError> {
    Ok(Json(state.registry.report(&device_id)?))
}

async fn handle_devices(State(state): State<Arc<AppState>>) -> Json<DevicesResponse> {
    let devices = state.registry.device_ids();
    let total = devices.len();
    Json(DevicesResponse { devices, total })
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        devices: state.registry.len(),
    })
}

async fn handle_index() -> Json<&'static str> {
    Json("OK.")
}

/// Build the axum router over `registry`.
pub fn build_router(registry: Arc<Registry>) -> Router {
    let state = Arc::new(AppState { registry });

    Router::new()
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        .route("/api/v1/devices", get(handle_devices))
        .route(
            "/api/v1/devices/{device_id}/heartbeat",
            post(handle_heartbeat),
        )
        .route(
            "/api/v1/devices/{device_id}/stats",
            get(handle_get_stats).post(handle_post_stats),
        )
        .with_state(state)
}

/// Run the HTTP server until Ctrl-C.
pub async fn run_server(registry: Arc<Registry>, host: &str, port: u16) -> std::io::Result<()> {
    let app = build_router(registry);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => {
            warn!("cannot listen for Ctrl-C, running until killed: {e}");
            std::future::pending::<()>().await;
        }
    }
}
