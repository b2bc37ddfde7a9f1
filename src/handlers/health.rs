use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use std::path::Path;
use std::time::SystemTime;
use tracing::info;

use crate::state::AppState;

fn is_writable_dir(dir: &Path) -> bool {
    std::fs::metadata(dir)
        .map(|m| m.is_dir() && !m.permissions().readonly())
        .unwrap_or(false)
}

/// Health check endpoint
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let timestamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let upload_ok = is_writable_dir(&state.config.upload_dir);
    let output_ok = is_writable_dir(&state.config.output_dir);
    let metrics = state.limiter.metrics();

    let status = if upload_ok && output_ok { "healthy" } else { "degraded" };

    info!(status = status, upload_ok = upload_ok, output_ok = output_ok, "Health check completed");

    Json(json!({
        "status": status,
        "timestamp": timestamp,
        "version": env!("CARGO_PKG_VERSION"),
        "storage": {
            "upload_folder": upload_ok,
            "output_folder": output_ok
        },
        "rate_limiting": {
            "total_requests": metrics.total_requests,
            "rejected_requests": metrics.rejected_requests,
            "available_permits": metrics.available_permits
        }
    }))
}

/// Readiness check endpoint
pub async fn ready_handler(State(state): State<AppState>) -> StatusCode {
    if is_writable_dir(&state.config.output_dir) {
        StatusCode::OK
    } else {
        info!("Readiness check failed - output folder unavailable");
        StatusCode::SERVICE_UNAVAILABLE
    }
}
