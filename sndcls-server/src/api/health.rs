//! Health and greeting endpoints

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Module name ("sndcls-server")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Active feature mode
    pub mode: String,
    /// Shape of the tensor fed to the classifier
    pub feature_shape: [usize; 3],
    /// Width of the classifier output
    pub num_classes: usize,
}

/// GET /
///
/// Fixed greeting used as a liveness probe.
pub async fn root() -> Json<Value> {
    Json(json!({ "Hello": "World" }))
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "sndcls-server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        mode: state.extractor.config().mode.to_string(),
        feature_shape: state.extractor.output_shape(),
        num_classes: state.classifier.num_classes(),
    })
}

/// Build greeting and health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
}
