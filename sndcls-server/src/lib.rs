//! sndcls-server library interface
//!
//! Audio clip classification: signal loading, feature extraction, model
//! inference and the HTTP surface around them. Exposed as a library for
//! integration testing and the `sndcls-extract` tool.

pub mod api;
pub mod audio;
pub mod error;
pub mod features;
pub mod model;
pub mod prediction;
pub mod registry;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::features::FeatureExtractor;
use crate::model::Classifier;
use crate::registry::RegistryCache;

/// Largest accepted upload
pub const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Application state shared across handlers
///
/// Everything here is read-only after startup except the registry cache,
/// which guards itself.
#[derive(Clone)]
pub struct AppState {
    /// Extractor built from the extraction config
    pub extractor: Arc<FeatureExtractor>,
    /// Trained model, loaded once for the process lifetime
    pub classifier: Arc<dyn Classifier>,
    /// Class names, re-read when the registry file changes
    pub registry: Arc<RegistryCache>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        extractor: FeatureExtractor,
        classifier: Arc<dyn Classifier>,
        registry: RegistryCache,
    ) -> Self {
        Self {
            extractor: Arc::new(extractor),
            classifier,
            registry: Arc::new(registry),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::predict_routes())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
