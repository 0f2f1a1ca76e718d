//! HTTP API handlers
//!
//! - `GET /` greeting probe
//! - `GET /health` service diagnostics
//! - `POST /predict` multipart audio upload → ranked classes

pub mod health;
pub mod predict;

pub use health::health_routes;
pub use predict::predict_routes;
