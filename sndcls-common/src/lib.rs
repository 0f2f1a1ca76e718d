//! # sndcls common library
//!
//! Shared code for the sndcls classification service:
//! - Error taxonomy (`Error`, `Result`)
//! - Feature extraction configuration (JSON)
//! - Bootstrap service configuration (TOML) and its resolution order

pub mod config;
pub mod error;
pub mod extraction;

pub use error::{Error, Result};
pub use extraction::{ExtractionConfig, FeatureMode};
