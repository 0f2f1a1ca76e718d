//! Prediction endpoint
//!
//! `POST /predict` takes a multipart upload, runs decode → extract → infer
//! on the blocking pool and answers with `{"probas": [...], "classes": [...]}`.

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use sndcls_common::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::audio::SignalLoader;
use crate::error::{ApiError, ApiResult};
use crate::features::FeatureExtractor;
use crate::model::Classifier;
use crate::prediction::{rank_predictions, RankedPrediction};
use crate::AppState;

/// Multipart field carrying the audio bytes
pub const UPLOAD_FIELD: &str = "audio_file";

/// Uploaded audio and its container hint
#[derive(Debug)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub extension: Option<String>,
}

/// Pick the audio upload out of a multipart body
///
/// Uses the `audio_file` field; otherwise the first field that carries a
/// file name.
pub async fn read_upload(multipart: &mut Multipart) -> ApiResult<Upload> {
    let mut fallback = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let is_audio_field = field.name() == Some(UPLOAD_FIELD);
        if !is_audio_field && (fallback.is_some() || field.file_name().is_none()) {
            continue;
        }

        let extension = field
            .file_name()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;

        let upload = Upload {
            bytes: bytes.to_vec(),
            extension,
        };
        if is_audio_field {
            return Ok(upload);
        }
        fallback = Some(upload);
    }

    fallback.ok_or_else(|| {
        ApiError::BadRequest(format!("Missing '{}' upload field", UPLOAD_FIELD))
    })
}

/// Decode, extract and classify one upload; returns raw class probabilities
pub fn classify_upload(
    extractor: &FeatureExtractor,
    classifier: &dyn Classifier,
    upload: Upload,
) -> Result<Vec<f32>> {
    let loader = SignalLoader::for_config(extractor.config());
    let waveform = loader.load_bytes(upload.bytes, upload.extension.as_deref())?;
    let features = extractor.extract(&waveform)?;
    debug!(shape = ?features.shape(), "Running classifier");
    classifier.predict(&features)
}

/// POST /predict
pub async fn predict(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<RankedPrediction>> {
    let upload = read_upload(&mut multipart).await?;
    debug!(
        bytes = upload.bytes.len(),
        extension = ?upload.extension,
        "Received upload"
    );

    let extractor = Arc::clone(&state.extractor);
    let classifier = Arc::clone(&state.classifier);
    let probas =
        tokio::task::spawn_blocking(move || classify_upload(&extractor, &*classifier, upload))
            .await
            .map_err(|e| ApiError::Internal(format!("Prediction task failed: {}", e)))??;

    let registry = state.registry.get().await?;
    registry.ensure_width(probas.len())?;
    let ranked = rank_predictions(&probas, &registry.class_names())?;

    if let Some((class, p)) = ranked.top() {
        info!("Predicted '{}' ({:.3})", class, p);
    }

    Ok(Json(ranked))
}

/// Build prediction routes
pub fn predict_routes() -> Router<AppState> {
    Router::new().route("/predict", post(predict))
}
