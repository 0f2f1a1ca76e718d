//! HTTP routing integration tests
//!
//! Drives the router with `oneshot` against a stub classifier and a
//! registry file in a temp directory.

mod helpers;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use helpers::{generate_wav_bytes, small_config, AudioConfig};
use sndcls_common::{FeatureMode, Result};
use sndcls_server::features::{FeatureExtractor, FeatureTensor};
use sndcls_server::model::Classifier;
use sndcls_server::registry::RegistryCache;
use sndcls_server::{build_router, AppState};

const BOUNDARY: &str = "sndcls-test-boundary";

/// Returns fixed probabilities regardless of input
struct FixedClassifier {
    probas: Vec<f32>,
}

impl Classifier for FixedClassifier {
    fn predict(&self, _features: &FeatureTensor) -> Result<Vec<f32>> {
        Ok(self.probas.clone())
    }

    fn num_classes(&self) -> usize {
        self.probas.len()
    }
}

fn write_registry(dir: &Path, json: &str) -> std::path::PathBuf {
    let path = dir.join("classes.json");
    std::fs::write(&path, json).unwrap();
    path
}

fn test_app(temp_dir: &TempDir, registry_json: &str, probas: Vec<f32>) -> axum::Router {
    let extractor = FeatureExtractor::new(small_config(FeatureMode::Mfcc)).unwrap();
    let registry = RegistryCache::new(write_registry(temp_dir.path(), registry_json));
    let classifier: Arc<dyn Classifier> = Arc::new(FixedClassifier { probas });
    build_router(AppState::new(extractor, classifier, registry))
}

fn multipart_body(field: &str, file_name: Option<&str>, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    match file_name {
        Some(name) => body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, name
            )
            .as_bytes(),
        ),
        None => body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n", field).as_bytes(),
        ),
    }
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn predict_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn clip_bytes() -> Vec<u8> {
    generate_wav_bytes(&AudioConfig {
        duration_seconds: 2.0,
        sample_rate: 8000,
        ..Default::default()
    })
    .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_root_greets() {
    let temp_dir = TempDir::new().unwrap();
    let app = test_app(&temp_dir, r#"{"a": "cat"}"#, vec![1.0]);

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json, serde_json::json!({"Hello": "World"}));
}

#[tokio::test]
async fn test_health_reports_pipeline_shape() {
    let temp_dir = TempDir::new().unwrap();
    let app = test_app(&temp_dir, r#"{"a": "cat", "b": "dog"}"#, vec![0.5, 0.5]);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "sndcls-server");
    assert_eq!(json["mode"], "mfcc");
    assert_eq!(json["feature_shape"], serde_json::json!([20, 130, 1]));
    assert_eq!(json["num_classes"], 2);
}

#[tokio::test]
async fn test_predict_ranks_by_probability() {
    let temp_dir = TempDir::new().unwrap();
    let app = test_app(
        &temp_dir,
        r#"{"3": "siren", "1": "dog_bark", "2": "drilling"}"#,
        vec![0.1, 0.7, 0.2],
    );

    let body = multipart_body("audio_file", Some("clip.wav"), &clip_bytes());
    let response = app.oneshot(predict_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;

    let classes: Vec<String> = serde_json::from_value(json["classes"].clone()).unwrap();
    let probas: Vec<f32> = serde_json::from_value(json["probas"].clone()).unwrap();
    assert_eq!(classes, vec!["drilling", "siren", "dog_bark"]);
    assert_eq!(probas, vec![0.7, 0.2, 0.1]);
}

#[tokio::test]
async fn test_predict_accepts_other_file_field() {
    let temp_dir = TempDir::new().unwrap();
    let app = test_app(&temp_dir, r#"{"a": "cat", "b": "dog"}"#, vec![0.25, 0.75]);

    let body = multipart_body("file", Some("clip.wav"), &clip_bytes());
    let response = app.oneshot(predict_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["classes"], serde_json::json!(["dog", "cat"]));
}

#[tokio::test]
async fn test_predict_without_upload_is_bad_request() {
    let temp_dir = TempDir::new().unwrap();
    let app = test_app(&temp_dir, r#"{"a": "cat"}"#, vec![1.0]);

    let body = multipart_body("comment", None, b"no audio here");
    let response = app.oneshot(predict_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_predict_undecodable_upload_is_bad_request() {
    let temp_dir = TempDir::new().unwrap();
    let app = test_app(&temp_dir, r#"{"a": "cat"}"#, vec![1.0]);

    let body = multipart_body("audio_file", Some("notes.txt"), b"this is not audio at all");
    let response = app.oneshot(predict_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "DECODE_ERROR");
}

#[tokio::test]
async fn test_registry_width_mismatch_is_server_error() {
    let temp_dir = TempDir::new().unwrap();
    let app = test_app(&temp_dir, r#"{"a": "cat", "b": "dog"}"#, vec![0.2, 0.3, 0.5]);

    let body = multipart_body("audio_file", Some("clip.wav"), &clip_bytes());
    let response = app.oneshot(predict_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "REGISTRY_ERROR");
}

#[tokio::test]
async fn test_missing_registry_file_is_server_error() {
    let temp_dir = TempDir::new().unwrap();
    let app = test_app(&temp_dir, r#"{"a": "cat"}"#, vec![1.0]);
    std::fs::remove_file(temp_dir.path().join("classes.json")).unwrap();

    let body = multipart_body("audio_file", Some("clip.wav"), &clip_bytes());
    let response = app.oneshot(predict_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_unknown_route_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let app = test_app(&temp_dir, r#"{"a": "cat"}"#, vec![1.0]);

    let response = app
        .oneshot(Request::builder().uri("/classes").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
