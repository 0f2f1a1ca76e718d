//! sndcls-server - audio clip classification service
//!
//! Loads the extraction config, classifier and class registry once at
//! startup, then serves `GET /`, `GET /health` and `POST /predict`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sndcls_common::config::{self, ServiceConfig, ServiceOverrides};
use sndcls_common::ExtractionConfig;
use sndcls_server::features::FeatureExtractor;
use sndcls_server::model::{Classifier, DenseClassifier};
use sndcls_server::registry::RegistryCache;
use sndcls_server::AppState;

/// Command-line arguments for sndcls-server
#[derive(Parser, Debug)]
#[command(name = "sndcls-server")]
#[command(about = "Audio clip classification service")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "SNDCLS_CONFIG")]
    config: Option<PathBuf>,

    /// Interface to bind
    #[arg(long, env = "SNDCLS_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "SNDCLS_PORT")]
    port: Option<u16>,

    /// Feature extraction JSON document
    #[arg(long, env = "SNDCLS_EXTRACTION_CONFIG")]
    extraction_config: Option<PathBuf>,

    /// Class registry JSON document
    #[arg(long, env = "SNDCLS_CLASSES")]
    classes: Option<PathBuf>,

    /// Classifier weights (safetensors)
    #[arg(long, env = "SNDCLS_MODEL")]
    model: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long, env = "SNDCLS_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = config::load_toml_or_default(args.config.as_deref())
        .context("Failed to load configuration file")?;
    let service = ServiceConfig::resolve(
        ServiceOverrides {
            host: args.host,
            port: args.port,
            extraction_config: args.extraction_config,
            classes: args.classes,
            model: args.model,
            log_level: args.log_level,
        },
        &toml_config,
    );

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "sndcls_server={level},sndcls_common={level},tower_http={level}",
                    level = service.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting sndcls-server");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Step 1: Extraction config (fatal if malformed)
    let extraction = ExtractionConfig::load(&service.extraction_config).with_context(|| {
        format!(
            "Failed to load extraction config: {}",
            service.extraction_config.display()
        )
    })?;
    let extractor = FeatureExtractor::new(extraction).context("Invalid extraction config")?;
    info!(
        "Feature mode: {}, tensor shape: {:?}",
        extractor.config().mode,
        extractor.output_shape()
    );

    // Step 2: Classifier, loaded once for the process lifetime
    let classifier: Arc<dyn Classifier> = Arc::new(
        DenseClassifier::load(&service.model, extractor.output_shape())
            .context("Failed to load classifier")?,
    );

    // Step 3: Class registry must match the classifier output
    let registry = RegistryCache::new(&service.classes);
    registry
        .get()
        .await
        .and_then(|r| r.ensure_width(classifier.num_classes()))
        .context("Class registry does not match the classifier")?;

    let state = AppState::new(extractor, classifier, registry);
    let app = sndcls_server::build_router(state);

    let addr = service.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
