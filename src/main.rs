//! Fraud Detection Dashboard
//!
//! Upload a CSV of transactions, run the pre-trained classifier over it and
//! get per-row fraud predictions, a summary and a downloadable result file.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     FRAUD DASHBOARD                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  upload ──▶ Feature      ──▶ Inference ──▶ Summary ──▶ report │
//! │  (CSV)      Reconciler       Runner                 / CSV    │
//! │                                 │                            │
//! │                          ┌──────┴──────┐                     │
//! │                          │ Classifier  │  loaded once,       │
//! │                          │ (ONNX)      │  shared read-only   │
//! │                          └─────────────┘                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod handlers;
mod logic;
mod models;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use logic::model::{Classifier, ModelManifest, OnnxClassifier};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging
    let json_logs = config.json_logs;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fraud_dashboard=debug,tower_http=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    tracing::info!("Fraud Detection Dashboard starting ({})", config.environment);

    // Load model once; nothing can be served without it
    let model = match load_model(&config) {
        Ok(model) => model,
        Err(e) => {
            tracing::error!(
                "Model could not be loaded from {}: {}",
                config.model_path.display(),
                e
            );
            return Err(e).context("model load failed, refusing to start");
        }
    };

    let state = AppState {
        model,
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<dyn Classifier>,
    pub config: config::Config,
}

fn load_model(config: &config::Config) -> Result<Arc<dyn Classifier>, logic::model::ModelError> {
    let manifest = ModelManifest::load(&config.manifest_path)?;
    let model = OnnxClassifier::load(&config.model_path, manifest, config.onnx_threads)?;
    Ok(Arc::new(model))
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    let cors = if state.config.is_production() {
        CorsLayer::new()
    } else {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/", get(handlers::dashboard::index))
        .route("/health", get(handlers::health::check))
        .route("/api/v1/model", get(handlers::model::describe))
        .route("/api/v1/predict", post(handlers::predict::predict))
        .route("/api/v1/predict/download", post(handlers::predict::download))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
