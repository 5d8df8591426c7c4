//! Review Sentiment Prediction Server
//!
//! Serves pre-trained sentiment classifiers behind a small web page and a
//! JSON API: predict one review, predict a whole CSV of reviews, and show the
//! evaluation exported with each model.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SENTIMENT SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────┐  ┌─────────────────────────┐ │
//! │  │  HTML     │  │  JSON     │  │  Download Store         │ │
//! │  │  Page     │  │  API      │  │  (batch CSV results)    │ │
//! │  │  (Axum)   │  │  (Axum)   │  │                         │ │
//! │  └─────┬─────┘  └─────┬─────┘  └────────────┬────────────┘ │
//! │        └──────────────┼──────────────────────┘              │
//! │                       ▼                                     │
//! │                ┌─────────────┐                             │
//! │                │ Model Store │  (bundles loaded once)      │
//! │                └─────────────┘                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod downloads;
mod error;
mod handlers;
mod logic;
mod models;
mod store;
mod views;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = config::Config::from_env();
    tracing::info!("Sentiment server starting ({})", config.environment);

    // Load every configured bundle once; failures only exclude that model
    let model_store = store::ModelStore::new();
    let registry = model_store.load_all(&config.model_paths);
    tracing::info!(
        "{} of {} models loaded",
        registry.len(),
        config.model_paths.len()
    );

    let state = AppState {
        registry: Arc::new(registry),
        downloads: Arc::new(downloads::DownloadStore::new(config.download_retention)),
        templates: Arc::new(views::environment().context("loading page templates")?),
        config: config.clone(),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!("🚀 Server listening on http://{}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sentimen_web=debug,tower_http=debug".into());

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<store::ModelRegistry>,
    pub downloads: Arc<downloads::DownloadStore>,
    pub templates: Arc<minijinja::Environment<'static>>,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Page routes
    let page_routes = Router::new()
        .route("/", get(handlers::page::index))
        .route("/predict", post(handlers::predict::predict_form))
        .route("/batch", post(handlers::batch::upload))
        .route("/download/:id", get(handlers::batch::download));

    // JSON API
    let api_routes = Router::new()
        .route("/health", get(handlers::health::check))
        .route("/api/v1/models", get(handlers::models::list))
        .route("/api/v1/predict", post(handlers::predict::predict))
        .route("/api/v1/predict/batch", post(handlers::batch::predict_csv))
        .route("/api/v1/evaluation", get(handlers::evaluation::list));

    let cors = if state.config.is_production() {
        CorsLayer::new()
    } else {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .merge(page_routes)
        .merge(api_routes)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
