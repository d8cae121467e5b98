pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod ui;

use crate::{models::ModelManager, recognition::DigitRecognizer, utils::error::DigitError, Config, Result};
use axum::{
    extract::{DefaultBodyLimit, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

/// 处理器共享状态，克隆只复制 `Arc`
#[derive(Clone)]
pub struct AppState {
    pub recognizer: DigitRecognizer,
    pub models: Arc<ModelManager>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, models: Arc<ModelManager>) -> Self {
        let recognizer = DigitRecognizer::new(models.classifier(), config.preprocess);
        Self {
            recognizer,
            models,
            config: Arc::new(config),
        }
    }
}

pub async fn serve(config: Config, models: Arc<ModelManager>) -> Result<()> {
    let addr = config.socket_addr()?;
    let app = create_app(AppState::new(config, models));

    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  POST /predict   - JSON base64 canvas image");
    tracing::info!("  GET  /          - Drawing canvas");
    tracing::info!("  GET  /health    - Health check");
    tracing::info!("  GET  /api/info  - Service information");

    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        DigitError::Internal(format!("Failed to bind to address {}: {}", addr, e))
    })?;

    axum::serve(listener, app)
        .await
        .map_err(|e| DigitError::Internal(format!("Server failed to start: {}", e)))?;

    Ok(())
}

pub fn create_app(state: AppState) -> Router {
    let server_config = state.config.server_config.clone();
    let body_limit = server_config.max_request_size;
    let timeout = Duration::from_secs(server_config.request_timeout);

    Router::new()
        .route("/predict", post(handlers::predict_handler))
        .route("/", get(ui::index_handler))
        .route("/health", get(health_handler))
        .route("/api/info", get(info_handler))
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(axum::middleware::from_fn(middleware::request_logging))
        // Json提取器自带2MB上限，需要单独放开
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TimeoutLayer::new(timeout))
        .layer(axum::middleware::from_fn_with_state(
            server_config,
            middleware::json_error_bodies,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// 健康检查端点
async fn health_handler(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let models = Arc::clone(&state.models);
    let prediction = tokio::task::spawn_blocking(move || models.health_check())
        .await
        .map_err(|e| DigitError::Internal(format!("health check task failed: {}", e)))??;

    Ok(Json(json!({
        "status": "healthy",
        "blank_prediction": prediction.digit,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    })))
}

/// 服务信息端点
async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let options = state.recognizer.options();
    Json(json!({
        "service": "Handwritten digit recognition",
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "model": state.models.stats(),
        "preprocessing": {
            "target_height": options.target_height,
            "target_width": options.target_width,
            "invert": options.invert,
            "filter": format!("{:?}", options.filter),
        },
        "dev_mode": state.config.dev_mode,
    }))
}
