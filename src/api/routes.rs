use axum::{
    Router,
    extract::{Json, State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::api::auth::require_api_key;
use crate::api::models::{HealthResponse, ScrapeRequestBody, ScrapeResponse};
use crate::api::response;
use crate::error::{AppError, Result};

pub fn create_router(app_state: AppState) -> Router {
    let protected = Router::new()
        .route("/scrape", post(scrape_handler))
        .route_layer(middleware::from_fn_with_state(app_state.clone(), require_api_key));

    Router::new()
        .route("/health", get(health_handler))
        .merge(protected)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    response::success(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
        gemini_configured: state.orchestrator.summarization_available(),
    })
}

async fn scrape_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ScrapeRequestBody>, JsonRejection>,
) -> Result<Json<ScrapeResponse>> {
    let Json(body) = payload.map_err(|e| AppError::InvalidRequest(e.body_text()))?;
    let request = body.into_request()?;

    info!(
        links = request.links.len(),
        raw = request.raw,
        summarize = request.summarize,
        "Processing scrape request"
    );

    let batch = state.orchestrator.run_batch(request).await?;
    Ok(Json(ScrapeResponse::from(batch)))
}

async fn not_found() -> impl IntoResponse {
    response::error(StatusCode::NOT_FOUND, "Endpoint not found".to_string())
}
