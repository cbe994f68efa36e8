use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::error::KampfberichtError;
use crate::options::ReportOptions;
use crate::parser;
use crate::report::{default_order, order_report, Direction, OrderSpec, SortKey};

struct AppState {
    defaults: ReportOptions,
}

/// Body of `POST /api/report`
#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub text: String,
    /// Falls back to the server's defaults when absent
    #[serde(default)]
    pub options: Option<ReportOptions>,
    #[serde(default)]
    pub order: Vec<OrderSpec>,
}

pub fn create_router(defaults: ReportOptions) -> Router {
    let state = Arc::new(AppState { defaults });

    Router::new()
        .route("/api/health", get(health))
        .route("/api/report", post(report))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn reject(error: KampfberichtError) -> (StatusCode, String) {
    let status = if error.is_invalid_input() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, error.to_string())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn report(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReportRequest>,
) -> Result<Response, (StatusCode, String)> {
    let options = request.options.unwrap_or_else(|| state.defaults.clone());
    options.validate().map_err(reject)?;

    let order: Vec<(SortKey, Direction)> = if request.order.is_empty() {
        default_order()
    } else {
        request.order.into_iter().map(Into::into).collect()
    };

    let text = request.text;
    let bytes = text.len();
    let (analysis, elapsed) = tokio::task::spawn_blocking(move || {
        let start = Instant::now();
        let mut analysis = parser::analyse(&text, &options);
        analysis.report = order_report(&analysis.report, &order);
        (analysis, start.elapsed().as_secs_f64())
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task failed: {}", e)))?;

    info!(bytes, battles = analysis.battles.len(), elapsed, "served report");

    let headers = [("X-Parse-Time", format!("{:.3}", elapsed))];
    Ok((headers, Json(analysis)).into_response())
}
