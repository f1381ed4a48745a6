// Local HTTP + WebSocket API for the widget and the statistics window

mod http;
mod ws;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Router, routing::get};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};

use crate::models::LiveStatus;
use crate::usage_repo::UsageRepo;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) live_rx: watch::Receiver<LiveStatus>,
    pub(crate) usage_repo: Arc<UsageRepo>,
    pub(crate) ws_live_connections: Arc<AtomicUsize>,
}

pub fn app(
    live_rx: watch::Receiver<LiveStatus>,
    usage_repo: Arc<UsageRepo>,
    ws_live_connections: Arc<AtomicUsize>,
) -> Router {
    let state = AppState {
        live_rx,
        usage_repo,
        ws_live_connections,
    };
    Router::new()
        .route("/", get(|| async { "SpeedMonitor" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/live", get(http::live_handler)) // GET /api/live
        .route("/api/today", get(http::today_handler)) // GET /api/today
        .route("/api/days/{date}", get(http::day_handler)) // GET /api/days/2026-01-31
        .route("/api/month/{year}/{month}", get(http::month_handler)) // GET /api/month/2026/1
        .route("/api/trend", get(http::trend_handler)) // GET /api/trend?days=30
        .route("/api/export.csv", get(http::export_handler)) // GET /api/export.csv
        .route("/api/adapters", get(http::adapters_handler)) // GET /api/adapters
        .route("/api/convert", get(http::convert_handler)) // GET /api/convert?value=100&from=Mbps&to=MB/s
        .route("/ws/live", get(ws::ws_live)) // WS /ws/live
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(e) => {
                tracing::warn!(error = %e, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (
            status,
            axum::Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
