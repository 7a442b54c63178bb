// HTTP + WebSocket routes

mod http;
mod ws;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::hub::BroadcastHub;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) hub: Arc<BroadcastHub>,
    pub(crate) config: AppConfig,
}

pub fn app(hub: Arc<BroadcastHub>, config: AppConfig) -> Router {
    let state = AppState { hub, config };
    Router::new()
        .route("/", get(|| async { "ratewatch: live bandwidth over WebSockets" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/info", get(http::api_info_handler)) // GET /api/info
        .route("/ws/traffic", get(ws::ws_traffic)) // WS /ws/traffic
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
