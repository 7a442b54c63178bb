// GET handlers: version, api/info

use axum::{extract::State, response::IntoResponse};

use super::AppState;
use crate::version::{NAME, VERSION};

/// GET /version — returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/info — static target identity (no credentials; fetch once, not per tick).
pub(super) async fn api_info_handler(State(state): State<AppState>) -> impl IntoResponse {
    let device = &state.config.device;
    axum::Json(serde_json::json!({
        "transport": match device.transport {
            crate::config::TransportKind::Snmp => "snmp",
            crate::config::TransportKind::Ssh => "ssh",
        },
        "interface": device.interface_label(),
        "pollIntervalMs": state.config.polling.poll_interval_ms,
    }))
}
