//! Axum WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;

use super::connection::run_connection;
use crate::app_state::AppState;

/// `GET /ws`: Upgrade HTTP connection to WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let notification_rx = state.notification_bus.subscribe();
    let donut_service = Arc::clone(&state.donut_service);

    ws.on_upgrade(move |socket| run_connection(socket, notification_rx, donut_service))
}
