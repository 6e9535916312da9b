//! Race WebSocket route.

use axum::{
    Router,
    extract::{Path, State, WebSocketUpgrade},
    http::HeaderMap,
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;

use crate::{
    services::{advisory, websocket_service},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/races/{id}/ws",
    tag = "races",
    params(("id" = Uuid, Path, description = "Race to follow")),
    responses((status = 101, description = "Switching protocols to WebSocket"))
)]
/// Upgrade the HTTP connection into a race WebSocket session.
pub async fn ws_handler(
    State(state): State<SharedState>,
    Path(race_id): Path<Uuid>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let advisory = advisory::mobile_advisory(&headers);
    ws.on_upgrade(move |socket| websocket_service::handle_socket(state, race_id, advisory, socket))
}

/// Configure the WebSocket endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/races/{id}/ws", get(ws_handler))
}
