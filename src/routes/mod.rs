//! HTTP routers.

use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod health;
pub mod races;
pub mod sse;
pub mod teams;
pub mod websocket;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(races::router())
        .merge(teams::router())
        .merge(sse::router())
        .merge(websocket::router());

    api_router.merge(docs::router()).with_state(state)
}
