//! Race SSE route.

use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    http::HeaderMap,
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use uuid::Uuid;

use crate::{
    services::{advisory, sse_service},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/races/{id}/events",
    tag = "sse",
    params(("id" = Uuid, Path, description = "Race to follow")),
    responses((status = 200, description = "Race snapshot stream", content_type = "text/event-stream", body = String))
)]
/// Stream every snapshot of a race as it changes.
pub async fn race_events(
    State(state): State<SharedState>,
    Path(race_id): Path<Uuid>,
    headers: HeaderMap,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let advisory = advisory::mobile_advisory(&headers);
    sse_service::race_stream(state, race_id, advisory).await
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/races/{id}/events", get(race_events))
}
