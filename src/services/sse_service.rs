//! Race SSE streams.

use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;
use uuid::Uuid;

use crate::{
    dto::sse::{Advisory, ServerEvent},
    services::{race_service, sse_events},
    state::{SharedState, hub::RaceSubscription},
};

/// Open an SSE stream for a race: handshake, optional advisory, the current
/// snapshot when the race exists, then every later snapshot.
pub async fn race_stream(
    state: SharedState,
    race_id: Uuid,
    advisory: Option<Advisory>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (receiver, current) = race_service::subscribe(&state, race_id).await;

    let mut preamble = Vec::with_capacity(3);
    preamble.extend(sse_events::handshake(race_id, state.is_degraded().await));
    preamble.extend(advisory.as_ref().and_then(sse_events::advisory));
    preamble.extend(current.as_ref().and_then(sse_events::race_snapshot));

    info!(race_id = %race_id, "race SSE stream connected");
    to_sse_stream(race_id, preamble, receiver, state.config().keep_alive())
}

/// Convert a broadcast receiver into an SSE response, forwarding snapshots and
/// cleaning up once the client disconnects.
pub fn to_sse_stream(
    race_id: Uuid,
    preamble: Vec<ServerEvent>,
    mut receiver: RaceSubscription,
    keep_alive: Duration,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        for payload in preamble {
            if tx.send(Ok(to_event(payload))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(snapshot) => {
                            let Some(payload) = sse_events::race_snapshot(&snapshot) else {
                                continue;
                            };
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        // Later snapshots supersede the skipped ones.
                        Err(RecvError::Lagged(_)) => continue,
                    }
                }
            }
        }

        info!(race_id = %race_id, "race SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(KeepAlive::new().interval(keep_alive).text("keep-alive"))
}

fn to_event(payload: ServerEvent) -> Event {
    Event::default().event(payload.name).data(payload.data)
}
