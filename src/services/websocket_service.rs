//! Race WebSocket session handling.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{
    sync::{broadcast::error::RecvError, mpsc},
    task::JoinHandle,
};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        sse::Advisory,
        transact::{TransactRequest, TxOpInput},
        ws::{RaceInboundMessage, RaceOutboundMessage},
    },
    services::race_service,
    state::SharedState,
};

/// Outbound writer is gone; the session must end.
struct ConnectionClosed;

/// Handle the full lifecycle of a race WebSocket session.
pub async fn handle_socket(
    state: SharedState,
    race_id: Uuid,
    advisory: Option<Advisory>,
    socket: WebSocket,
) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let (mut updates, current) = race_service::subscribe(&state, race_id).await;
    info!(race_id = %race_id, "race websocket connected");

    let preamble = advisory
        .map(RaceOutboundMessage::Advisory)
        .into_iter()
        .chain(current.map(RaceOutboundMessage::Snapshot));
    for message in preamble {
        if send_message(&outbound_tx, &message).is_err() {
            finalize(writer_task, outbound_tx).await;
            return;
        }
    }

    loop {
        tokio::select! {
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    let reply = handle_text(&state, race_id, text.as_str()).await;
                    if send_message(&outbound_tx, &reply).is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    let _ = outbound_tx.send(Message::Pong(payload));
                }
                Some(Ok(Message::Close(frame))) => {
                    let _ = outbound_tx.send(Message::Close(frame));
                    break;
                }
                Some(Ok(Message::Binary(_) | Message::Pong(_))) => {}
                Some(Err(err)) => {
                    warn!(race_id = %race_id, error = %err, "websocket error");
                    break;
                }
                None => break,
            },
            update = updates.recv() => match update {
                Ok(snapshot) => {
                    if send_message(&outbound_tx, &RaceOutboundMessage::Snapshot(snapshot)).is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(race_id = %race_id, skipped, "websocket subscriber lagging");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    info!(race_id = %race_id, "race websocket disconnected");
    finalize(writer_task, outbound_tx).await;
}

/// Apply an inbound frame and build the reply for this socket.
async fn handle_text(state: &SharedState, race_id: Uuid, text: &str) -> RaceOutboundMessage {
    match RaceInboundMessage::from_json_str(text) {
        Ok(RaceInboundMessage::Transact { ops }) => apply_ops(state, ops).await,
        Ok(RaceInboundMessage::Unknown) => RaceOutboundMessage::Error {
            message: "unsupported message type".into(),
        },
        Err(err) => {
            warn!(race_id = %race_id, error = %err, "failed to parse race message");
            RaceOutboundMessage::Error {
                message: format!("malformed message: {err}"),
            }
        }
    }
}

async fn apply_ops(state: &SharedState, ops: Vec<TxOpInput>) -> RaceOutboundMessage {
    let request = TransactRequest { ops };
    if let Err(err) = request.validate() {
        return RaceOutboundMessage::Error {
            message: format!("validation failed: {err}"),
        };
    }

    match race_service::transact(state, request.into()).await {
        Ok(response) => RaceOutboundMessage::Ack(response),
        Err(err) => RaceOutboundMessage::Error {
            message: err.to_string(),
        },
    }
}

/// Serialize a payload and push it onto the writer channel.
///
/// Serialization failures are logged and swallowed; only a closed writer is
/// reported to the caller.
fn send_message(
    tx: &mpsc::UnboundedSender<Message>,
    value: &RaceOutboundMessage,
) -> Result<(), ConnectionClosed> {
    let payload = match serde_json::to_string(value) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "failed to serialize websocket message");
            return Ok(());
        }
    };

    tx.send(Message::Text(payload.into()))
        .map_err(|_| ConnectionClosed)
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
