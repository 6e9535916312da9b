//! Race Store client speaking to a remote server over HTTP and SSE.

use futures::{StreamExt, future::BoxFuture, stream::BoxStream};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use super::binding::{ClientError, RaceStoreClient};
use crate::{
    dto::{
        race::{CreateRaceRequest, RaceSnapshot},
        sse::Advisory,
        teams::TeamsResponse,
        transact::TransactRequest,
    },
    services::sse_events::{EVENT_ADVISORY, EVENT_RACE_SNAPSHOT},
    state::transaction::Transaction,
};

const USER_AGENT: &str = concat!("typerace-client/", env!("CARGO_PKG_VERSION"));

/// Client for the HTTP surface of a typerace server.
#[derive(Clone)]
pub struct HttpRaceClient {
    client: Client,
    base_url: String,
}

impl HttpRaceClient {
    /// Client for the server at `base_url`, with or without a trailing slash.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Open a race. The server picks a paragraph when `text` is `None`.
    pub async fn create_race(&self, text: Option<String>) -> Result<RaceSnapshot, ClientError> {
        let response = self
            .client
            .post(self.url("/races"))
            .json(&CreateRaceRequest { text })
            .send()
            .await?;
        decode(response).await
    }

    /// Current snapshot of a race.
    pub async fn get_race(&self, race_id: Uuid) -> Result<RaceSnapshot, ClientError> {
        let response = self
            .client
            .get(self.url(&format!("/races/{race_id}")))
            .send()
            .await?;
        decode(response).await
    }

    /// Team labels offered by the server.
    pub async fn teams(&self) -> Result<Vec<String>, ClientError> {
        let response = self.client.get(self.url("/teams")).send().await?;
        let teams: TeamsResponse = decode(response).await?;
        Ok(teams.teams)
    }
}

impl RaceStoreClient for HttpRaceClient {
    fn subscribe(&self, race_id: Uuid) -> BoxStream<'static, RaceSnapshot> {
        let client = self.client.clone();
        let url = self.url(&format!("/races/{race_id}/events"));
        async_stream::stream! {
            let response = match client.get(&url).send().await {
                Ok(response) if response.status().is_success() => response,
                Ok(response) => {
                    warn!(race_id = %race_id, status = %response.status(), "race subscription refused");
                    return;
                }
                Err(err) => {
                    warn!(race_id = %race_id, error = %err, "race subscription failed");
                    return;
                }
            };

            let mut decoder = SseDecoder::default();
            let mut body = Box::pin(response.bytes_stream());
            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        warn!(race_id = %race_id, error = %err, "race subscription interrupted");
                        break;
                    }
                };
                for frame in decoder.push(&chunk) {
                    match frame.event.as_deref() {
                        Some(EVENT_RACE_SNAPSHOT) => match serde_json::from_str(&frame.data) {
                            Ok(snapshot) => yield snapshot,
                            Err(err) => warn!(error = %err, "malformed race snapshot"),
                        },
                        Some(EVENT_ADVISORY) => {
                            if let Ok(advisory) = serde_json::from_str::<Advisory>(&frame.data) {
                                warn!(message = %advisory.message, "server advisory");
                            }
                        }
                        other => debug!(event = ?other, "ignoring SSE event"),
                    }
                }
            }
        }
        .boxed()
    }

    fn transact(&self, tx: Transaction) -> BoxFuture<'static, Result<(), ClientError>> {
        let request = self.client.post(self.url("/transact")).json(&TransactRequest::from(tx));
        Box::pin(async move {
            let response = request.send().await?;
            if response.status().is_success() {
                return Ok(());
            }
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            if status == 400 || status == 404 || status == 409 {
                Err(ClientError::Rejected { message })
            } else {
                Err(ClientError::Status { status, message })
            }
        })
    }
}

async fn decode<T>(response: Response) -> Result<T, ClientError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ClientError::Status {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.json::<T>().await?)
}

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// `event:` field, when present.
    pub event: Option<String>,
    /// `data:` lines joined with newlines.
    pub data: String,
}

/// Incremental `text/event-stream` parser tolerant of arbitrary chunking.
///
/// Bytes are buffered until a full line arrives, so multi-byte characters
/// split between chunks decode intact.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Feed a chunk and collect every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.pending.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(end) = self.pending.iter().position(|byte| *byte == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if !self.data.is_empty() {
                    frames.push(SseFrame {
                        event: self.event.take(),
                        data: self.data.join("\n"),
                    });
                }
                self.event = None;
                self.data.clear();
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => self.event = Some(value.to_owned()),
                "data" => self.data.push(value.to_owned()),
                _ => {}
            }
        }

        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_split_across_chunks_are_reassembled() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"event: race.snap").is_empty());
        assert!(decoder.push(b"shot\ndata: {\"a\":").is_empty());
        let frames = decoder.push(b"1}\n\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: Some("race.snapshot".into()),
                data: "{\"a\":1}".into(),
            }]
        );
    }

    #[test]
    fn comments_and_crlf_are_handled() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.push(b":keep-alive\r\n\r\ndata: one\r\ndata: two\r\n\r\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: None,
                data: "one\ntwo".into(),
            }]
        );
    }

    #[test]
    fn characters_split_between_chunks_decode_intact() {
        let mut decoder = SseDecoder::default();
        let frame = "event: race.snapshot\ndata: {\"text\":\"café\"}\n\n".as_bytes();
        let split = frame
            .iter()
            .position(|byte| *byte == 0xC3)
            .expect("frame contains a two-byte character")
            + 1;

        assert!(decoder.push(&frame[..split]).is_empty());
        let frames = decoder.push(&frame[split..]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "{\"text\":\"café\"}");
        assert!(!frames[0].data.contains('\u{FFFD}'));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = HttpRaceClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.url("/teams"), "http://localhost:8080/teams");
    }
}
