//! Streaming relay
//!
//! Drives one streaming exchange: pulls normalized chunks from the selected
//! provider, forwards each increment to the outbound [`EventSink`], and
//! accumulates the final answer in a [`RelaySession`] for exactly-once
//! persistence in a [`TranscriptStore`].
//!
//! The session walks `Starting → Streaming → {Completed | Failed}`. A
//! completed session commits one assistant turn and then emits the terminal
//! `End` event carrying the full accumulation (for consumers that missed
//! increments). A failed session emits one `Error` event and commits nothing:
//! the persisted history holds complete assistant turns or none at all, never
//! a truncated answer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde::Serialize;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::traits::ChatClient;
use crate::types::{ChatRequest, Completion};

/// Ordered events delivered to the outbound connection: exactly one `Start`,
/// zero or more increments, then exactly one of `End`/`Error` per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayEvent {
    Start {
        session_id: String,
    },
    /// One answer-text increment; never the full accumulated text.
    Content {
        delta: String,
    },
    /// One reasoning increment, for vendors with a thinking channel.
    Reasoning {
        delta: String,
    },
    End {
        text: String,
        reasoning: Option<String>,
    },
    Error {
        message: String,
    },
}

/// Returned by a sink whose consumer has gone away; the relay then stops
/// pulling from the upstream transport and releases it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

/// The outbound connection a relay forwards events to.
#[async_trait]
pub trait EventSink: Send {
    async fn send(&mut self, event: RelayEvent) -> Result<(), SinkClosed>;
}

/// Message author recorded in the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One durable transcript row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub conversation_id: String,
    pub role: Role,
    pub text: String,
    pub reasoning: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn user(conversation_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            role: Role::User,
            text: text.into(),
            reasoning: None,
            created_at: Utc::now(),
        }
    }

    pub fn assistant(conversation_id: impl Into<String>, completion: &Completion) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            role: Role::Assistant,
            text: completion.text.clone(),
            reasoning: completion.reasoning.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Durable conversation storage. Each session writes independently, one row
/// per turn; no cross-session transaction spans are needed. Implementations
/// report rejected writes as [`GatewayError::StorageError`].
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn record_turn(&self, turn: Turn) -> Result<(), GatewayError>;
}

/// Terminal states of one streaming exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Starting,
    Streaming,
    Completed,
    Failed,
}

/// Transient per-exchange state: accumulators plus the state marker. Created
/// when the stream call begins, consumed exactly once at termination.
#[derive(Debug)]
struct RelaySession {
    session_id: String,
    text: String,
    reasoning: String,
    state: RelayState,
}

impl RelaySession {
    fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_owned(),
            text: String::new(),
            reasoning: String::new(),
            state: RelayState::Starting,
        }
    }

    fn completion(&self) -> Completion {
        Completion {
            text: self.text.clone(),
            reasoning: (!self.reasoning.is_empty()).then(|| self.reasoning.clone()),
        }
    }
}

/// What a finished relay reports back to its caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayOutcome {
    pub session_id: String,
    pub state: RelayState,
    /// The accumulated completion; `None` when the session failed before any
    /// terminal accumulation existed.
    pub completion: Option<Completion>,
}

/// Drives streaming exchanges against a transcript store.
pub struct Relay<'a> {
    store: &'a dyn TranscriptStore,
}

impl<'a> Relay<'a> {
    pub fn new(store: &'a dyn TranscriptStore) -> Self {
        Self { store }
    }

    /// Generate a fresh session/conversation id.
    pub fn new_session_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Run one streaming exchange to its terminal state.
    ///
    /// Upstream trouble never escapes as an error: it becomes an `Error`
    /// event and a `Failed` outcome. The relay stops pulling as soon as the
    /// sink reports its consumer gone, releasing the upstream transport.
    pub async fn run<S: EventSink>(
        &self,
        client: &dyn ChatClient,
        request: &ChatRequest,
        session_id: &str,
        sink: &mut S,
    ) -> RelayOutcome {
        let mut session = RelaySession::new(session_id);

        // Record the inbound request before anything is streamed.
        if let Err(error) = self
            .store
            .record_turn(Turn::user(session_id, &request.message))
            .await
        {
            tracing::warn!(%error, session_id, "failed to record inbound message");
            let _ = sink
                .send(RelayEvent::Error {
                    message: format!("failed to record request: {error}"),
                })
                .await;
            return Self::fail(session);
        }

        if sink
            .send(RelayEvent::Start {
                session_id: session.session_id.clone(),
            })
            .await
            .is_err()
        {
            return Self::fail(session);
        }

        let mut stream = match client.chat_stream(request).await {
            Ok(stream) => stream,
            Err(error) => {
                tracing::warn!(
                    provider = client.provider_name(),
                    %error,
                    "streaming call could not be established"
                );
                let _ = sink
                    .send(RelayEvent::Error {
                        message: format!(
                            "{} streaming call failed: {error}",
                            client.provider_name()
                        ),
                    })
                    .await;
                return Self::fail(session);
            }
        };

        session.state = RelayState::Streaming;
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => {
                    if let Some(delta) = chunk.text {
                        session.text.push_str(&delta);
                        if sink.send(RelayEvent::Content { delta }).await.is_err() {
                            // Consumer gone: release the upstream promptly,
                            // commit nothing.
                            return Self::fail(session);
                        }
                    }
                    if let Some(delta) = chunk.reasoning {
                        session.reasoning.push_str(&delta);
                        if sink.send(RelayEvent::Reasoning { delta }).await.is_err() {
                            return Self::fail(session);
                        }
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, session_id, "stream failed mid-exchange");
                    let _ = sink
                        .send(RelayEvent::Error {
                            message: format!("stream failed: {error}"),
                        })
                        .await;
                    return Self::fail(session);
                }
            }
        }
        drop(stream);

        // Clean upstream termination: commit the full turn, then tell the
        // consumer. The write happens first so a consumer seeing `End` can
        // rely on the turn being durable.
        let completion = session.completion();
        if let Err(error) = self
            .store
            .record_turn(Turn::assistant(session_id, &completion))
            .await
        {
            tracing::warn!(%error, session_id, "failed to commit completed turn");
            let _ = sink
                .send(RelayEvent::Error {
                    message: format!("failed to record response: {error}"),
                })
                .await;
            return Self::fail(session);
        }

        session.state = RelayState::Completed;
        let _ = sink
            .send(RelayEvent::End {
                text: completion.text.clone(),
                reasoning: completion.reasoning.clone(),
            })
            .await;

        RelayOutcome {
            session_id: session.session_id,
            state: RelayState::Completed,
            completion: Some(completion),
        }
    }

    fn fail(mut session: RelaySession) -> RelayOutcome {
        session.state = RelayState::Failed;
        RelayOutcome {
            session_id: session.session_id,
            state: RelayState::Failed,
            completion: None,
        }
    }
}
