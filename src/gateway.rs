//! Gateway facade
//!
//! Glues the registry, credential source, relay, and transcript store into
//! the two entry points the routing layer calls: a synchronous turn and a
//! streamed turn. Configuration mistakes (unknown provider, missing mandatory
//! endpoint) surface as errors; ordinary upstream trouble degrades to
//! fallback answer text or relay error events, because the consumer of both
//! paths is ultimately user-facing chat.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::registry::{ProviderRegistry, infer_provider};
use crate::relay::{EventSink, Relay, RelayEvent, RelayOutcome, RelayState, TranscriptStore, Turn};
use crate::stream::ChatStreamHandle;
use crate::traits::ChatClient;
use crate::types::{CallOptions, ChatRequest, Credential};
use crate::utils::cancel::make_cancellable_stream;

/// Where credentials come from. "No active credential" is terminal and
/// non-retryable for a turn; the gateway answers with configuration guidance
/// instead of calling anyone.
pub trait CredentialSource: Send + Sync {
    fn active_credential(&self, provider: &str) -> Option<Credential>;
}

/// Maps model names to provider keys, mirroring a model catalog table.
/// Models missing from the catalog fall back to name inference.
pub trait ModelCatalog: Send + Sync {
    fn provider_for(&self, model: &str) -> Option<String>;
}

/// One inbound chat turn from the routing layer.
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    /// Generated (UUID v4) when absent.
    pub conversation_id: Option<String>,
    pub model: String,
    pub message: String,
    pub options: CallOptions,
}

impl TurnRequest {
    pub fn new(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            conversation_id: None,
            model: model.into(),
            message: message.into(),
            options: CallOptions::default(),
        }
    }
}

/// The answer to a synchronous turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnResponse {
    pub conversation_id: String,
    pub model: String,
    pub text: String,
    pub reasoning: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The multi-provider completion gateway.
pub struct Gateway {
    registry: ProviderRegistry,
    credentials: Arc<dyn CredentialSource>,
    store: Arc<dyn TranscriptStore>,
    catalog: Option<Arc<dyn ModelCatalog>>,
    http: reqwest::Client,
}

impl Gateway {
    pub fn new(
        registry: ProviderRegistry,
        credentials: Arc<dyn CredentialSource>,
        store: Arc<dyn TranscriptStore>,
    ) -> Self {
        Self {
            registry,
            credentials,
            store,
            catalog: None,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn ModelCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Replace the shared HTTP client, e.g. to configure proxies or pools.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    fn provider_for(&self, model: &str) -> String {
        self.catalog
            .as_ref()
            .and_then(|catalog| catalog.provider_for(model))
            .unwrap_or_else(|| infer_provider(model).to_owned())
    }

    fn conversation_id(request: &TurnRequest) -> String {
        request
            .conversation_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    fn chat_request(request: &TurnRequest) -> ChatRequest {
        ChatRequest {
            model: request.model.clone(),
            message: request.message.clone(),
            options: request.options.clone(),
        }
    }

    fn missing_credential_text(provider: &str) -> String {
        format!("Configure an API key for provider '{provider}' before chatting.")
    }

    /// Synchronous turn: resolve, call, persist both sides, answer.
    ///
    /// Only configuration and storage failures return `Err`; upstream
    /// failures come back as the answer text.
    pub async fn chat(&self, request: TurnRequest) -> Result<TurnResponse, GatewayError> {
        let conversation_id = Self::conversation_id(&request);
        let provider = self.provider_for(&request.model);

        self.store
            .record_turn(Turn::user(&conversation_id, &request.message))
            .await?;

        let completion = match self.credentials.active_credential(&provider) {
            None => {
                tracing::warn!(provider, "no active credential for sync turn");
                crate::types::Completion::text(Self::missing_credential_text(&provider))
            }
            Some(credential) => {
                let client = self.registry.resolve(&provider, &credential, &self.http)?;
                client.chat_or_explain(&Self::chat_request(&request)).await
            }
        };

        self.store
            .record_turn(Turn::assistant(&conversation_id, &completion))
            .await?;

        Ok(TurnResponse {
            conversation_id,
            model: request.model,
            text: completion.text,
            reasoning: completion.reasoning,
            created_at: Utc::now(),
        })
    }

    /// Streamed turn: drive the relay against the resolved client.
    ///
    /// Fatal configuration errors surface immediately; everything else ends
    /// the session through relay events.
    pub async fn chat_stream<S: EventSink>(
        &self,
        request: TurnRequest,
        sink: &mut S,
    ) -> Result<RelayOutcome, GatewayError> {
        let conversation_id = Self::conversation_id(&request);
        let provider = self.provider_for(&request.model);

        let Some(credential) = self.credentials.active_credential(&provider) else {
            tracing::warn!(provider, "no active credential for streamed turn");
            // Record the question, then report: mirrors the sync path so the
            // transcript still shows what was asked.
            self.store
                .record_turn(Turn::user(&conversation_id, &request.message))
                .await?;
            let _ = sink
                .send(RelayEvent::Start {
                    session_id: conversation_id.clone(),
                })
                .await;
            let _ = sink
                .send(RelayEvent::Error {
                    message: Self::missing_credential_text(&provider),
                })
                .await;
            return Ok(RelayOutcome {
                session_id: conversation_id,
                state: RelayState::Failed,
                completion: None,
            });
        };

        let client = self.registry.resolve(&provider, &credential, &self.http)?;
        let relay = Relay::new(self.store.as_ref());
        Ok(relay
            .run(
                client.as_ref(),
                &Self::chat_request(&request),
                &conversation_id,
                sink,
            )
            .await)
    }

    /// Open a raw normalized stream with a cancellation handle, bypassing the
    /// relay. For callers that fan out events themselves but still need the
    /// transport released on every exit path.
    pub async fn open_stream_with_cancel(
        &self,
        request: &TurnRequest,
    ) -> Result<ChatStreamHandle, GatewayError> {
        let provider = self.provider_for(&request.model);
        let credential = self
            .credentials
            .active_credential(&provider)
            .ok_or_else(|| {
                GatewayError::ConfigurationError(Self::missing_credential_text(&provider))
            })?;
        let client = self.registry.resolve(&provider, &credential, &self.http)?;
        let stream = client.chat_stream(&Self::chat_request(request)).await?;
        let (stream, cancel) = make_cancellable_stream(stream);
        Ok(ChatStreamHandle { stream, cancel })
    }

    /// Resolve a client directly, for callers composing their own pipelines.
    pub fn client_for(
        &self,
        provider: &str,
        credential: &Credential,
    ) -> Result<Arc<dyn ChatClient>, GatewayError> {
        self.registry.resolve(provider, credential, &self.http)
    }
}
