//! Shared in-memory fakes for integration tests: a scripted provider client,
//! a recording event sink, a transcript store, and credential/catalog maps.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use llm_gateway::prelude::*;

/// Transcript store backed by a Vec, recording turns in arrival order.
#[derive(Default)]
pub struct MemoryStore {
    pub turns: Mutex<Vec<Turn>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn assistant_turns(&self) -> Vec<Turn> {
        self.turns
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.role == Role::Assistant)
            .cloned()
            .collect()
    }

    pub fn user_turns(&self) -> Vec<Turn> {
        self.turns
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.role == Role::User)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TranscriptStore for MemoryStore {
    async fn record_turn(&self, turn: Turn) -> Result<(), GatewayError> {
        self.turns.lock().unwrap().push(turn);
        Ok(())
    }
}

/// Store that rejects writes for one role, for exercising commit failures.
pub struct BrokenStore {
    pub fail_on: Role,
}

#[async_trait]
impl TranscriptStore for BrokenStore {
    async fn record_turn(&self, turn: Turn) -> Result<(), GatewayError> {
        if turn.role == self.fail_on {
            return Err(GatewayError::StorageError("write rejected".into()));
        }
        Ok(())
    }
}

/// Event sink that records everything, optionally reporting itself closed
/// after accepting a fixed number of events.
pub struct VecSink {
    pub events: Vec<RelayEvent>,
    close_after: Option<usize>,
}

impl VecSink {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            close_after: None,
        }
    }

    /// Accept `n` events, then behave like a consumer that went away.
    pub fn closing_after(n: usize) -> Self {
        Self {
            events: Vec::new(),
            close_after: Some(n),
        }
    }

    pub fn content_concat(&self) -> String {
        self.events
            .iter()
            .filter_map(|e| match e {
                RelayEvent::Content { delta } => Some(delta.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn error_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, RelayEvent::Error { .. }))
            .count()
    }
}

#[async_trait]
impl EventSink for VecSink {
    async fn send(&mut self, event: RelayEvent) -> Result<(), SinkClosed> {
        if let Some(limit) = self.close_after
            && self.events.len() >= limit
        {
            return Err(SinkClosed);
        }
        self.events.push(event);
        Ok(())
    }
}

/// Chat client that replays a scripted chunk sequence, or refuses to open.
pub struct ScriptedClient {
    name: &'static str,
    script: Mutex<Option<Vec<Result<ChatChunk, GatewayError>>>>,
}

impl ScriptedClient {
    pub fn streaming(name: &'static str, script: Vec<Result<ChatChunk, GatewayError>>) -> Self {
        Self {
            name,
            script: Mutex::new(Some(script)),
        }
    }

    /// A client whose stream can never be established.
    pub fn unavailable(name: &'static str) -> Self {
        Self {
            name,
            script: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ChatClient for ScriptedClient {
    fn provider_name(&self) -> &'static str {
        self.name
    }

    async fn chat(&self, _request: &ChatRequest) -> Result<Completion, GatewayError> {
        Ok(Completion::text("scripted sync answer"))
    }

    async fn chat_stream(&self, _request: &ChatRequest) -> Result<ChatStream, GatewayError> {
        match self.script.lock().unwrap().take() {
            Some(items) => Ok(Box::pin(futures::stream::iter(items))),
            None => Err(GatewayError::ConnectionError(
                "upstream unavailable".into(),
            )),
        }
    }
}

/// Credential source backed by a map.
pub struct MapCredentials(pub HashMap<String, Credential>);

impl MapCredentials {
    pub fn single(provider: &str, credential: Credential) -> Arc<Self> {
        Arc::new(Self(HashMap::from([(provider.to_owned(), credential)])))
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self(HashMap::new()))
    }
}

impl CredentialSource for MapCredentials {
    fn active_credential(&self, provider: &str) -> Option<Credential> {
        self.0.get(provider).cloned()
    }
}

/// Model catalog backed by a map.
pub struct MapCatalog(pub HashMap<String, String>);

impl MapCatalog {
    pub fn single(model: &str, provider: &str) -> Arc<Self> {
        Arc::new(Self(HashMap::from([(
            model.to_owned(),
            provider.to_owned(),
        )])))
    }
}

impl ModelCatalog for MapCatalog {
    fn provider_for(&self, model: &str) -> Option<String> {
        self.0.get(model).cloned()
    }
}
