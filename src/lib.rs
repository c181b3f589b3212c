//! # llm-gateway
//!
//! A capability-uniform gateway over heterogeneous chat-completion backends.
//!
//! Every supported vendor is wrapped by an adapter implementing [`traits::ChatClient`]:
//! one synchronous call, one streaming call, one identity. Adapters translate the
//! vendor's wire protocol (SSE with a `[DONE]` sentinel, newline-delimited JSON,
//! or plain request/response) into the normalized [`types::ChatChunk`] /
//! [`types::Completion`] model, so callers never see vendor-shaped payloads.
//!
//! On top of the adapters sit:
//! - [`registry::ProviderRegistry`] — resolves a provider key plus credential to a
//!   client, applying the endpoint fallback chain;
//! - [`relay::Relay`] — drives one streaming exchange, forwarding increments to an
//!   [`relay::EventSink`] while accumulating the final answer for exactly-once
//!   persistence in a [`relay::TranscriptStore`];
//! - [`gateway::Gateway`] — the facade gluing credentials, registry, relay, and
//!   storage together for both the synchronous and streaming paths.
//!
//! ```rust,no_run
//! use llm_gateway::prelude::*;
//!
//! # async fn example(registry: ProviderRegistry, credential: Credential) -> Result<(), GatewayError> {
//! let client = registry.resolve("openai", &credential, &reqwest::Client::new())?;
//! let answer = client
//!     .chat_or_explain(&ChatRequest::new("gpt-4o", "hello"))
//!     .await;
//! println!("{}", answer.text);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod gateway;
pub mod providers;
pub mod registry;
pub mod relay;
pub mod stream;
pub mod traits;
pub mod types;
pub mod utils;

/// Convenient re-exports of the types most callers need.
pub mod prelude {
    pub use crate::error::GatewayError;
    pub use crate::gateway::{CredentialSource, Gateway, ModelCatalog, TurnRequest, TurnResponse};
    pub use crate::registry::ProviderRegistry;
    pub use crate::relay::{
        EventSink, Relay, RelayEvent, RelayOutcome, RelayState, Role, SinkClosed, TranscriptStore,
        Turn,
    };
    pub use crate::stream::{ChatStream, ChatStreamHandle};
    pub use crate::traits::ChatClient;
    pub use crate::types::{
        CallOptions, ChatChunk, ChatRequest, Completion, Credential, ProviderDescriptor,
    };
}
