//! The capability interface every provider adapter implements.

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::stream::ChatStream;
use crate::types::{ChatRequest, Completion};

/// A vendor-specific chat completion client.
///
/// Adapters own no mutable state beyond their descriptor and credential, so a
/// single instance may be reused across calls made one at a time; they are not
/// required to be internally concurrency-safe.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Static provider identity, used for diagnostics and registry lookups.
    fn provider_name(&self) -> &'static str;

    /// Synchronous call returning the full completion, with the raw error
    /// taxonomy for callers that want to branch on failure class.
    async fn chat(&self, request: &ChatRequest) -> Result<Completion, GatewayError>;

    /// Streaming call. `Err` means the transport could not even be opened
    /// (auth/connection failure) and is distinct from an established stream
    /// that happens to produce zero chunks. Once the stream is open, malformed
    /// frames are skipped rather than aborting it.
    async fn chat_stream(&self, request: &ChatRequest) -> Result<ChatStream, GatewayError>;

    /// Synchronous call that never fails: ordinary upstream trouble (HTTP
    /// error, malformed body, timeout) degrades to a human-readable
    /// explanation, because the caller is ultimately user-facing chat text.
    async fn chat_or_explain(&self, request: &ChatRequest) -> Completion {
        match self.chat(request).await {
            Ok(completion) => completion,
            Err(error) => {
                tracing::warn!(
                    provider = self.provider_name(),
                    error = %error,
                    "sync chat call failed, degrading to fallback text"
                );
                Completion::text(format!(
                    "{} API call failed: {error}",
                    self.provider_name()
                ))
            }
        }
    }
}
