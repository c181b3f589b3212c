//! Core data model: chunks, completions, credentials, descriptors, requests.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One normalized increment of streamed model output.
///
/// Invariant: a chunk surfaced by any adapter carries at least one non-empty
/// field. The constructors filter empty strings and the framing layer drops
/// chunks for which [`ChatChunk::is_empty`] holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatChunk {
    /// Incremental answer text.
    pub text: Option<String>,
    /// Incremental reasoning text, for vendors exposing a thinking channel.
    pub reasoning: Option<String>,
}

impl ChatChunk {
    /// Build a chunk from optional deltas, discarding empty strings.
    pub fn new(text: Option<String>, reasoning: Option<String>) -> Self {
        Self {
            text: text.filter(|t| !t.is_empty()),
            reasoning: reasoning.filter(|r| !r.is_empty()),
        }
    }

    /// A text-only chunk.
    pub fn text(delta: impl Into<String>) -> Self {
        Self::new(Some(delta.into()), None)
    }

    /// A reasoning-only chunk.
    pub fn reasoning(delta: impl Into<String>) -> Self {
        Self::new(None, Some(delta.into()))
    }

    /// True when neither field carries content. Empty chunks are never emitted.
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.reasoning.is_none()
    }
}

/// The single result of a synchronous call, or the terminal accumulation of a
/// streaming call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub reasoning: Option<String>,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reasoning: None,
        }
    }
}

/// Static identity of one provider adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderDescriptor {
    /// Registry key, also returned by `provider_name()`.
    pub key: &'static str,
    /// Hardcoded endpoint used when neither the credential nor the registry
    /// supplies one.
    pub default_endpoint: Option<&'static str>,
    /// Adapters without a safe vendor-wide default refuse to construct
    /// without an explicit endpoint.
    pub requires_endpoint: bool,
    /// Per-vendor transport-open deadline, applied when the caller sets none.
    pub default_timeout_secs: u64,
}

/// An API credential for one provider. Owned by the caller and immutable for
/// the lifetime of one call; the gateway never persists it.
#[derive(Debug, Clone)]
pub struct Credential {
    /// The vendor secret (API key or access token).
    pub secret: SecretString,
    /// Optional per-credential endpoint override.
    pub endpoint: Option<String>,
}

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretString::from(secret.into()),
            endpoint: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

/// Sampling and control options recognized by every adapter.
///
/// Each adapter maps the fields its vendor understands and silently ignores
/// the rest; options never cause an error. Vendors accepting only a single
/// stop string receive the first element of `stop`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallOptions {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f64>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub stop: Option<Vec<String>>,
    /// Prepended as a system-role entry where the vendor supports one;
    /// vendors without system-role support drop it.
    pub system_message: Option<String>,
    /// Transport-open deadline; falls back to the adapter's per-vendor default.
    pub timeout: Option<Duration>,
}

impl CallOptions {
    pub(crate) fn timeout_or(&self, default_secs: u64) -> Duration {
        self.timeout.unwrap_or(Duration::from_secs(default_secs))
    }

    /// Stop sequences, when present and non-empty.
    pub(crate) fn stop_sequences(&self) -> Option<&[String]> {
        self.stop.as_deref().filter(|s| !s.is_empty())
    }
}

/// One chat exchange as seen by a provider adapter.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub model: String,
    pub message: String,
    pub options: CallOptions,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            message: message.into(),
            options: CallOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_constructors_filter_empty_deltas() {
        assert!(ChatChunk::text("").is_empty());
        assert!(ChatChunk::new(Some(String::new()), Some(String::new())).is_empty());
        assert!(!ChatChunk::text("x").is_empty());
        assert_eq!(ChatChunk::reasoning("y").reasoning.as_deref(), Some("y"));
    }

    #[test]
    fn stop_sequences_hides_empty_lists() {
        let mut options = CallOptions::default();
        assert!(options.stop_sequences().is_none());
        options.stop = Some(vec![]);
        assert!(options.stop_sequences().is_none());
        options.stop = Some(vec!["END".into()]);
        assert_eq!(options.stop_sequences().unwrap(), ["END".to_string()]);
    }

    #[test]
    fn timeout_falls_back_to_vendor_default() {
        let mut options = CallOptions::default();
        assert_eq!(options.timeout_or(60), Duration::from_secs(60));
        options.timeout = Some(Duration::from_secs(5));
        assert_eq!(options.timeout_or(60), Duration::from_secs(5));
    }
}
