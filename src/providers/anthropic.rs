//! Anthropic messages adapter
//!
//! Auth is a vendor-specific `x-api-key` header (not Bearer) plus an explicit
//! `anthropic-version` header. The system message is a top-level field rather
//! than a message-role entry, and `stop` maps to `stop_sequences`. Streaming
//! frames are typed; only `content_block_delta` carries text (`delta.text`)
//! or reasoning (`delta.thinking`). There is no `[DONE]` sentinel; the stream
//! ends when the transport closes.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use crate::error::GatewayError;
use crate::stream::ChatStream;
use crate::traits::ChatClient;
use crate::types::{ChatChunk, ChatRequest, Completion, Credential, ProviderDescriptor};
use crate::utils::streaming::{StreamFactory, send_checked};

pub const ANTHROPIC: ProviderDescriptor = ProviderDescriptor {
    key: "anthropic",
    default_endpoint: Some("https://api.anthropic.com"),
    requires_endpoint: false,
    default_timeout_secs: 60,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicClient {
    api_key: SecretString,
    base_url: String,
    http: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(credential: Credential, http: reqwest::Client) -> Result<Self, GatewayError> {
        let base_url = super::resolve_endpoint(&ANTHROPIC, credential.endpoint)?;
        Ok(Self {
            api_key: credential.secret,
            base_url,
            http,
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, request: &ChatRequest, stream: bool) -> Value {
        let options = &request.options;
        let mut body = json!({
            "model": request.model,
            "max_tokens": options.max_tokens.unwrap_or(2048),
            "messages": [{"role": "user", "content": request.message}],
            "temperature": options.temperature.unwrap_or(0.7),
            "top_p": options.top_p.unwrap_or(1.0),
        });
        if let Some(system) = &options.system_message {
            body["system"] = json!(system);
        }
        if let Some(stop) = options.stop_sequences() {
            body["stop_sequences"] = json!(stop);
        }
        if stream {
            body["stream"] = json!(true);
        }
        body
    }

    fn builder(&self, body: &Value) -> reqwest::RequestBuilder {
        self.http
            .post(self.messages_url())
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
    }
}

fn extract_delta(frame: &Value) -> Option<ChatChunk> {
    if frame.get("type")?.as_str()? != "content_block_delta" {
        return None;
    }
    let delta = frame.get("delta")?;
    Some(ChatChunk::new(
        delta.get("text").and_then(Value::as_str).map(str::to_owned),
        delta
            .get("thinking")
            .and_then(Value::as_str)
            .map(str::to_owned),
    ))
}

fn extract_message(frame: &Value) -> Option<Completion> {
    let text = frame
        .get("content")?
        .get(0)?
        .get("text")?
        .as_str()?
        .to_owned();
    Some(Completion {
        text,
        reasoning: None,
    })
}

#[async_trait]
impl ChatClient for AnthropicClient {
    fn provider_name(&self) -> &'static str {
        ANTHROPIC.key
    }

    async fn chat(&self, request: &ChatRequest) -> Result<Completion, GatewayError> {
        let timeout = request.options.timeout_or(ANTHROPIC.default_timeout_secs);
        let body = self.request_body(request, false);
        let response =
            send_checked(self.builder(&body).timeout(timeout), timeout.as_secs()).await?;
        let frame: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::ParseError(format!("invalid JSON body: {e}")))?;
        extract_message(&frame).ok_or_else(|| {
            GatewayError::ParseError("anthropic response missing content[0].text".into())
        })
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<ChatStream, GatewayError> {
        let timeout = request.options.timeout_or(ANTHROPIC.default_timeout_secs);
        let body = self.request_body(request, true);
        StreamFactory::sse_stream(self.builder(&body), timeout, extract_delta).await
    }
}
