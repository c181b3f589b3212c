//! OpenAI-compatible chat completions adapter
//!
//! Covers every vendor speaking the OpenAI wire dialect: Bearer auth,
//! `POST {base}/chat/completions`, sync text at `choices[0].message.content`,
//! SSE deltas at `choices[0].delta.content` with a `[DONE]` sentinel.
//! Reasoning-capable backends (DeepSeek, SiliconFlow) put their thinking
//! channel in `reasoning_content` alongside `content`; both are surfaced.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use crate::error::GatewayError;
use crate::stream::ChatStream;
use crate::traits::ChatClient;
use crate::types::{ChatChunk, ChatRequest, Completion, Credential, ProviderDescriptor};
use crate::utils::streaming::{StreamFactory, send_checked};

pub const OPENAI: ProviderDescriptor = ProviderDescriptor {
    key: "openai",
    default_endpoint: Some("https://api.openai.com/v1"),
    requires_endpoint: false,
    // OpenAI tends to need more headroom than the other dialect speakers.
    default_timeout_secs: 60,
};

pub const DEEPSEEK: ProviderDescriptor = ProviderDescriptor {
    key: "deepseek",
    default_endpoint: Some("https://api.deepseek.com"),
    requires_endpoint: false,
    default_timeout_secs: 30,
};

pub const ZHIPU: ProviderDescriptor = ProviderDescriptor {
    key: "zhipu",
    default_endpoint: Some("https://open.bigmodel.cn/api/paas/v4"),
    requires_endpoint: false,
    default_timeout_secs: 30,
};

pub const MOONSHOT: ProviderDescriptor = ProviderDescriptor {
    key: "moonshot",
    default_endpoint: Some("https://api.moonshot.cn/v1"),
    requires_endpoint: false,
    default_timeout_secs: 30,
};

pub const SILICONFLOW: ProviderDescriptor = ProviderDescriptor {
    key: "siliconflow",
    default_endpoint: Some("https://api.siliconflow.cn/v1"),
    requires_endpoint: false,
    default_timeout_secs: 30,
};

/// Client for any OpenAI-dialect backend, parameterized by its descriptor.
pub struct OpenAiCompatibleClient {
    descriptor: ProviderDescriptor,
    api_key: SecretString,
    base_url: String,
    http: reqwest::Client,
}

impl OpenAiCompatibleClient {
    pub fn new(
        descriptor: ProviderDescriptor,
        credential: Credential,
        http: reqwest::Client,
    ) -> Result<Self, GatewayError> {
        let base_url = super::resolve_endpoint(&descriptor, credential.endpoint)?;
        Ok(Self {
            descriptor,
            api_key: credential.secret,
            base_url,
            http,
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, request: &ChatRequest, stream: bool) -> Value {
        let options = &request.options;
        let mut messages = Vec::new();
        if let Some(system) = &options.system_message {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": request.message}));

        let mut body = json!({
            "model": request.model,
            "messages": messages,
            "max_tokens": options.max_tokens.unwrap_or(2048),
            "temperature": options.temperature.unwrap_or(0.7),
            "top_p": options.top_p.unwrap_or(1.0),
            "frequency_penalty": options.frequency_penalty.unwrap_or(0.0),
            "presence_penalty": options.presence_penalty.unwrap_or(0.0),
        });
        if let Some(stop) = options.stop_sequences() {
            body["stop"] = json!(stop);
        }
        if stream {
            body["stream"] = json!(true);
        }
        body
    }

    fn builder(&self, body: &Value) -> reqwest::RequestBuilder {
        self.http
            .post(self.chat_url())
            .bearer_auth(self.api_key.expose_secret())
            .json(body)
    }
}

fn extract_delta(frame: &Value) -> Option<ChatChunk> {
    let delta = frame.get("choices")?.get(0)?.get("delta")?;
    Some(ChatChunk::new(
        delta
            .get("content")
            .and_then(Value::as_str)
            .map(str::to_owned),
        delta
            .get("reasoning_content")
            .and_then(Value::as_str)
            .map(str::to_owned),
    ))
}

fn extract_message(frame: &Value) -> Option<Completion> {
    let message = frame.get("choices")?.get(0)?.get("message")?;
    Some(Completion {
        text: message.get("content")?.as_str()?.to_owned(),
        reasoning: message
            .get("reasoning_content")
            .and_then(Value::as_str)
            .map(str::to_owned),
    })
}

#[async_trait]
impl ChatClient for OpenAiCompatibleClient {
    fn provider_name(&self) -> &'static str {
        self.descriptor.key
    }

    async fn chat(&self, request: &ChatRequest) -> Result<Completion, GatewayError> {
        let timeout = request
            .options
            .timeout_or(self.descriptor.default_timeout_secs);
        let body = self.request_body(request, false);
        let response =
            send_checked(self.builder(&body).timeout(timeout), timeout.as_secs()).await?;
        let frame: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::ParseError(format!("invalid JSON body: {e}")))?;
        extract_message(&frame).ok_or_else(|| {
            GatewayError::ParseError(format!(
                "{} response missing choices[0].message.content",
                self.descriptor.key
            ))
        })
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<ChatStream, GatewayError> {
        let timeout = request
            .options
            .timeout_or(self.descriptor.default_timeout_secs);
        let body = self.request_body(request, true);
        StreamFactory::sse_stream(self.builder(&body), timeout, extract_delta).await
    }
}
