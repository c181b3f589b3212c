//! Alibaba DashScope adapter
//!
//! Bearer auth like the OpenAI dialect, but the request nests messages under
//! `input` and sampling under `parameters`, and streaming must be enabled
//! twice: the `X-DashScope-SSE: enable` header switches the response to SSE,
//! and `parameters.incremental_output` makes frames carry increments instead
//! of the full accumulated text. Text lives at `output.text` in both sync
//! responses and stream frames; streams end with `[DONE]`. The endpoint is
//! deployment-specific, so construction requires one explicitly.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use crate::error::GatewayError;
use crate::stream::ChatStream;
use crate::traits::ChatClient;
use crate::types::{ChatChunk, ChatRequest, Completion, Credential, ProviderDescriptor};
use crate::utils::streaming::{StreamFactory, send_checked};

pub const ALIBABA: ProviderDescriptor = ProviderDescriptor {
    key: "alibaba",
    default_endpoint: None,
    requires_endpoint: true,
    default_timeout_secs: 30,
};

#[derive(Debug)]
pub struct AlibabaClient {
    api_key: SecretString,
    endpoint: String,
    http: reqwest::Client,
}

impl AlibabaClient {
    pub fn new(credential: Credential, http: reqwest::Client) -> Result<Self, GatewayError> {
        let endpoint = super::resolve_endpoint(&ALIBABA, credential.endpoint)?;
        Ok(Self {
            api_key: credential.secret,
            endpoint,
            http,
        })
    }

    fn request_body(&self, request: &ChatRequest, stream: bool) -> Value {
        let options = &request.options;
        let mut messages = Vec::new();
        if let Some(system) = &options.system_message {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": request.message}));

        let mut parameters = json!({
            "temperature": options.temperature.unwrap_or(0.7),
            "max_tokens": options.max_tokens.unwrap_or(2048),
        });
        if let Some(stop) = options.stop_sequences() {
            parameters["stop"] = json!(stop);
        }
        if stream {
            parameters["incremental_output"] = json!(true);
        }

        json!({
            "model": request.model,
            "input": {"messages": messages},
            "parameters": parameters,
        })
    }

    fn builder(&self, body: &Value, stream: bool) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(body);
        if stream {
            builder = builder.header("X-DashScope-SSE", "enable");
        }
        builder
    }
}

fn extract_output_text(frame: &Value) -> Option<ChatChunk> {
    Some(ChatChunk::new(
        frame
            .get("output")?
            .get("text")
            .and_then(Value::as_str)
            .map(str::to_owned),
        None,
    ))
}

#[async_trait]
impl ChatClient for AlibabaClient {
    fn provider_name(&self) -> &'static str {
        ALIBABA.key
    }

    async fn chat(&self, request: &ChatRequest) -> Result<Completion, GatewayError> {
        let timeout = request.options.timeout_or(ALIBABA.default_timeout_secs);
        let body = self.request_body(request, false);
        let response = send_checked(
            self.builder(&body, false).timeout(timeout),
            timeout.as_secs(),
        )
        .await?;
        let frame: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::ParseError(format!("invalid JSON body: {e}")))?;
        frame
            .get("output")
            .and_then(|o| o.get("text"))
            .and_then(Value::as_str)
            .map(Completion::text)
            .ok_or_else(|| {
                GatewayError::ParseError("alibaba response missing output.text".into())
            })
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<ChatStream, GatewayError> {
        let timeout = request.options.timeout_or(ALIBABA.default_timeout_secs);
        let body = self.request_body(request, true);
        StreamFactory::sse_stream(self.builder(&body, true), timeout, extract_output_text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_requires_an_endpoint() {
        let error =
            AlibabaClient::new(Credential::new("key"), reqwest::Client::new()).unwrap_err();
        assert!(matches!(error, GatewayError::ConfigurationError(_)));
    }

    #[test]
    fn output_text_extraction() {
        let frame = json!({"output": {"text": "chunk"}});
        assert_eq!(
            extract_output_text(&frame).unwrap().text.as_deref(),
            Some("chunk")
        );
        assert!(extract_output_text(&json!({"output": {"finish_reason": "stop"}}))
            .unwrap()
            .is_empty());
        assert!(extract_output_text(&json!({"request_id": "x"})).is_none());
    }

    #[test]
    fn streaming_requests_incremental_output() {
        let credential = Credential::new("key").with_endpoint(
            "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation",
        );
        let client = AlibabaClient::new(credential, reqwest::Client::new()).unwrap();
        let request = ChatRequest::new("qwen-turbo", "hi");

        let sync_body = client.request_body(&request, false);
        assert!(sync_body["parameters"].get("incremental_output").is_none());

        let stream_body = client.request_body(&request, true);
        assert_eq!(stream_body["parameters"]["incremental_output"], true);
        assert_eq!(stream_body["input"]["messages"][0]["content"], "hi");
    }
}
