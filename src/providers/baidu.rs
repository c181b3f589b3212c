//! Baidu ERNIE adapter
//!
//! Auth is an access token passed as the `access_token` query parameter, and
//! the model name selects an endpoint suffix appended to the configured base
//! URL. The deployment region decides the base URL, so there is no safe
//! vendor-wide default: construction fails without an explicit endpoint.
//! Responses put the text in a top-level `result` field, both for sync calls
//! and for SSE frames; streams end with a `[DONE]` sentinel. ERNIE has no
//! system role, so `system_message` is silently dropped.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use crate::error::GatewayError;
use crate::stream::ChatStream;
use crate::traits::ChatClient;
use crate::types::{ChatChunk, ChatRequest, Completion, Credential, ProviderDescriptor};
use crate::utils::streaming::{StreamFactory, send_checked};

pub const BAIDU: ProviderDescriptor = ProviderDescriptor {
    key: "baidu",
    default_endpoint: None,
    requires_endpoint: true,
    default_timeout_secs: 30,
};

/// Model to endpoint-suffix lookup; unknown models fall back to `completions`.
fn endpoint_suffix(model: &str) -> &'static str {
    match model {
        "ernie-bot" => "completions",
        "ernie-bot-turbo" => "eb-instant",
        "ernie-bot-4" => "completions_pro",
        "ernie-3.5-8k" => "completions",
        "ernie-3.5-8k-0205" => "ernie_bot_8k",
        _ => "completions",
    }
}

#[derive(Debug)]
pub struct BaiduClient {
    access_token: SecretString,
    base_url: String,
    http: reqwest::Client,
}

impl BaiduClient {
    pub fn new(credential: Credential, http: reqwest::Client) -> Result<Self, GatewayError> {
        let base_url = super::resolve_endpoint(&BAIDU, credential.endpoint)?;
        Ok(Self {
            access_token: credential.secret,
            base_url,
            http,
        })
    }

    fn chat_url(&self, model: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint_suffix(model)
        )
    }

    fn request_body(&self, request: &ChatRequest, stream: bool) -> Value {
        let options = &request.options;
        let mut body = json!({
            "messages": [{"role": "user", "content": request.message}],
            "temperature": options.temperature.unwrap_or(0.7),
            "max_output_tokens": options.max_tokens.unwrap_or(2048),
        });
        if let Some(stop) = options.stop_sequences() {
            body["stop"] = json!(stop);
        }
        if stream {
            body["stream"] = json!(true);
        }
        body
    }

    fn builder(&self, model: &str, body: &Value) -> reqwest::RequestBuilder {
        self.http
            .post(self.chat_url(model))
            .query(&[("access_token", self.access_token.expose_secret())])
            .json(body)
    }
}

fn extract_result(frame: &Value) -> Option<ChatChunk> {
    Some(ChatChunk::new(
        frame
            .get("result")
            .and_then(Value::as_str)
            .map(str::to_owned),
        None,
    ))
}

#[async_trait]
impl ChatClient for BaiduClient {
    fn provider_name(&self) -> &'static str {
        BAIDU.key
    }

    async fn chat(&self, request: &ChatRequest) -> Result<Completion, GatewayError> {
        let timeout = request.options.timeout_or(BAIDU.default_timeout_secs);
        let body = self.request_body(request, false);
        let response = send_checked(
            self.builder(&request.model, &body).timeout(timeout),
            timeout.as_secs(),
        )
        .await?;
        let frame: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::ParseError(format!("invalid JSON body: {e}")))?;
        frame
            .get("result")
            .and_then(Value::as_str)
            .map(Completion::text)
            .ok_or_else(|| {
                // ERNIE reports errors as 200s with an error_msg body.
                let detail = frame
                    .get("error_msg")
                    .and_then(Value::as_str)
                    .unwrap_or("response missing result field");
                GatewayError::ParseError(format!("baidu: {detail}"))
            })
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<ChatStream, GatewayError> {
        let timeout = request.options.timeout_or(BAIDU.default_timeout_secs);
        let body = self.request_body(request, true);
        StreamFactory::sse_stream(self.builder(&request.model, &body), timeout, extract_result)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_requires_an_endpoint() {
        let error = BaiduClient::new(Credential::new("token"), reqwest::Client::new()).unwrap_err();
        assert!(matches!(error, GatewayError::ConfigurationError(_)));
    }

    #[test]
    fn model_selects_endpoint_suffix() {
        let credential = Credential::new("token")
            .with_endpoint("https://aip.baidubce.com/rpc/2.0/ai_custom/v1/wenxinworkshop/chat");
        let client = BaiduClient::new(credential, reqwest::Client::new()).unwrap();
        assert!(client.chat_url("ernie-bot-turbo").ends_with("/chat/eb-instant"));
        assert!(client.chat_url("ernie-bot-4").ends_with("/chat/completions_pro"));
        assert!(client.chat_url("some-new-model").ends_with("/chat/completions"));
    }

    #[test]
    fn result_field_extraction() {
        assert_eq!(
            extract_result(&json!({"result": "part"})).unwrap().text.as_deref(),
            Some("part")
        );
        assert!(extract_result(&json!({"is_end": true})).unwrap().is_empty());
    }

    #[test]
    fn system_message_is_dropped() {
        let credential = Credential::new("token").with_endpoint("https://example.invalid/chat");
        let client = BaiduClient::new(credential, reqwest::Client::new()).unwrap();
        let mut request = ChatRequest::new("ernie-bot", "hi");
        request.options.system_message = Some("ignored".into());
        let body = client.request_body(&request, false);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["max_output_tokens"], 2048);
    }
}
