//! Google Gemini adapter
//!
//! The API key travels as a `key` query parameter. Requests address
//! `/v1beta/models/{model}:generateContent` (sync) or `:streamGenerateContent`
//! (streaming); the streaming wire is newline-delimited JSON rather than SSE,
//! with no sentinel — connection close terminates the exchange. Gemini has no
//! system role here, so a system message is prepended as a `System: …` first
//! content entry.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use crate::error::GatewayError;
use crate::stream::ChatStream;
use crate::traits::ChatClient;
use crate::types::{ChatChunk, ChatRequest, Completion, Credential, ProviderDescriptor};
use crate::utils::streaming::{StreamFactory, send_checked};

pub const GEMINI: ProviderDescriptor = ProviderDescriptor {
    key: "gemini",
    default_endpoint: Some("https://generativelanguage.googleapis.com"),
    requires_endpoint: false,
    default_timeout_secs: 60,
};

pub struct GeminiClient {
    api_key: SecretString,
    base_url: String,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(credential: Credential, http: reqwest::Client) -> Result<Self, GatewayError> {
        let base_url = super::resolve_endpoint(&GEMINI, credential.endpoint)?;
        Ok(Self {
            api_key: credential.secret,
            base_url,
            http,
        })
    }

    fn model_url(&self, model: &str, action: &str) -> String {
        format!(
            "{}/v1beta/models/{model}:{action}",
            self.base_url.trim_end_matches('/')
        )
    }

    fn request_body(&self, request: &ChatRequest) -> Value {
        let options = &request.options;
        let mut contents = Vec::new();
        if let Some(system) = &options.system_message {
            contents.push(json!({"parts": [{"text": format!("System: {system}")}]}));
        }
        contents.push(json!({"parts": [{"text": request.message}]}));

        let mut generation_config = json!({
            "temperature": options.temperature.unwrap_or(0.7),
            "topP": options.top_p.unwrap_or(1.0),
            "maxOutputTokens": options.max_tokens.unwrap_or(2048),
        });
        if let Some(stop) = options.stop_sequences() {
            generation_config["stopSequences"] = json!(stop);
        }

        json!({
            "contents": contents,
            "generationConfig": generation_config,
        })
    }

    fn builder(&self, model: &str, action: &str, body: &Value) -> reqwest::RequestBuilder {
        self.http
            .post(self.model_url(model, action))
            .query(&[("key", self.api_key.expose_secret())])
            .json(body)
    }
}

fn candidate_text(frame: &Value) -> Option<String> {
    frame
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
        .map(str::to_owned)
}

fn extract_delta(frame: &Value) -> Option<ChatChunk> {
    Some(ChatChunk::new(candidate_text(frame), None))
}

#[async_trait]
impl ChatClient for GeminiClient {
    fn provider_name(&self) -> &'static str {
        GEMINI.key
    }

    async fn chat(&self, request: &ChatRequest) -> Result<Completion, GatewayError> {
        let timeout = request.options.timeout_or(GEMINI.default_timeout_secs);
        let body = self.request_body(request);
        let response = send_checked(
            self.builder(&request.model, "generateContent", &body)
                .timeout(timeout),
            timeout.as_secs(),
        )
        .await?;
        let frame: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::ParseError(format!("invalid JSON body: {e}")))?;
        candidate_text(&frame)
            .map(Completion::text)
            .ok_or_else(|| {
                GatewayError::ParseError(
                    "gemini response missing candidates[0].content.parts[0].text".into(),
                )
            })
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<ChatStream, GatewayError> {
        let timeout = request.options.timeout_or(GEMINI.default_timeout_secs);
        let body = self.request_body(request);
        StreamFactory::json_lines_stream(
            self.builder(&request.model, "streamGenerateContent", &body),
            timeout,
            extract_delta,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_path_extraction() {
        let frame = json!({
            "candidates": [{"content": {"parts": [{"text": "Hi"}]}}]
        });
        assert_eq!(candidate_text(&frame).as_deref(), Some("Hi"));
        assert!(candidate_text(&json!({"candidates": []})).is_none());
        assert!(candidate_text(&json!({"promptFeedback": {}})).is_none());
    }

    #[test]
    fn urls_embed_model_and_action() {
        let client = GeminiClient::new(Credential::new("key"), reqwest::Client::new()).unwrap();
        assert_eq!(
            client.model_url("gemini-pro", "streamGenerateContent"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:streamGenerateContent"
        );
    }

    #[test]
    fn system_message_becomes_first_content_entry() {
        let client = GeminiClient::new(Credential::new("key"), reqwest::Client::new()).unwrap();
        let mut request = ChatRequest::new("gemini-pro", "question");
        request.options.system_message = Some("rules".into());
        let body = client.request_body(&request);
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0]["parts"][0]["text"], "System: rules");
        assert_eq!(contents[1]["parts"][0]["text"], "question");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
    }
}
