//! Provider registry and client factory
//!
//! The registry is an explicit value owned by the gateway (never a hidden
//! global): an open mapping from provider key to client constructor, so new
//! vendors register without touching dispatch. Resolution merges the endpoint
//! fallback chain — credential override, then registry-configured provider
//! default, then the adapter's hardcoded default, and finally a construction
//! failure for adapters that mandate an explicit endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::GatewayError;
use crate::providers::alibaba::AlibabaClient;
use crate::providers::anthropic::AnthropicClient;
use crate::providers::baidu::BaiduClient;
use crate::providers::gemini::GeminiClient;
use crate::providers::openai_compatible::{
    self, OpenAiCompatibleClient,
};
use crate::traits::ChatClient;
use crate::types::Credential;

/// Builds one client from a resolved credential and a shared HTTP client.
pub type ClientConstructor =
    fn(Credential, reqwest::Client) -> Result<Arc<dyn ChatClient>, GatewayError>;

fn openai(credential: Credential, http: reqwest::Client) -> Result<Arc<dyn ChatClient>, GatewayError> {
    Ok(Arc::new(OpenAiCompatibleClient::new(
        openai_compatible::OPENAI,
        credential,
        http,
    )?))
}

fn deepseek(
    credential: Credential,
    http: reqwest::Client,
) -> Result<Arc<dyn ChatClient>, GatewayError> {
    Ok(Arc::new(OpenAiCompatibleClient::new(
        openai_compatible::DEEPSEEK,
        credential,
        http,
    )?))
}

fn zhipu(credential: Credential, http: reqwest::Client) -> Result<Arc<dyn ChatClient>, GatewayError> {
    Ok(Arc::new(OpenAiCompatibleClient::new(
        openai_compatible::ZHIPU,
        credential,
        http,
    )?))
}

fn moonshot(
    credential: Credential,
    http: reqwest::Client,
) -> Result<Arc<dyn ChatClient>, GatewayError> {
    Ok(Arc::new(OpenAiCompatibleClient::new(
        openai_compatible::MOONSHOT,
        credential,
        http,
    )?))
}

fn siliconflow(
    credential: Credential,
    http: reqwest::Client,
) -> Result<Arc<dyn ChatClient>, GatewayError> {
    Ok(Arc::new(OpenAiCompatibleClient::new(
        openai_compatible::SILICONFLOW,
        credential,
        http,
    )?))
}

fn anthropic(
    credential: Credential,
    http: reqwest::Client,
) -> Result<Arc<dyn ChatClient>, GatewayError> {
    Ok(Arc::new(AnthropicClient::new(credential, http)?))
}

fn gemini(credential: Credential, http: reqwest::Client) -> Result<Arc<dyn ChatClient>, GatewayError> {
    Ok(Arc::new(GeminiClient::new(credential, http)?))
}

fn baidu(credential: Credential, http: reqwest::Client) -> Result<Arc<dyn ChatClient>, GatewayError> {
    Ok(Arc::new(BaiduClient::new(credential, http)?))
}

fn alibaba(
    credential: Credential,
    http: reqwest::Client,
) -> Result<Arc<dyn ChatClient>, GatewayError> {
    Ok(Arc::new(AlibabaClient::new(credential, http)?))
}

/// Open mapping from provider key to adapter constructor.
#[derive(Default)]
pub struct ProviderRegistry {
    constructors: HashMap<String, ClientConstructor>,
    default_endpoints: HashMap<String, String>,
}

impl ProviderRegistry {
    /// An empty registry; vendors must be registered before resolution.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in vendor family registered.
    pub fn with_builtin_providers() -> Self {
        let mut registry = Self::new();
        registry.register("openai", openai);
        registry.register("deepseek", deepseek);
        registry.register("zhipu", zhipu);
        registry.register("moonshot", moonshot);
        registry.register("siliconflow", siliconflow);
        registry.register("anthropic", anthropic);
        registry.register("gemini", gemini);
        registry.register("baidu", baidu);
        registry.register("alibaba", alibaba);
        registry
    }

    /// Register (or replace) a provider constructor under a key.
    pub fn register(&mut self, key: impl Into<String>, constructor: ClientConstructor) {
        self.constructors.insert(key.into(), constructor);
    }

    /// Configure a provider-wide default endpoint, consulted when the
    /// credential carries no override.
    pub fn set_default_endpoint(&mut self, key: impl Into<String>, endpoint: impl Into<String>) {
        self.default_endpoints.insert(key.into(), endpoint.into());
    }

    /// Known provider keys, sorted for stable diagnostics.
    pub fn supported_providers(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Resolve a provider key and credential to a ready client.
    pub fn resolve(
        &self,
        provider: &str,
        credential: &Credential,
        http: &reqwest::Client,
    ) -> Result<Arc<dyn ChatClient>, GatewayError> {
        let constructor = self.constructors.get(provider).ok_or_else(|| {
            GatewayError::ConfigurationError(format!(
                "unsupported provider '{provider}'; known providers: {}",
                self.supported_providers().join(", ")
            ))
        })?;

        let mut credential = credential.clone();
        if credential.endpoint.is_none()
            && let Some(endpoint) = self.default_endpoints.get(provider)
        {
            credential.endpoint = Some(endpoint.clone());
        }

        constructor(credential, http.clone())
    }
}

/// Infer the provider key from a model name when no catalog entry exists.
///
/// Mirrors the common naming families; anything unrecognized lands on the
/// OpenAI-compatible aggregator.
pub fn infer_provider(model: &str) -> &'static str {
    let model = model.to_ascii_lowercase();
    if model.contains("gpt") || model.contains("openai") {
        "openai"
    } else if model.contains("claude") || model.contains("anthropic") {
        "anthropic"
    } else if model.contains("ernie") || model.contains("baidu") {
        "baidu"
    } else if model.contains("qwen") || model.contains("alibaba") {
        "alibaba"
    } else if model.contains("glm") || model.contains("zhipu") {
        "zhipu"
    } else if model.contains("gemini") {
        "gemini"
    } else if model.contains("deepseek") {
        "deepseek"
    } else if model.contains("kimi") || model.contains("moonshot") {
        "moonshot"
    } else {
        "siliconflow"
    }
}
