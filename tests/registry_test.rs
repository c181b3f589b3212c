//! Registry resolution and endpoint fallback tests.

use llm_gateway::prelude::*;

#[tokio::test]
async fn builtin_providers_resolve_to_their_adapters() {
    let registry = ProviderRegistry::with_builtin_providers();
    let http = reqwest::Client::new();

    for key in [
        "openai",
        "deepseek",
        "zhipu",
        "moonshot",
        "siliconflow",
        "anthropic",
        "gemini",
    ] {
        let client = registry
            .resolve(key, &Credential::new("secret"), &http)
            .unwrap_or_else(|e| panic!("{key} should resolve: {e}"));
        assert_eq!(client.provider_name(), key);
    }

    // Mandatory-endpoint vendors need one from somewhere.
    for key in ["baidu", "alibaba"] {
        let credential = Credential::new("secret").with_endpoint("https://example.invalid/api");
        let client = registry.resolve(key, &credential, &http).unwrap();
        assert_eq!(client.provider_name(), key);
    }
}

#[tokio::test]
async fn unknown_provider_fails_fatally_with_known_keys_listed() {
    let registry = ProviderRegistry::with_builtin_providers();
    let error = match registry.resolve("no-such-vendor", &Credential::new("k"), &reqwest::Client::new())
    {
        Ok(_) => panic!("unknown provider should not resolve"),
        Err(error) => error,
    };
    assert!(error.is_fatal());
    let message = error.to_string();
    assert!(message.contains("no-such-vendor"));
    assert!(message.contains("gemini"));
}

#[tokio::test]
async fn endpoint_fallback_order_is_override_then_default_then_failure() {
    let mut registry = ProviderRegistry::with_builtin_providers();
    let http = reqwest::Client::new();

    // (4) mandatory endpoint, nothing configured: construction failure.
    let error = match registry.resolve("alibaba", &Credential::new("k"), &http) {
        Ok(_) => panic!("alibaba without an endpoint should not resolve"),
        Err(error) => error,
    };
    assert!(error.is_fatal());

    // (2) provider-wide configured default fills the gap.
    registry.set_default_endpoint("alibaba", "https://configured.invalid/generation");
    assert!(registry.resolve("alibaba", &Credential::new("k"), &http).is_ok());

    // (1) a stored credential override still wins.
    let overridden = Credential::new("k").with_endpoint("https://override.invalid/generation");
    assert!(registry.resolve("alibaba", &overridden, &http).is_ok());
}
