//! Provider adapters
//!
//! One module per vendor family. Each adapter binds a vendor's request shape,
//! auth placement, and stream framing to the [`crate::traits::ChatClient`]
//! capability interface; framing itself lives in
//! [`crate::utils::streaming`] so adapters only say where the text is.

pub mod alibaba;
pub mod anthropic;
pub mod baidu;
pub mod gemini;
pub mod openai_compatible;

use crate::error::GatewayError;
use crate::types::ProviderDescriptor;

/// Resolve the endpoint an adapter will use: an explicit endpoint (credential
/// override or registry default, already merged by the caller) wins; otherwise
/// the descriptor's hardcoded default applies; adapters that mandate an
/// explicit endpoint fail construction here rather than at call time.
pub(crate) fn resolve_endpoint(
    descriptor: &ProviderDescriptor,
    endpoint: Option<String>,
) -> Result<String, GatewayError> {
    if let Some(endpoint) = endpoint {
        return Ok(endpoint);
    }
    if descriptor.requires_endpoint {
        return Err(GatewayError::ConfigurationError(format!(
            "provider '{}' has no safe default endpoint; configure one explicitly",
            descriptor.key
        )));
    }
    descriptor
        .default_endpoint
        .map(str::to_owned)
        .ok_or_else(|| {
            GatewayError::ConfigurationError(format!(
                "provider '{}' has no endpoint configured",
                descriptor.key
            ))
        })
}
