//! Error taxonomy for model calls and consolidation
//!
//! Per-model failures never cross the dispatcher boundary: they are
//! captured into `ModelResponse.error` as the display string of a
//! [`ProviderError`]. Only the consolidation stage propagates errors
//! to its caller.

use crate::types::Provider;

/// Why a single model call failed
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// No API key stored for the provider; detected before any network call
    #[error("Please add {} API key in settings", .0.upper_name())]
    MissingApiKey(Provider),

    /// The HTTP request itself failed (connect, timeout, body decode)
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: Provider,
        source: reqwest::Error,
    },

    /// The provider answered but reported an application-level failure
    /// (rate limit, invalid model id, ...); already formatted for display
    #[error("{0}")]
    Api(String),

    /// The provider answered successfully but produced no text
    #[error("No content received from {0}")]
    EmptyContent(Provider),
}

impl ProviderError {
    pub fn transport(provider: Provider, source: reqwest::Error) -> Self {
        Self::Transport { provider, source }
    }
}

/// Why the consolidation stage failed
#[derive(Debug, thiserror::Error)]
pub enum ConsolidateError {
    /// Every response in the batch settled with an error
    #[error("No successful responses to consolidate")]
    NoSuccessfulResponses,

    /// The consolidator model call itself failed
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_message_names_provider() {
        let err = ProviderError::MissingApiKey(Provider::Anthropic);
        assert_eq!(err.to_string(), "Please add ANTHROPIC API key in settings");
        let err = ProviderError::MissingApiKey(Provider::OpenAi);
        assert_eq!(err.to_string(), "Please add OPENAI API key in settings");
    }

    #[test]
    fn test_api_error_passthrough() {
        let err = ProviderError::Api("Claude Error: rate limited".to_string());
        assert_eq!(err.to_string(), "Claude Error: rate limited");
    }

    #[test]
    fn test_empty_content_message() {
        let err = ProviderError::EmptyContent(Provider::Google);
        assert_eq!(err.to_string(), "No content received from google");
    }

    #[test]
    fn test_no_successful_responses_message() {
        let err = ConsolidateError::NoSuccessfulResponses;
        assert_eq!(err.to_string(), "No successful responses to consolidate");
    }

    #[test]
    fn test_consolidate_wraps_provider_error() {
        let err: ConsolidateError = ProviderError::EmptyContent(Provider::OpenAi).into();
        assert_eq!(err.to_string(), "No content received from openai");
    }
}
