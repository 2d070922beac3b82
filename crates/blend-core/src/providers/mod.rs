//! Per-provider chat clients
//!
//! Each provider module speaks its vendor's wire format and normalizes
//! every failure mode into [`ProviderError`]. [`ChatClient`] routes a
//! call to the right module; [`HttpModelCaller`] adds per-call API-key
//! resolution on top and is the live transport behind the dispatcher.

pub mod anthropic;
pub mod google;
pub mod openai;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::dispatch::ModelCaller;
use crate::error::ProviderError;
use crate::settings::Settings;
use crate::types::{ChatMessage, ModelDescriptor, Provider};

/// Routes chat requests to the provider-specific client
#[derive(Clone)]
pub struct ChatClient {
    http: Client,
}

impl Default for ChatClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatClient {
    pub fn new() -> Self {
        Self {
            // Generation can run long; well past a normal request timeout
            http: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    /// Send a transcript to one provider and return the generated text
    pub async fn chat(
        &self,
        provider: Provider,
        model: &str,
        api_key: &str,
        messages: &[ChatMessage],
    ) -> Result<String, ProviderError> {
        match provider {
            Provider::OpenAi => openai::chat(&self.http, api_key, model, messages).await,
            Provider::Anthropic => anthropic::chat(&self.http, api_key, model, messages).await,
            Provider::Google => google::chat(&self.http, api_key, model, messages).await,
        }
    }
}

/// Live [`ModelCaller`] backed by HTTP clients and stored API keys.
///
/// The key lookup happens per call, so a missing key settles that one
/// model with an error without touching the network or its siblings.
#[derive(Clone)]
pub struct HttpModelCaller {
    client: ChatClient,
    settings: Settings,
}

impl HttpModelCaller {
    pub fn new(settings: Settings) -> Self {
        Self {
            client: ChatClient::new(),
            settings,
        }
    }
}

#[async_trait]
impl ModelCaller for HttpModelCaller {
    async fn call(
        &self,
        model: &ModelDescriptor,
        messages: &[ChatMessage],
    ) -> Result<String, ProviderError> {
        let api_key = self
            .settings
            .api_key(model.provider)
            .ok_or(ProviderError::MissingApiKey(model.provider))?;

        debug!(provider = %model.provider, model = %model.id, "Calling model");
        self.client
            .chat(model.provider, &model.id, &api_key, messages)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_missing_key_short_circuits_without_network() {
        let settings = Settings::new(Arc::new(MemoryStore::new()));
        let caller = HttpModelCaller::new(settings);
        let model = ModelDescriptor::new("gpt-4o", "GPT-4o", Provider::OpenAi);

        // No key stored: resolves immediately, no HTTP attempt is made
        // (a network attempt would hit the 120s client timeout, not
        // return instantly with this exact message)
        let err = caller
            .call(&model, &[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Please add OPENAI API key in settings");
    }

    #[tokio::test]
    async fn test_empty_stored_key_counts_as_missing() {
        let store = Arc::new(MemoryStore::new());
        let settings = Settings::new(store);
        settings.set_api_key(Provider::Google, "   ").unwrap();

        let caller = HttpModelCaller::new(settings);
        let model = ModelDescriptor::new("gemini-1.5-pro", "Gemini 1.5 Pro", Provider::Google);
        let err = caller
            .call(&model, &[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::MissingApiKey(Provider::Google)));
    }
}
