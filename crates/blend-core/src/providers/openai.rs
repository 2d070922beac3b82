//! OpenAI Chat Completions API client

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;
use crate::types::{ChatMessage, Provider};

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Serialize)]
struct CompletionsRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionsResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error)
        .and_then(|e| e.message)
        .unwrap_or_else(|| "OpenAI API request failed".to_string())
}

/// Send a transcript to the OpenAI Chat Completions API and return the
/// generated text. Roles pass through unchanged, system included.
pub async fn chat(
    http: &Client,
    api_key: &str,
    model: &str,
    messages: &[ChatMessage],
) -> Result<String, ProviderError> {
    let request = CompletionsRequest { model, messages };

    debug!(model, messages = messages.len(), "OpenAI chat request");

    let response = http
        .post(COMPLETIONS_URL)
        .bearer_auth(api_key)
        .json(&request)
        .send()
        .await
        .map_err(|e| ProviderError::transport(Provider::OpenAi, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        debug!(%status, "OpenAI chat error response");
        return Err(ProviderError::Api(format!(
            "OpenAI Error: {}",
            error_message(&body)
        )));
    }

    let parsed: CompletionsResponse = response
        .json()
        .await
        .map_err(|e| ProviderError::transport(Provider::OpenAi, e))?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();

    if content.is_empty() {
        return Err(ProviderError::EmptyContent(Provider::OpenAi));
    }

    debug!(chars = content.len(), "OpenAI chat response");
    Ok(content)
}
