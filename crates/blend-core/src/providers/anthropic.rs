//! Anthropic Messages API client

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;
use crate::types::{ChatMessage, ChatRole, Provider};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: String,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Extract the error message from an Anthropic error body
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error)
        .and_then(|e| e.message)
        .unwrap_or_else(|| "Anthropic API request failed".to_string())
}

/// Map a transcript to the Anthropic request shape: the system message
/// (if any) moves into the dedicated `system` field, everything else
/// passes through in order
fn build_request<'a>(model: &'a str, messages: &'a [ChatMessage]) -> MessagesRequest<'a> {
    let system = messages
        .iter()
        .find(|m| m.role == ChatRole::System)
        .map(|m| m.content.clone())
        .unwrap_or_default();

    MessagesRequest {
        model,
        max_tokens: MAX_TOKENS,
        system,
        messages: messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(|m| WireMessage {
                role: if m.role == ChatRole::Assistant {
                    "assistant"
                } else {
                    "user"
                },
                content: &m.content,
            })
            .collect(),
    }
}

/// Send a transcript to the Anthropic Messages API and return the
/// generated text.
pub async fn chat(
    http: &Client,
    api_key: &str,
    model: &str,
    messages: &[ChatMessage],
) -> Result<String, ProviderError> {
    let request = build_request(model, messages);

    debug!(model, messages = request.messages.len(), "Anthropic chat request");

    let response = http
        .post(MESSAGES_URL)
        .header("x-api-key", api_key)
        .header("anthropic-version", API_VERSION)
        .json(&request)
        .send()
        .await
        .map_err(|e| ProviderError::transport(Provider::Anthropic, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        debug!(%status, "Anthropic chat error response");
        return Err(ProviderError::Api(format!(
            "Claude Error: {}",
            error_message(&body)
        )));
    }

    let parsed: MessagesResponse = response
        .json()
        .await
        .map_err(|e| ProviderError::transport(Provider::Anthropic, e))?;

    let content = parsed
        .content
        .into_iter()
        .next()
        .map(|block| block.text)
        .unwrap_or_default();

    if content.is_empty() {
        return Err(ProviderError::EmptyContent(Provider::Anthropic));
    }

    debug!(chars = content.len(), "Anthropic chat response");
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_splits_system_message() {
        let messages = vec![
            ChatMessage::system("Be terse."),
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
        ];
        let request = build_request("claude-sonnet-4-5", &messages);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "claude-sonnet-4-5");
        assert_eq!(json["system"], "Be terse.");
        assert_eq!(json["max_tokens"], 4096);
        assert_eq!(json["messages"].as_array().unwrap().len(), 2);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");
        assert_eq!(json["messages"][1]["role"], "assistant");
    }

    #[test]
    fn test_request_without_system_message() {
        let messages = [ChatMessage::user("hi")];
        let request = build_request("claude-sonnet-4-5", &messages);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["system"], "");
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_response_first_block_text() {
        let json = serde_json::json!({
            "content": [
                { "type": "text", "text": "Recursion is..." },
                { "type": "text", "text": "ignored" }
            ]
        });
        let parsed: MessagesResponse = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.content[0].text, "Recursion is...");
    }

    #[test]
    fn test_response_empty_content() {
        let json = serde_json::json!({ "content": [] });
        let parsed: MessagesResponse = serde_json::from_value(json).unwrap();
        assert!(parsed.content.is_empty());
    }

    #[test]
    fn test_error_message_parsing() {
        let body = r#"{"error":{"type":"rate_limit_error","message":"Too many requests"}}"#;
        assert_eq!(error_message(body), "Too many requests");
        assert_eq!(error_message("not json"), "Anthropic API request failed");
        assert_eq!(error_message("{}"), "Anthropic API request failed");
    }
}
