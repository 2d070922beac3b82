//! Google Gemini generateContent API client

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;
use crate::types::{ChatMessage, ChatRole, Provider};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
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

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error)
        .and_then(|e| e.message)
        .unwrap_or_else(|| "Google API request failed".to_string())
}

/// Map a transcript to Gemini `contents`: assistant becomes `model`,
/// the system message (if any) becomes `systemInstruction`
fn build_request(messages: &[ChatMessage]) -> GenerateRequest {
    let contents = messages
        .iter()
        .filter(|m| m.role != ChatRole::System)
        .map(|m| Content {
            role: Some(if m.role == ChatRole::Assistant {
                "model"
            } else {
                "user"
            }),
            parts: vec![Part {
                text: m.content.clone(),
            }],
        })
        .collect();

    let system_instruction = messages
        .iter()
        .find(|m| m.role == ChatRole::System)
        .map(|m| Content {
            role: None,
            parts: vec![Part {
                text: m.content.clone(),
            }],
        });

    GenerateRequest {
        contents,
        system_instruction,
    }
}

/// Send a transcript to the Gemini generateContent API and return the
/// generated text.
pub async fn chat(
    http: &Client,
    api_key: &str,
    model: &str,
    messages: &[ChatMessage],
) -> Result<String, ProviderError> {
    let request = build_request(messages);

    debug!(model, contents = request.contents.len(), "Google chat request");

    // The key travels as a query parameter; reqwest keeps it out of logs
    let url = format!("{BASE_URL}/{model}:generateContent");
    let response = http
        .post(&url)
        .query(&[("key", api_key)])
        .json(&request)
        .send()
        .await
        .map_err(|e| ProviderError::transport(Provider::Google, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        debug!(%status, "Google chat error response");
        return Err(ProviderError::Api(format!(
            "Gemini Error: {}",
            error_message(&body)
        )));
    }

    let parsed: GenerateResponse = response
        .json()
        .await
        .map_err(|e| ProviderError::transport(Provider::Google, e))?;

    let content = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .map(|p| p.text)
        .unwrap_or_default();

    if content.is_empty() {
        return Err(ProviderError::EmptyContent(Provider::Google));
    }

    debug!(chars = content.len(), "Google chat response");
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_role_mapping() {
        let messages = vec![
            ChatMessage::system("Be terse."),
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
            ChatMessage::user("explain recursion"),
        ];
        let request = build_request(&messages);

        let json = serde_json::to_value(&request).unwrap();
        let contents = json["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(contents[2]["parts"][0]["text"], "explain recursion");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "Be terse.");
    }

    #[test]
    fn test_build_request_without_system() {
        let request = build_request(&[ChatMessage::user("hi")]);
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn test_response_deserialization() {
        let json = serde_json::json!({
            "candidates": [
                { "content": { "role": "model", "parts": [ { "text": "Recursion is..." } ] } }
            ]
        });
        let parsed: GenerateResponse = serde_json::from_value(json).unwrap();
        let text = &parsed.candidates[0].content.as_ref().unwrap().parts[0].text;
        assert_eq!(text, "Recursion is...");
    }

    #[test]
    fn test_response_no_candidates() {
        let parsed: GenerateResponse =
            serde_json::from_value(serde_json::json!({ "candidates": [] })).unwrap();
        assert!(parsed.candidates.is_empty());
    }

    #[test]
    fn test_error_message_parsing() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body), "API key not valid");
        assert_eq!(error_message("oops"), "Google API request failed");
    }
}
