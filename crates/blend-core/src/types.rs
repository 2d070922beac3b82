//! Provider-agnostic types shared across dispatch, consolidation, and sessions

use serde::{Deserialize, Serialize};

/// A single message in the transcript sent to providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

/// An LLM vendor reachable through its own chat endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
    Google,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::OpenAi, Provider::Anthropic, Provider::Google];

    /// Lowercase name used in storage keys and serialized session files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
        }
    }

    /// Uppercase name used in user-facing missing-key messages
    pub fn upper_name(&self) -> String {
        self.as_str().to_uppercase()
    }

    /// Built-in default model id, used when nothing is configured
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o",
            Self::Anthropic => "claude-sonnet-4-5",
            Self::Google => "gemini-1.5-pro",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "google" => Ok(Self::Google),
            other => Err(format!(
                "unknown provider '{other}' (expected openai, anthropic, or google)"
            )),
        }
    }
}

/// One resolved target of a dispatch: a model id, its display name,
/// and the provider that serves it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub name: String,
    pub provider: Provider,
}

impl ModelDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, provider: Provider) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            provider,
        }
    }
}

/// The settled outcome of one model call.
///
/// Exactly one of `content`/`error` is set once the call settles; the
/// constructors are the only way to build one, which keeps that
/// invariant. Serialized camelCase, matching the exported session file
/// format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelResponse {
    pub model_id: String,
    pub model_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModelResponse {
    /// A settled success carrying the generated text
    pub fn success(model: &ModelDescriptor, content: impl Into<String>) -> Self {
        Self {
            model_id: model.id.clone(),
            model_name: model.name.clone(),
            content: Some(content.into()),
            error: None,
        }
    }

    /// A settled failure carrying a human-readable reason
    pub fn failure(model: &ModelDescriptor, error: impl Into<String>) -> Self {
        Self {
            model_id: model.id.clone(),
            model_name: model.name.clone(),
            content: None,
            error: Some(error.into()),
        }
    }

    /// Whether this response carries usable generated text
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.content.as_deref().is_some_and(|c| !c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> ModelDescriptor {
        ModelDescriptor::new("gpt-4o", "GPT-4o", Provider::OpenAi)
    }

    #[test]
    fn test_chat_role_display() {
        assert_eq!(ChatRole::User.to_string(), "user");
        assert_eq!(ChatRole::Assistant.to_string(), "assistant");
        assert_eq!(ChatRole::System.to_string(), "system");
    }

    #[test]
    fn test_provider_parse_roundtrip() {
        for provider in Provider::ALL {
            let parsed: Provider = provider.as_str().parse().unwrap();
            assert_eq!(parsed, provider);
        }
        assert!("mistral".parse::<Provider>().is_err());
        // Parsing trims and lowercases
        assert_eq!(" OpenAI ".parse::<Provider>().unwrap(), Provider::OpenAi);
    }

    #[test]
    fn test_provider_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&Provider::OpenAi).unwrap(),
            "\"openai\""
        );
        let parsed: Provider = serde_json::from_str("\"anthropic\"").unwrap();
        assert_eq!(parsed, Provider::Anthropic);
    }

    #[test]
    fn test_provider_default_models() {
        assert_eq!(Provider::OpenAi.default_model(), "gpt-4o");
        assert_eq!(Provider::Anthropic.default_model(), "claude-sonnet-4-5");
        assert_eq!(Provider::Google.default_model(), "gemini-1.5-pro");
    }

    #[test]
    fn test_model_response_success() {
        let response = ModelResponse::success(&descriptor(), "hello");
        assert!(response.is_success());
        assert_eq!(response.content.as_deref(), Some("hello"));
        assert!(response.error.is_none());
    }

    #[test]
    fn test_model_response_failure() {
        let response = ModelResponse::failure(&descriptor(), "rate limited");
        assert!(!response.is_success());
        assert!(response.content.is_none());
        assert_eq!(response.error.as_deref(), Some("rate limited"));
    }

    #[test]
    fn test_model_response_empty_content_not_success() {
        let response = ModelResponse::success(&descriptor(), "");
        assert!(!response.is_success());
    }

    #[test]
    fn test_model_response_serde_camel_case() {
        let response = ModelResponse::success(&descriptor(), "hi");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["modelId"], "gpt-4o");
        assert_eq!(json["modelName"], "GPT-4o");
        assert_eq!(json["content"], "hi");
        // Unset error is omitted entirely, not serialized as null
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_chat_message_constructors() {
        assert_eq!(ChatMessage::user("q").role, ChatRole::User);
        assert_eq!(ChatMessage::assistant("a").role, ChatRole::Assistant);
        assert_eq!(ChatMessage::system("s").role, ChatRole::System);
    }
}
