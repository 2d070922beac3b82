//! Second-stage consolidation of a settled response batch
//!
//! Runs strictly after the dispatch join: the successful subset of the
//! batch is folded into the consolidation template and sent as a single
//! user message to one consolidator model. Unlike the dispatcher, this
//! stage propagates its failure to the caller.

use tracing::{debug, info};

use crate::dispatch::ModelCaller;
use crate::error::ConsolidateError;
use crate::types::{ChatMessage, ModelDescriptor, ModelResponse};

/// Placeholder in the consolidation template
const RESPONSES_PLACEHOLDER: &str = "{responses}";

/// Delimiter between individual model answers in the joined block
const RESPONSE_SEPARATOR: &str = "\n\n---\n\n";

/// Responses that settled with usable text
pub fn successful(responses: &[ModelResponse]) -> Vec<&ModelResponse> {
    responses.iter().filter(|r| r.is_success()).collect()
}

/// Build the consolidation prompt: each answer as `"<name>:\n<content>"`,
/// joined by the fixed delimiter and substituted for the template's
/// `{responses}` placeholder.
pub fn build_consolidation_prompt(responses: &[&ModelResponse], template: &str) -> String {
    let joined = responses
        .iter()
        .map(|r| format!("{}:\n{}", r.model_name, r.content.as_deref().unwrap_or_default()))
        .collect::<Vec<_>>()
        .join(RESPONSE_SEPARATOR);

    template.replacen(RESPONSES_PLACEHOLDER, &joined, 1)
}

/// Merge the successful subset of `responses` into one answer via a
/// single call to `consolidator`.
///
/// Fails with [`ConsolidateError::NoSuccessfulResponses`] before any
/// network activity when nothing survived the first stage.
pub async fn consolidate(
    caller: &dyn ModelCaller,
    responses: &[ModelResponse],
    consolidator: &ModelDescriptor,
    template: &str,
) -> Result<String, ConsolidateError> {
    let surviving = successful(responses);
    if surviving.is_empty() {
        return Err(ConsolidateError::NoSuccessfulResponses);
    }

    debug!(
        surviving = surviving.len(),
        total = responses.len(),
        consolidator = %consolidator.id,
        "Consolidating responses"
    );

    let prompt = build_consolidation_prompt(&surviving, template);
    let messages = [ChatMessage::user(prompt)];

    let merged = caller.call(consolidator, &messages).await?;
    info!(chars = merged.len(), "Consolidated response ready");
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::types::Provider;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every prompt it receives and replies with a fixed answer
    struct RecordingCaller {
        reply: Result<String, String>,
        prompts: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl RecordingCaller {
        fn replying(content: &str) -> Self {
            Self {
                reply: Ok(content.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing(error: &str) -> Self {
            Self {
                reply: Err(error.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ModelCaller for RecordingCaller {
        async fn call(
            &self,
            _model: &ModelDescriptor,
            messages: &[ChatMessage],
        ) -> Result<String, ProviderError> {
            self.prompts.lock().unwrap().push(messages.to_vec());
            self.reply.clone().map_err(ProviderError::Api)
        }
    }

    fn descriptor(name: &str) -> ModelDescriptor {
        ModelDescriptor::new(name, name, Provider::Anthropic)
    }

    fn success(name: &str, content: &str) -> ModelResponse {
        ModelResponse::success(&descriptor(name), content)
    }

    fn failure(name: &str, error: &str) -> ModelResponse {
        ModelResponse::failure(&descriptor(name), error)
    }

    #[test]
    fn test_prompt_substitution() {
        let a = success("A", "x");
        let b = success("B", "y");
        let prompt =
            build_consolidation_prompt(&[&a, &b], "PREFIX {responses} SUFFIX");
        assert_eq!(prompt, "PREFIX A:\nx\n\n---\n\nB:\ny SUFFIX");
    }

    #[test]
    fn test_prompt_single_response_has_no_separator() {
        let a = success("A", "only answer");
        let prompt = build_consolidation_prompt(&[&a], "{responses}");
        assert_eq!(prompt, "A:\nonly answer");
    }

    #[test]
    fn test_prompt_substitutes_first_placeholder_only() {
        let a = success("A", "x");
        let prompt = build_consolidation_prompt(&[&a], "{responses} and {responses}");
        assert_eq!(prompt, "A:\nx and {responses}");
    }

    #[test]
    fn test_successful_filters_errors_and_empty() {
        let batch = vec![
            success("A", "x"),
            failure("B", "boom"),
            success("C", ""),
        ];
        let surviving = successful(&batch);
        assert_eq!(surviving.len(), 1);
        assert_eq!(surviving[0].model_name, "A");
    }

    #[tokio::test]
    async fn test_all_failed_short_circuits_without_call() {
        let caller = RecordingCaller::replying("unused");
        let batch = vec![failure("A", "boom"), failure("B", "boom")];

        let err = consolidate(&caller, &batch, &descriptor("judge"), "{responses}")
            .await
            .unwrap_err();

        assert!(matches!(err, ConsolidateError::NoSuccessfulResponses));
        assert_eq!(err.to_string(), "No successful responses to consolidate");
        assert_eq!(caller.call_count(), 0);
    }

    #[tokio::test]
    async fn test_consolidates_only_surviving_responses() {
        let caller = RecordingCaller::replying("merged answer");
        let batch = vec![
            success("A", "Recursion is..."),
            failure("B", "invalid API key"),
        ];

        let merged = consolidate(&caller, &batch, &descriptor("judge"), "{responses}")
            .await
            .unwrap();

        assert_eq!(merged, "merged answer");
        assert_eq!(caller.call_count(), 1);

        // Exactly one user-role message, containing only A's content
        let prompts = caller.prompts.lock().unwrap();
        let messages = &prompts[0];
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, crate::types::ChatRole::User);
        assert!(messages[0].content.contains("A:\nRecursion is..."));
        assert!(!messages[0].content.contains("invalid API key"));
        assert!(!messages[0].content.contains("B:"));
    }

    #[tokio::test]
    async fn test_consolidator_failure_propagates() {
        let caller = RecordingCaller::failing("Claude Error: overloaded");
        let batch = vec![success("A", "x")];

        let err = consolidate(&caller, &batch, &descriptor("judge"), "{responses}")
            .await
            .unwrap_err();

        assert!(matches!(err, ConsolidateError::Provider(_)));
        assert_eq!(err.to_string(), "Claude Error: overloaded");
    }
}
