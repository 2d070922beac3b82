//! Fan-out dispatch of one prompt to many models
//!
//! All calls run concurrently; each settles independently into a
//! [`ModelResponse`] and is reported over the optional progress channel
//! in settlement order (whichever model resolves first reports first).
//! The bulk return is a join over every call: it resolves only once the
//! slowest call settles, and carries exactly one entry per input
//! descriptor, in input order. No error escapes past this boundary.

use async_trait::async_trait;
use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::types::{ChatMessage, ModelDescriptor, ModelResponse};

/// Transport seam between orchestration and provider clients.
///
/// The live implementation resolves API keys and speaks HTTP; tests
/// substitute programmable fakes.
#[async_trait]
pub trait ModelCaller: Send + Sync {
    async fn call(
        &self,
        model: &ModelDescriptor,
        messages: &[ChatMessage],
    ) -> Result<String, ProviderError>;
}

/// Dispatch the transcript to every model concurrently and join on the
/// full settled batch.
///
/// Each settled result is sent over `progress` as it lands; a closed
/// receiver is ignored. Progress ordering reflects response latency,
/// not submission order, and callers must tolerate any interleaving.
pub async fn dispatch_all(
    caller: &dyn ModelCaller,
    models: &[ModelDescriptor],
    messages: &[ChatMessage],
    progress: Option<UnboundedSender<ModelResponse>>,
) -> Vec<ModelResponse> {
    let mut in_flight: FuturesUnordered<_> = models
        .iter()
        .enumerate()
        .map(|(index, model)| async move {
            let outcome = caller.call(model, messages).await;
            (index, model, outcome)
        })
        .collect();

    debug!(models = models.len(), "Dispatching prompt");

    let mut settled: Vec<Option<ModelResponse>> = vec![None; models.len()];
    while let Some((index, model, outcome)) = in_flight.next().await {
        let response = match outcome {
            Ok(content) => {
                debug!(model = %model.id, chars = content.len(), "Model settled with content");
                ModelResponse::success(model, content)
            }
            Err(err) => {
                warn!(model = %model.id, error = %err, "Model settled with error");
                ModelResponse::failure(model, err.to_string())
            }
        };
        if let Some(tx) = &progress {
            let _ = tx.send(response.clone());
        }
        settled[index] = Some(response);
    }

    settled
        .into_iter()
        .map(|r| r.expect("every dispatched model settles exactly once"))
        .collect()
}
