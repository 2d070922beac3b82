//! blend-core: multi-provider LLM fan-out
//!
//! Dispatches a single prompt to several LLM providers concurrently,
//! reports each result as it settles, and can run a second-stage
//! "consolidation" call that merges the successful responses into one
//! answer. Configuration and credentials live in a pluggable key-value
//! store.

pub mod consolidate;
pub mod dispatch;
pub mod error;
pub mod providers;
pub mod settings;
pub mod store;
pub mod types;

pub use consolidate::{build_consolidation_prompt, consolidate};
pub use dispatch::{ModelCaller, dispatch_all};
pub use error::{ConsolidateError, ProviderError};
pub use providers::{ChatClient, HttpModelCaller};
pub use settings::Settings;
pub use store::{FileStore, KvStore, MemoryStore};
pub use types::{ChatMessage, ChatRole, ModelDescriptor, ModelResponse, Provider};
