//! User settings over the shared key-value store
//!
//! Key layout: `<provider>_api_key`,
//! `<provider>_selected_model`, `<provider>_custom_model`,
//! `consolidation_template`, and `theme`. Getters degrade to defaults
//! on store trouble; only setters surface errors.

use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

use crate::store::KvStore;
use crate::types::{ModelDescriptor, Provider};

const CONSOLIDATION_TEMPLATE_KEY: &str = "consolidation_template";
const THEME_KEY: &str = "theme";

/// Built-in consolidation prompt, used when no override is stored.
/// `{responses}` is replaced with the joined model responses.
pub const DEFAULT_CONSOLIDATION_TEMPLATE: &str = "You are an expert AI tasked with merging multiple model responses into one clear, accurate, and coherent answer.\n\nReview all answers below, resolve contradictions, and write the best unified response.\n\n{responses}";

/// UI theme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme '{other}' (expected light or dark)")),
        }
    }
}

/// Typed accessors for user configuration
#[derive(Clone)]
pub struct Settings {
    store: Arc<dyn KvStore>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings").finish_non_exhaustive()
    }
}

fn api_key_key(provider: Provider) -> String {
    format!("{provider}_api_key")
}

fn selected_model_key(provider: Provider) -> String {
    format!("{provider}_selected_model")
}

fn custom_model_key(provider: Provider) -> String {
    format!("{provider}_custom_model")
}

impl Settings {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// The stored API key for a provider; an empty stored value counts
    /// as absent
    pub fn api_key(&self, provider: Provider) -> Option<String> {
        self.store
            .get(&api_key_key(provider))
            .filter(|key| !key.trim().is_empty())
    }

    pub fn set_api_key(&self, provider: Provider, key: &str) -> Result<()> {
        self.store.set(&api_key_key(provider), key)
    }

    /// Resolve the model id to use for a provider: custom override,
    /// then selected default, then the built-in default
    pub fn configured_model(&self, provider: Provider) -> String {
        if let Some(custom) = self
            .store
            .get(&custom_model_key(provider))
            .filter(|m| !m.trim().is_empty())
        {
            debug!("Using custom model '{custom}' for {provider}");
            return custom;
        }
        self.store
            .get(&selected_model_key(provider))
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| provider.default_model().to_string())
    }

    pub fn set_selected_model(&self, provider: Provider, model: &str) -> Result<()> {
        self.store.set(&selected_model_key(provider), model)
    }

    /// Set or clear the custom model override; an empty id clears it
    pub fn set_custom_model(&self, provider: Provider, model: &str) -> Result<()> {
        if model.trim().is_empty() {
            self.store.remove(&custom_model_key(provider))
        } else {
            self.store.set(&custom_model_key(provider), model.trim())
        }
    }

    /// Build the dispatch descriptor for a provider from its resolved model
    pub fn descriptor(&self, provider: Provider) -> ModelDescriptor {
        let model = self.configured_model(provider);
        ModelDescriptor::new(model.clone(), model, provider)
    }

    pub fn consolidation_template(&self) -> String {
        self.store
            .get(CONSOLIDATION_TEMPLATE_KEY)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONSOLIDATION_TEMPLATE.to_string())
    }

    pub fn set_consolidation_template(&self, template: &str) -> Result<()> {
        self.store.set(CONSOLIDATION_TEMPLATE_KEY, template)
    }

    pub fn reset_consolidation_template(&self) -> Result<()> {
        self.store.remove(CONSOLIDATION_TEMPLATE_KEY)
    }

    pub fn theme(&self) -> Theme {
        self.store
            .get(THEME_KEY)
            .and_then(|t| t.parse().ok())
            .unwrap_or_default()
    }

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        self.store.set(THEME_KEY, theme.as_str())
    }
}
