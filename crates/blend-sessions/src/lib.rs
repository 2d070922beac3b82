//! blend-sessions: conversation session persistence
//!
//! One session is one independent conversation thread: its transcript,
//! its provider selection, and the cached per-model and consolidated
//! results of the last send. Sessions live as a JSON array under a
//! single key of the shared key-value store, plus one key for the
//! active-session pointer. Last write wins; corrupt storage degrades
//! to an empty list.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use blend_core::store::KvStore;
use blend_core::types::{ChatMessage, ChatRole, ModelResponse, Provider};

const SESSIONS_KEY: &str = "blend_speak_sessions";
const ACTIVE_SESSION_KEY: &str = "blend_speak_active_session";

/// Titles are truncated to this many characters
const MAX_TITLE_LEN: usize = 40;

/// One message of a stored transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// One persisted conversation thread.
///
/// Serialized camelCase; this is also the exported session file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSession {
    pub id: String,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<SessionMessage>,
    #[serde(default)]
    pub selected_providers: Vec<Provider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_responses: Option<HashMap<String, ModelResponse>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consolidated_response: Option<String>,
}

impl ConversationSession {
    /// A fresh, empty session
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: "New Conversation".to_string(),
            timestamp: Utc::now(),
            messages: Vec::new(),
            selected_providers: Vec::new(),
            model_responses: None,
            consolidated_response: None,
        }
    }

    /// Append a transcript message, stamping id and timestamp
    pub fn append_message(&mut self, role: ChatRole, content: impl Into<String>) {
        self.messages.push(SessionMessage {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        });
    }

    /// Record the settled batch of one send, keyed by provider
    pub fn record_responses(&mut self, batch: &[(Provider, ModelResponse)]) {
        let map = batch
            .iter()
            .map(|(provider, response)| (provider.to_string(), response.clone()))
            .collect();
        self.model_responses = Some(map);
    }

    /// The wire transcript to send to providers
    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .map(|m| ChatMessage {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic session title from the first user message: the first
/// 40 characters, with a trailing ellipsis when truncated
pub fn generate_session_title(first_message: &str) -> String {
    if first_message.chars().count() > MAX_TITLE_LEN {
        let truncated: String = first_message.chars().take(MAX_TITLE_LEN).collect();
        format!("{truncated}...")
    } else {
        first_message.to_string()
    }
}

/// CRUD over the stored session list and the active-session pointer
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KvStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// The stored session list; absent or unparsable storage degrades
    /// to an empty list, never an error
    pub fn load(&self) -> Vec<ConversationSession> {
        let Some(stored) = self.store.get(SESSIONS_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str(&stored) {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!("Stored sessions are unparsable, starting empty: {e}");
                Vec::new()
            }
        }
    }

    fn save(&self, sessions: &[ConversationSession]) -> Result<()> {
        let encoded = serde_json::to_string(sessions).context("Failed to encode sessions")?;
        self.store.set(SESSIONS_KEY, &encoded)
    }

    /// Upsert by id: replace in place when the id exists, else prepend
    pub fn update(&self, session: &ConversationSession) -> Result<()> {
        let mut sessions = self.load();
        match sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session.clone(),
            None => sessions.insert(0, session.clone()),
        }
        debug!(id = %session.id, "Session updated");
        self.save(&sessions)
    }

    /// Remove by id. Re-selecting a new active session afterwards is
    /// the caller's responsibility.
    pub fn delete(&self, id: &str) -> Result<()> {
        let mut sessions = self.load();
        sessions.retain(|s| s.id != id);
        info!(id, "Session deleted");
        self.save(&sessions)
    }

    /// Change a session's title; no-op when the id is unknown
    pub fn rename(&self, id: &str, new_title: &str) -> Result<()> {
        let mut sessions = self.load();
        if let Some(session) = sessions.iter_mut().find(|s| s.id == id) {
            session.title = new_title.to_string();
            self.save(&sessions)?;
        }
        Ok(())
    }

    /// Write one session as pretty-printed JSON to
    /// `conversation-<id>.json` under `dir`; `None` when the id is
    /// unknown
    pub fn export(&self, id: &str, dir: &Path) -> Result<Option<PathBuf>> {
        let sessions = self.load();
        let Some(session) = sessions.iter().find(|s| s.id == id) else {
            return Ok(None);
        };

        let encoded =
            serde_json::to_string_pretty(session).context("Failed to encode session")?;
        let path = dir.join(format!("conversation-{}.json", session.id));
        std::fs::write(&path, encoded)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(id, path = %path.display(), "Session exported");
        Ok(Some(path))
    }

    /// The stored active-session pointer, unvalidated
    pub fn active_session_id(&self) -> Option<String> {
        self.store.get(ACTIVE_SESSION_KEY)
    }

    pub fn set_active_session_id(&self, id: &str) -> Result<()> {
        self.store.set(ACTIVE_SESSION_KEY, id)
    }

    /// The active session, validated against the list: a stale pointer
    /// falls back to the first stored session
    pub fn active_session(&self) -> Option<ConversationSession> {
        let sessions = self.load();
        if let Some(id) = self.active_session_id()
            && let Some(session) = sessions.iter().find(|s| s.id == id)
        {
            return Some(session.clone());
        }
        sessions.into_iter().next()
    }
}
