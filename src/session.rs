//! Session document and its JSON-file store.
//!
//! The document is plain JSON: `conversationId`, `sessionStarted`,
//! `totalInteractions`, `conversationHistory` and an optional `lastRunState`.
//! [`SessionStore`] is passed explicitly into the orchestrator; nothing here
//! is global.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::agent::message::{ChatMessage, Role};
use crate::error::SessionError;

/// State threaded through one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Stable id for the life of the document.
    pub conversation_id: String,
    /// When the session was created.
    #[serde(rename = "sessionStarted")]
    pub started_at: DateTime<Utc>,
    /// Completed research calls.
    #[serde(default)]
    pub total_interactions: u64,
    /// Transcript of the latest research call, passed back to the model.
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
    /// Opaque continuation token of the latest research call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_state: Option<Value>,
}

impl SessionState {
    /// Starts a fresh session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            conversation_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            total_interactions: 0,
            conversation_history: Vec::new(),
            last_run_state: None,
        }
    }

    /// Records one completed research call.
    ///
    /// Increments the counter, replaces the history with `transcript`
    /// (bounded by `max_history`), and overwrites the run state.
    pub fn record_interaction(
        &mut self,
        transcript: Vec<ChatMessage>,
        max_history: usize,
        run_state: Value,
    ) {
        self.total_interactions = self.total_interactions.saturating_add(1);
        self.conversation_history = trim_history(transcript, max_history);
        self.last_run_state = Some(run_state);
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps at most the newest `max` messages of `messages`.
///
/// The kept window always starts at a user message, so an assistant tool
/// call is never separated from its tool results.
#[must_use]
pub fn trim_history(mut messages: Vec<ChatMessage>, max: usize) -> Vec<ChatMessage> {
    let mut start = messages.len().saturating_sub(max);
    while start < messages.len() && messages[start].role != Role::User {
        start += 1;
    }
    messages.drain(..start);
    messages
}

/// JSON file holding one [`SessionState`].
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Creates a store at `path`. Nothing is read until [`Self::load`].
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the session document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if the document exists on disk.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Loads the session, creating and saving a new one if absent.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if an existing file cannot be read or
    /// parsed. Failing to write a new session is logged, not returned.
    pub fn load(&self) -> Result<SessionState, SessionError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => {
                let state: SessionState =
                    serde_json::from_str(&text).map_err(|source| SessionError::Json {
                        path: self.path.clone(),
                        source,
                    })?;
                debug!(
                    path = %self.path.display(),
                    conversation_id = state.conversation_id,
                    interactions = state.total_interactions,
                    "session resumed"
                );
                Ok(state)
            }
            Err(e) if is_absent(&e) => {
                let state = SessionState::new();
                match self.save(&state) {
                    Ok(()) => info!(
                        path = %self.path.display(),
                        conversation_id = state.conversation_id,
                        "session created"
                    ),
                    Err(e) => warn!(error = %e, "new session not persisted"),
                }
                Ok(state)
            }
            Err(source) => Err(self.io_error(source)),
        }
    }

    /// Writes `state` atomically (temp file, then rename).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] on serialization or filesystem failure.
    pub fn save(&self, state: &SessionState) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_string_pretty(state).map_err(|source| SessionError::Json {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    /// Deletes the document. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the file exists but cannot be removed.
    pub fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "session cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn io_error(&self, source: std::io::Error) -> SessionError {
        SessionError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// No document at the path: the file or one of its parents is missing.
fn is_absent(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::{
        assistant_message, assistant_tool_calls_message, tool_message, user_message,
    };
    use crate::agent::tool::ToolCall;
    use serde_json::json;
    use tempfile::TempDir;

    fn store() -> (TempDir, SessionStore) {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let store = SessionStore::new(dir.path().join("nested").join("session.json"));
        (dir, store)
    }

    #[test]
    fn test_load_creates_when_absent() {
        let (_dir, store) = store();
        assert!(!store.exists());
        let state = store.load().unwrap_or_else(|e| unreachable!("{e}"));
        assert!(store.exists());
        assert_eq!(state.total_interactions, 0);
        let again = store.load().unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(again.conversation_id, state.conversation_id);
    }

    #[test]
    fn test_load_survives_unwritable_location() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, "file").unwrap_or_else(|_| unreachable!());
        let store = SessionStore::new(blocker.join("session.json"));

        let state = store.load().unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(state.total_interactions, 0);
        assert!(!store.exists());
        assert!(store.save(&state).is_err());
    }

    #[test]
    fn test_document_field_names() {
        let (_dir, store) = store();
        let mut state = SessionState::new();
        state.record_interaction(
            vec![user_message("q"), assistant_message("a")],
            10,
            json!({"specialist": "general_search"}),
        );
        store.save(&state).unwrap_or_else(|e| unreachable!("{e}"));

        let text = std::fs::read_to_string(store.path()).unwrap_or_default();
        let doc: Value = serde_json::from_str(&text).unwrap_or_default();
        assert!(doc["conversationId"].is_string());
        assert!(doc["sessionStarted"].is_string());
        assert_eq!(doc["totalInteractions"], 1);
        assert_eq!(doc["conversationHistory"].as_array().map(Vec::len), Some(2));
        assert_eq!(doc["lastRunState"]["specialist"], "general_search");
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (_dir, store) = store();
        store.load().unwrap_or_else(|e| unreachable!("{e}"));
        assert!(store.clear().is_ok());
        assert!(!store.exists());
        assert!(store.clear().is_ok());
    }

    #[test]
    fn test_corrupt_document_is_an_error() {
        let (_dir, store) = store();
        store.save(&SessionState::new()).unwrap_or_else(|e| unreachable!("{e}"));
        std::fs::write(store.path(), "{not json").unwrap_or_else(|_| unreachable!());
        assert!(matches!(store.load(), Err(SessionError::Json { .. })));
    }

    #[test]
    fn test_trim_history_never_splits_tool_exchange() {
        let call = ToolCall {
            id: "c1".to_string(),
            name: "find_entity".to_string(),
            arguments: "{}".to_string(),
        };
        let messages = vec![
            user_message("first"),
            assistant_message("one"),
            user_message("second"),
            assistant_tool_calls_message("", vec![call]),
            tool_message("c1", "[]"),
            assistant_message("two"),
        ];

        // Window of 3 would start at the tool message; it moves forward past
        // the whole exchange instead of keeping an orphan result.
        let trimmed = trim_history(messages.clone(), 3);
        assert!(trimmed.is_empty());

        let trimmed = trim_history(messages.clone(), 4);
        assert_eq!(trimmed.len(), 4);
        assert_eq!(trimmed[0].content, "second");

        assert_eq!(trim_history(messages.clone(), 100), messages);
        assert!(trim_history(messages, 0).is_empty());
    }
}
