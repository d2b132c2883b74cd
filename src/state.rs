//! Application state: the in-memory session store, prompt templates, and the
//! optional OpenRouter client.
//!
//! Sessions are keyed by id and mutated strictly under the store's write
//! lock: each user action is one atomic step, and the AI calls happen
//! outside the lock (see `logic.rs`).

use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::annotations::group_annotations;
use crate::config::{load_config_from_env, Prompts};
use crate::domain::Activity;
use crate::error::QuizError;
use crate::openrouter::OpenRouter;
use crate::seeds::{example_annotation_rows, example_source_text};
use crate::session::EditSession;
use uuid::Uuid;

/// Id of the built-in demo session created at startup.
pub const DEMO_SESSION_ID: &str = "demo";

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<String, EditSession>>>,
    pub client: Option<OpenRouter>,
    pub prompts: Prompts,
}

impl AppState {
    /// Build state from env: load prompt config, seed the demo session,
    /// init the OpenRouter client if an API key is present.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let prompts = load_config_from_env()
            .map(|c| c.prompts)
            .unwrap_or_default();

        let mut sessions = HashMap::new();
        let demo_rows = example_annotation_rows();
        let outcome = group_annotations(&demo_rows);
        let demo = EditSession::new(
            DEMO_SESSION_ID.to_string(),
            Activity::FiveW,
            example_source_text(),
            outcome.groups,
        );
        sessions.insert(demo.id.clone(), demo);
        info!(target: "session", id = DEMO_SESSION_ID, "Seeded demo session");

        let client = OpenRouter::from_env();
        if let Some(c) = &client {
            info!(target: "quaderno_backend", base_url = %c.base_url, model = %c.model, "OpenRouter enabled.");
        } else {
            info!(target: "quaderno_backend", "OpenRouter disabled (no OPENROUTER_API_KEY). Generation and validation will be unavailable.");
        }

        Self {
            sessions: Arc::new(RwLock::new(sessions)),
            client,
            prompts,
        }
    }

    /// Store a new session and return its id.
    #[instrument(level = "debug", skip(self, session), fields(id = %session.id))]
    pub async fn insert_session(&self, session: EditSession) -> String {
        let id = session.id.clone();
        self.sessions.write().await.insert(id.clone(), session);
        id
    }

    pub fn fresh_session_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Run a closure against one session under the write lock.
    /// The closure must stay synchronous; AI calls go outside the lock.
    pub async fn with_session<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut EditSession) -> R,
    ) -> Result<R, QuizError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(session) => Ok(f(session)),
            None => Err(QuizError::UnknownSession(id.to_string())),
        }
    }

    /// Read-only variant of `with_session`.
    pub async fn read_session<R>(
        &self,
        id: &str,
        f: impl FnOnce(&EditSession) -> R,
    ) -> Result<R, QuizError> {
        let sessions = self.sessions.read().await;
        match sessions.get(id) {
            Some(session) => Ok(f(session)),
            None => Err(QuizError::UnknownSession(id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_session_is_seeded_at_startup() {
        let state = AppState::new();
        let activity = state
            .read_session(DEMO_SESSION_ID, |s| s.activity)
            .await
            .unwrap();
        assert_eq!(activity, Activity::FiveW);
    }

    #[tokio::test]
    async fn unknown_session_is_a_loud_error() {
        let state = AppState::new();
        let err = state.read_session("nope", |_| ()).await.unwrap_err();
        assert!(matches!(err, QuizError::UnknownSession(_)));
    }
}
