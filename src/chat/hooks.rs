//! Collaborator seams driven by the connection manager.
//!
//! The manager reacts to lifecycle events by calling into these traits.
//! Embedders wire them to their UI; every seam defaults to a no-op, so a
//! headless client needs none of them.

use std::collections::HashMap;
use std::sync::Arc;

use bon::Builder;
use secrecy::SecretString;

use super::types::ChatRecord;
use crate::TOKEN_PARAM;

/// Read-only view of the launch parameters the embedder was opened with.
pub trait LaunchParams: Send + Sync {
    /// Look up a single query parameter.
    fn get(&self, key: &str) -> Option<String>;

    /// The channel authentication token, when present.
    fn token(&self) -> Option<SecretString> {
        self.get(TOKEN_PARAM).map(SecretString::from)
    }
}

/// Launch parameters parsed from a URL query string.
#[derive(Clone, Debug, Default)]
pub struct QueryParams {
    values: HashMap<String, String>,
}

impl QueryParams {
    /// Parse `key=value` pairs from a raw query string (no leading `?`).
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let values = url::form_urlencoded::parse(query.as_bytes())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        Self { values }
    }
}

impl LaunchParams for QueryParams {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Chat transcript maintained by the embedder.
pub trait ChatHistory: Send + Sync {
    /// Roll back the exchange that was in flight when the channel dropped.
    fn remove_last_chat(&self);

    /// Append a record to the transcript.
    fn append_message(&self, record: ChatRecord);
}

/// Input affordances of the embedding UI.
pub trait UiState: Send + Sync {
    fn set_input_disabled(&self, disabled: bool);
}

/// Event vocabulary shared with the embedding frame.
///
/// The frame probes the embedder with `Ping` and expects a `Pong`
/// acknowledgment carrying a session id; that handshake lives with the
/// embedder. The manager itself only ever emits [`EmbedEvent::Closed`].
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbedEvent {
    Ping,
    Pong,
    Connected,
    Closed,
    KeyboardEvent,
}

/// Notifier for the embedding frame.
pub trait EmbedNotifier: Send + Sync {
    fn notify(&self, event: EmbedEvent);
}

/// Blocking dialogs surfaced to the user.
pub trait Dialogs: Send + Sync {
    /// Fatal error dialog
    fn error(&self, title: &str, message: &str);

    /// Non-fatal warning dialog
    fn warning(&self, title: &str, message: &str);
}

/// No-op collaborator used wherever the embedder leaves a seam unwired.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default)]
pub struct Unwired;

impl ChatHistory for Unwired {
    fn remove_last_chat(&self) {}

    fn append_message(&self, _record: ChatRecord) {}
}

impl UiState for Unwired {
    fn set_input_disabled(&self, _disabled: bool) {}
}

impl EmbedNotifier for Unwired {
    fn notify(&self, _event: EmbedEvent) {}
}

impl Dialogs for Unwired {
    fn error(&self, _title: &str, _message: &str) {}

    fn warning(&self, _title: &str, _message: &str) {}
}

/// Bundle of collaborator handles the manager drives.
///
/// ```
/// use chat_client_sdk::chat::hooks::Hooks;
///
/// let hooks = Hooks::builder().build(); // every seam unwired
/// ```
#[non_exhaustive]
#[derive(Builder, Clone)]
pub struct Hooks {
    /// Transcript collaborator
    #[builder(default = Arc::new(Unwired))]
    pub history: Arc<dyn ChatHistory>,
    /// Input-state collaborator
    #[builder(default = Arc::new(Unwired))]
    pub ui: Arc<dyn UiState>,
    /// Embedding-frame notifier
    #[builder(default = Arc::new(Unwired))]
    pub embed: Arc<dyn EmbedNotifier>,
    /// User-facing dialogs
    #[builder(default = Arc::new(Unwired))]
    pub dialogs: Arc<dyn Dialogs>,
}

impl Default for Hooks {
    fn default() -> Self {
        Self::builder().build()
    }
}
