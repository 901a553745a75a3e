//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::config::Config;
use crate::entities::SqliteStore;
use crate::provider::CompletionProvider;

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Conversation, message and profile persistence.
    pub store: Arc<SqliteStore>,
    /// Upstream chat-completion provider.
    pub provider: Arc<dyn CompletionProvider>,
}
