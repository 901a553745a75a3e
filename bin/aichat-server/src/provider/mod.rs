//! External chat-completion provider.
//!
//! [`CompletionProvider`] is the seam between the `/chat` gateway and the
//! hosted model. The production implementation is
//! [`openai::OpenAiProvider`], which speaks the OpenAI-compatible
//! `POST /chat/completions` protocol; tests substitute a scripted fake.

pub mod openai;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// A single outbound message. Unlike [`aichat_types::Turn`] this may carry
/// the `"system"` role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderMessage {
    pub role: String,
    pub content: String,
}

impl ProviderMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self { role: role.into(), content: content.into() }
    }
}

/// Everything the provider needs for one completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ProviderMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Failures talking to the provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure (connect, TLS, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The provider's body was not a chat-completion object.
    #[error("invalid provider response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[async_trait]
pub trait CompletionProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Run one non-streaming completion.
    ///
    /// Returns `Ok(None)` when the provider answered successfully but the
    /// first choice carries no text.
    async fn complete(&self, request: CompletionRequest) -> Result<Option<String>, ProviderError>;
}
