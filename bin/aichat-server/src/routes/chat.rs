//! Completion gateway (`POST /chat`).
//!
//! Validates the caller's turns, prepends the fixed system instruction and
//! forwards everything to the completion provider in a single synchronous
//! call. The gateway is stateless: it neither reads nor writes conversation
//! history, correlation is the caller's business.

use std::sync::Arc;

use aichat_types::{ChatRequest, ChatResponse, ErrorBody, Role, Turn};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use tracing::{debug, info};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::provider::{CompletionProvider, CompletionRequest, ProviderMessage};
use crate::state::AppState;

pub const SYSTEM_PROMPT: &str = "You are a helpful AI assistant. Respond in a friendly, \
conversational manner. Be helpful and provide accurate information.";
pub const TEMPERATURE: f32 = 0.7;
pub const MAX_TOKENS: u32 = 1000;

#[derive(OpenApi)]
#[openapi(
    paths(chat),
    components(schemas(ChatRequest, ChatResponse, ErrorBody, Turn, Role))
)]
pub struct ChatApi;

/// Register the gateway route. Callers resend the whole history each turn,
/// so the body is not size-limited.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat).layer(DefaultBodyLimit::disable()))
}

/// Generate the assistant's next turn (`POST /chat`).
///
/// The body is read raw so that a missing, unparsable or wrongly-shaped
/// payload all produce the same `400 {"error":"Messages array is required"}`.
#[utoipa::path(
    post,
    path = "/chat",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, description = "Missing or malformed messages", body = ErrorBody),
        (status = 500, description = "Provider failed or returned nothing", body = ErrorBody),
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ChatResponse>, ServerError> {
    let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let request = ChatRequest::from_value(&payload)?;

    debug!(turns = request.messages.len(), "chat request");
    let message = complete_turns(state.provider.as_ref(), request.messages).await?;
    info!(output_len = message.content.len(), "chat completion done");

    Ok(Json(ChatResponse { message }))
}

/// Build the outbound request and map the provider's answer to a turn.
pub async fn complete_turns(
    provider: &dyn CompletionProvider,
    turns: Vec<Turn>,
) -> Result<Turn, ServerError> {
    let messages = std::iter::once(ProviderMessage::new("system", SYSTEM_PROMPT))
        .chain(
            turns
                .into_iter()
                .map(|t| ProviderMessage::new(t.role.to_string(), t.content)),
        )
        .collect();

    let content = provider
        .complete(CompletionRequest {
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        })
        .await?
        .filter(|text| !text.is_empty())
        .ok_or(ServerError::EmptyCompletion)?;

    Ok(Turn::assistant(content))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
