//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are automatically converted
//! to a JSON-body HTTP response with an appropriate status code.
//!
//! Database and internal errors are logged with full detail but only a
//! generic message is returned. Provider failures are the exception: the
//! `/chat` contract returns the provider's message as `details`.

use aichat_types::{ErrorBody, TurnRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::provider::ProviderError;

/// All errors that can occur in the aichat-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Propagated from the SQLite store.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The caller referenced a resource that does not exist (or is not theirs).
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No authenticated user accompanied the request.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The provider answered but produced no text.
    #[error("no response generated")]
    EmptyCompletion,

    /// The provider call itself failed.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// An unclassified internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            // Client-facing errors: expose the message directly.
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, plain(m)),
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, plain(m)),
            ServerError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, plain(m)),

            ServerError::EmptyCompletion => {
                error!("completion provider returned no content");
                (StatusCode::INTERNAL_SERVER_ERROR, plain("No response generated"))
            }
            ServerError::Provider(e) => {
                error!(error = %e, "completion provider failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "Failed to generate response".to_owned(),
                        details: Some(e.to_string()),
                    },
                )
            }

            // Internal errors: log the full detail, return a generic message.
            ServerError::Database(e) => {
                error!(error = %e, "database error");
                (StatusCode::INTERNAL_SERVER_ERROR, plain("internal server error"))
            }
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, plain("internal server error"))
            }
        };
        (status, Json(body)).into_response()
    }
}

fn plain(message: &str) -> ErrorBody {
    ErrorBody { error: message.to_owned(), details: None }
}

impl From<TurnRejection> for ServerError {
    fn from(e: TurnRejection) -> Self {
        ServerError::BadRequest(e.to_string())
    }
}

impl From<JsonRejection> for ServerError {
    fn from(e: JsonRejection) -> Self {
        ServerError::BadRequest(e.body_text())
    }
}

impl From<validator::ValidationErrors> for ServerError {
    fn from(e: validator::ValidationErrors) -> Self {
        ServerError::BadRequest(e.to_string())
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(e: anyhow::Error) -> Self {
        // Log the full error chain before discarding it so that diagnostic
        // detail is preserved in the server logs.
        error!(error = ?e, "converting anyhow error to ServerError::Internal");
        ServerError::Internal(e.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn render(err: ServerError) -> (StatusCode, Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn provider_errors_carry_details() {
        let (status, body) = render(ServerError::Provider(ProviderError::Status {
            status: 503,
            body: "overloaded".into(),
        }))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to generate response");
        assert!(body["details"].as_str().unwrap().contains("overloaded"));
    }

    #[tokio::test]
    async fn database_errors_are_not_leaked() {
        let (status, body) = render(ServerError::Database(sqlx::Error::RowNotFound)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal server error");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn missing_messages_maps_to_400() {
        let (status, body) = render(TurnRejection::MissingMessages.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Messages array is required");
    }
}
