//! Request authentication.
//!
//! Identity is established upstream by the hosted auth/session provider,
//! which forwards the verified user id in a configurable header
//! (`AICHAT_USER_HEADER`, default `x-user-id`). When `AICHAT_API_TOKEN` is
//! set, the forwarding proxy must also present it as a bearer token so the
//! header cannot be forged by clients reaching the server directly.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ServerError;
use crate::state::AppState;

/// The authenticated user on whose behalf a request runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub String);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(state.config.user_header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| AuthUser(v.to_owned()))
            .ok_or_else(|| ServerError::Unauthorized("authentication required".into()))
    }
}

/// Reject requests that do not carry the configured proxy token.
pub async fn check_api_token(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(expected_token) = state.config.api_token.as_deref() {
        let provided = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if provided != Some(expected_token) {
            return ServerError::Unauthorized("unauthorised".into()).into_response();
        }
    }
    next.run(req).await
}
