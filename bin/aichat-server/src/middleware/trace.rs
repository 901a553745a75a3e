//! Per-request tracing.
//!
//! Every request runs inside an `http_request` span carrying a trace id
//! (taken from `x-trace-id` when the caller sent a valid UUID) and the
//! forwarded user id. Bodies are never logged: they hold conversation text.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::state::AppState;

pub static X_TRACE_ID: &str = "x-trace-id";

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers.get(header::CONTENT_LENGTH)?.to_str().ok()?.parse().ok()
}

pub async fn trace_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let started = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);
    let trace_header = HeaderValue::from_str(&trace_id.to_string()).ok();

    let user = req
        .headers()
        .get(state.config.user_header.as_str())
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_owned();

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.uri().path(),
        user = %user,
    );

    async move {
        debug!(content_length = ?content_length(req.headers()), "request started");
        if let Some(value) = &trace_header {
            req.headers_mut().insert(X_TRACE_ID, value.clone());
        }

        let mut response = next.run(req).await;
        if let Some(value) = trace_header {
            response.headers_mut().insert(X_TRACE_ID, value);
        }

        let status = response.status().as_u16();
        let latency_ms = started.elapsed().as_millis();
        if response.status().is_server_error() {
            warn!(status, latency_ms, "response finished");
        } else {
            info!(status, latency_ms, "response finished");
        }
        response
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::state::test_support::{test_state, Script, ScriptedProvider};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;
    use tracing_test::traced_test;

    async fn app() -> Router {
        let state = test_state(ScriptedProvider::new(Script::Reply(None)), &[]).await;
        Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(axum::middleware::from_fn_with_state(state, trace_middleware))
    }

    #[tokio::test]
    #[traced_test]
    async fn generates_trace_id_and_logs_status() {
        let resp = app()
            .await
            .oneshot(
                Request::builder()
                    .uri("/ping")
                    .header("x-user-id", "alice")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let id = resp.headers().get(X_TRACE_ID).unwrap().to_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert!(logs_contain("response finished"));
        assert!(logs_contain("alice"));
    }

    #[tokio::test]
    async fn propagates_valid_incoming_trace_id() {
        let incoming = Uuid::new_v4().to_string();
        let resp = app()
            .await
            .oneshot(
                Request::builder()
                    .uri("/ping")
                    .header(X_TRACE_ID, &incoming)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.headers().get(X_TRACE_ID).unwrap(), incoming.as_str());
    }

    #[tokio::test]
    async fn replaces_malformed_trace_id() {
        let resp = app()
            .await
            .oneshot(
                Request::builder()
                    .uri("/ping")
                    .header(X_TRACE_ID, "not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let id = resp.headers().get(X_TRACE_ID).unwrap().to_str().unwrap();
        assert_ne!(id, "not-a-uuid");
        assert!(Uuid::parse_str(id).is_ok());
    }
}
