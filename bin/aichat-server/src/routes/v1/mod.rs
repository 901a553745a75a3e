pub mod conversations;
pub mod profile;

use crate::error::ServerError;
use crate::middleware::auth;
use crate::state::AppState;
use utoipa::OpenApi;

use axum::extract::FromRequest;
use axum::{middleware, Router};
use std::sync::Arc;

/// `Json<T>` whose rejections come back as the usual `{"error": …}` 400.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ServerError))]
pub struct JsonBody<T>(pub T);

/// Routes nested under `/v1` (conversation history and profiles).
pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .merge(conversations::router())
        .merge(profile::router())
        .route_layer(middleware::from_fn_with_state(state, auth::check_api_token))
}

#[derive(OpenApi)]
#[openapi()]
pub struct V1Api;

pub fn api_docs() -> utoipa::openapi::OpenApi {
    let mut doc = V1Api::openapi();
    doc.merge(conversations::ConversationApi::openapi());
    doc.merge(profile::ProfileApi::openapi());
    doc
}
