//! Conversation and message persistence routes.
//!
//! Every handler runs on behalf of an [`AuthUser`]; conversations belonging
//! to someone else are indistinguishable from missing ones (404).

use std::sync::Arc;

use aichat_types::{
    Conversation, CreateConversationRequest, CreateMessageRequest, Message,
    UpdateConversationRequest, DEFAULT_CONVERSATION_TITLE,
};
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{ConversationRecord, ConversationStore, MessageRecord, MessageStore};
use crate::error::ServerError;
use crate::middleware::AuthUser;
use crate::state::AppState;

use super::JsonBody;

#[derive(OpenApi)]
#[openapi(
    paths(
        create_conversation,
        list_conversations,
        get_conversation,
        update_conversation,
        delete_conversation,
        create_message,
        list_messages
    ),
    components(schemas(
        Conversation,
        Message,
        CreateConversationRequest,
        UpdateConversationRequest,
        CreateMessageRequest
    ))
)]
pub struct ConversationApi;

/// Register conversation routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/conversations", post(create_conversation).get(list_conversations))
        .route(
            "/conversations/{id}",
            get(get_conversation)
                .patch(update_conversation)
                .delete(delete_conversation),
        )
        .route("/conversations/{id}/messages", post(create_message).get(list_messages))
}

async fn owned_conversation(
    state: &AppState,
    user: &AuthUser,
    id: &str,
) -> Result<ConversationRecord, ServerError> {
    state
        .store
        .get_conversation(&user.0, id)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("conversation '{id}' not found")))
}

// ── Conversation handlers ─────────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/v1/conversations",
    tag = "conversations",
    request_body = CreateConversationRequest,
    responses(
        (status = 200, description = "Conversation created", body = Conversation),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Authentication required"),
    )
)]
pub async fn create_conversation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    JsonBody(req): JsonBody<CreateConversationRequest>,
) -> Result<Json<Conversation>, ServerError> {
    req.validate()?;
    let title = req
        .title
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_CONVERSATION_TITLE.to_owned());

    let now = Utc::now();
    let record = ConversationRecord {
        id: Uuid::new_v4().to_string(),
        user_id: user.0,
        title,
        created_at: now,
        updated_at: now,
    };
    state.store.create_conversation(record.clone()).await?;
    info!(conversation_id = %record.id, "conversation created");
    Ok(Json(record.to_response()))
}

#[utoipa::path(
    get,
    path = "/v1/conversations",
    tag = "conversations",
    responses(
        (status = 200, description = "Conversations, most recently updated first", body = Vec<Conversation>),
        (status = 401, description = "Authentication required"),
    )
)]
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Vec<Conversation>>, ServerError> {
    let conversations = state.store.list_conversations(&user.0).await?;
    Ok(Json(conversations.iter().map(|c| c.to_response()).collect()))
}

#[utoipa::path(
    get,
    path = "/v1/conversations/{id}",
    tag = "conversations",
    params(("id" = String, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Conversation", body = Conversation),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Conversation not found"),
    )
)]
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, ServerError> {
    let record = owned_conversation(&state, &user, &id).await?;
    Ok(Json(record.to_response()))
}

#[utoipa::path(
    patch,
    path = "/v1/conversations/{id}",
    tag = "conversations",
    params(("id" = String, Path, description = "Conversation id")),
    request_body = UpdateConversationRequest,
    responses(
        (status = 200, description = "Conversation updated", body = Conversation),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Conversation not found"),
    )
)]
pub async fn update_conversation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateConversationRequest>,
) -> Result<Json<Conversation>, ServerError> {
    req.validate()?;
    let record = state
        .store
        .rename_conversation(&user.0, &id, &req.title)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("conversation '{id}' not found")))?;
    Ok(Json(record.to_response()))
}

#[utoipa::path(
    delete,
    path = "/v1/conversations/{id}",
    tag = "conversations",
    params(("id" = String, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Conversation deleted", body = serde_json::Value),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Conversation not found"),
    )
)]
pub async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    if !state.store.delete_conversation(&user.0, &id).await? {
        return Err(ServerError::NotFound(format!("conversation '{id}' not found")));
    }
    info!(conversation_id = %id, "conversation deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

// ── Message handlers ──────────────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/v1/conversations/{id}/messages",
    tag = "conversations",
    params(("id" = String, Path, description = "Conversation id")),
    request_body = CreateMessageRequest,
    responses(
        (status = 200, description = "Message appended", body = Message),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Conversation not found"),
    )
)]
pub async fn create_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<CreateMessageRequest>,
) -> Result<Json<Message>, ServerError> {
    let conversation = owned_conversation(&state, &user, &id).await?;
    let record = MessageRecord {
        id: Uuid::new_v4().to_string(),
        conversation_id: conversation.id,
        role: req.role,
        content: req.content,
        created_at: Utc::now(),
    };
    state.store.append_message(record.clone()).await?;
    Ok(Json(record.to_response()))
}

#[utoipa::path(
    get,
    path = "/v1/conversations/{id}/messages",
    tag = "conversations",
    params(("id" = String, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Messages, oldest first", body = Vec<Message>),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Conversation not found"),
    )
)]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<Message>>, ServerError> {
    let conversation = owned_conversation(&state, &user, &id).await?;
    let messages = state.store.list_messages(&conversation.id).await?;
    Ok(Json(messages.iter().map(|m| m.to_response()).collect()))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use crate::state::test_support::{test_state, Script, ScriptedProvider};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn app(overrides: &[(&str, &str)]) -> Router {
        let provider = ScriptedProvider::new(Script::Reply(None));
        crate::routes::build(test_state(provider, overrides).await)
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        let body = match body {
            Some(v) => {
                builder = builder.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn unauthenticated_requests_are_401() {
        let app = app(&[]).await;
        let (status, body) = call(&app, "GET", "/v1/conversations", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "authentication required");
    }

    #[tokio::test]
    async fn full_conversation_lifecycle() {
        let app = app(&[]).await;

        let (status, created) =
            call(&app, "POST", "/v1/conversations", Some("alice"), Some(json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["title"], "New Chat");
        assert_eq!(created["user_id"], "alice");
        let id = created["id"].as_str().unwrap().to_owned();

        let uri = format!("/v1/conversations/{id}/messages");
        for (role, content) in [("user", "Hi"), ("assistant", "Hello!")] {
            let (status, _) = call(
                &app,
                "POST",
                &uri,
                Some("alice"),
                Some(json!({"role": role, "content": content})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (_, messages) = call(&app, "GET", &uri, Some("alice"), None).await;
        let contents: Vec<&str> = messages
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["content"].as_str().unwrap())
            .collect();
        assert_eq!(contents, vec!["Hi", "Hello!"]);

        let (status, renamed) = call(
            &app,
            "PATCH",
            &format!("/v1/conversations/{id}"),
            Some("alice"),
            Some(json!({"title": "Hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(renamed["title"], "Hi");

        let (status, _) =
            call(&app, "DELETE", &format!("/v1/conversations/{id}"), Some("alice"), None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, listed) = call(&app, "GET", "/v1/conversations", Some("alice"), None).await;
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn foreign_conversations_look_missing() {
        let app = app(&[]).await;
        let (_, created) =
            call(&app, "POST", "/v1/conversations", Some("alice"), Some(json!({"title": "mine"}))).await;
        let id = created["id"].as_str().unwrap();

        let (status, _) =
            call(&app, "GET", &format!("/v1/conversations/{id}/messages"), Some("bob"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(
            &app,
            "POST",
            &format!("/v1/conversations/{id}/messages"),
            Some("bob"),
            Some(json!({"role": "user", "content": "sneaky"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_title_update_is_rejected() {
        let app = app(&[]).await;
        let (_, created) = call(&app, "POST", "/v1/conversations", Some("alice"), Some(json!({}))).await;
        let id = created["id"].as_str().unwrap();
        let (status, _) = call(
            &app,
            "PATCH",
            &format!("/v1/conversations/{id}"),
            Some("alice"),
            Some(json!({"title": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_json_gets_error_envelope() {
        let app = app(&[]).await;
        for (content_type, raw) in [
            (Some("application/json"), "{oops"),
            (Some("application/json"), r#"{"title": 7}"#),
            (None, r#"{"title": "no header"}"#),
        ] {
            let mut builder = Request::builder()
                .method("POST")
                .uri("/v1/conversations")
                .header("x-user-id", "alice");
            if let Some(content_type) = content_type {
                builder = builder.header("content-type", content_type);
            }
            let resp = app.clone().oneshot(builder.body(Body::from(raw)).unwrap()).await.unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "payload {raw:?}");
            let bytes = resp.into_body().collect().await.unwrap().to_bytes();
            let body: Value = serde_json::from_slice(&bytes).unwrap();
            assert!(!body["error"].as_str().unwrap().is_empty());
        }

        let (_, listed) = call(&app, "GET", "/v1/conversations", Some("alice"), None).await;
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn api_token_guards_v1_routes() {
        let app = app(&[("AICHAT_API_TOKEN", "s3cret")]).await;
        let (status, _) = call(&app, "GET", "/v1/conversations", Some("alice"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/v1/conversations")
                    .header("x-user-id", "alice")
                    .header("authorization", "Bearer s3cret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
