//! Conversation persistence as seen from the client.
//!
//! [`HttpConversationStore`] talks to the `/v1` routes of `aichat-server`,
//! identifying the user through the configured user header.
//! [`MemoryConversationStore`] keeps everything in process.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use aichat_types::{
    Conversation, CreateConversationRequest, CreateMessageRequest, Message, Role,
    UpdateConversationRequest,
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::error::ClientError;

#[async_trait]
pub trait ConversationStore: Send + Sync + Debug {
    async fn create_conversation(&self, user_id: &str, title: &str) -> Result<Conversation, ClientError>;

    /// Most recently updated first.
    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>, ClientError>;

    async fn get_conversation(&self, user_id: &str, id: &str) -> Result<Conversation, ClientError>;

    async fn update_conversation_title(
        &self,
        user_id: &str,
        id: &str,
        title: &str,
    ) -> Result<Conversation, ClientError>;

    async fn delete_conversation(&self, user_id: &str, id: &str) -> Result<(), ClientError>;

    async fn append_message(
        &self,
        user_id: &str,
        conversation_id: &str,
        role: Role,
        content: &str,
    ) -> Result<Message, ClientError>;

    /// Oldest first.
    async fn list_messages(&self, user_id: &str, conversation_id: &str) -> Result<Vec<Message>, ClientError>;
}

// ── HTTP ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HttpConversationStore {
    base_url: String,
    user_header: String,
    client: Client,
}

impl HttpConversationStore {
    pub fn new(base_url: &str, user_header: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .user_agent(concat!("aichat-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            user_header: user_header.to_owned(),
            client,
        })
    }

    fn request(&self, method: Method, user_id: &str, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/v1{}", self.base_url, path))
            .header(self.user_header.as_str(), user_id)
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let resp = builder.send().await?;
        if !resp.status().is_success() {
            return Err(ClientError::from_response(resp).await);
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl ConversationStore for HttpConversationStore {
    async fn create_conversation(&self, user_id: &str, title: &str) -> Result<Conversation, ClientError> {
        let body = CreateConversationRequest { title: Some(title.to_owned()) };
        self.send(self.request(Method::POST, user_id, "/conversations").json(&body)).await
    }

    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>, ClientError> {
        self.send(self.request(Method::GET, user_id, "/conversations")).await
    }

    async fn get_conversation(&self, user_id: &str, id: &str) -> Result<Conversation, ClientError> {
        self.send(self.request(Method::GET, user_id, &format!("/conversations/{id}"))).await
    }

    async fn update_conversation_title(
        &self,
        user_id: &str,
        id: &str,
        title: &str,
    ) -> Result<Conversation, ClientError> {
        let body = UpdateConversationRequest { title: title.to_owned() };
        self.send(self.request(Method::PATCH, user_id, &format!("/conversations/{id}")).json(&body))
            .await
    }

    async fn delete_conversation(&self, user_id: &str, id: &str) -> Result<(), ClientError> {
        let _: serde_json::Value =
            self.send(self.request(Method::DELETE, user_id, &format!("/conversations/{id}"))).await?;
        Ok(())
    }

    async fn append_message(
        &self,
        user_id: &str,
        conversation_id: &str,
        role: Role,
        content: &str,
    ) -> Result<Message, ClientError> {
        let body = CreateMessageRequest { role, content: content.to_owned() };
        let path = format!("/conversations/{conversation_id}/messages");
        self.send(self.request(Method::POST, user_id, &path).json(&body)).await
    }

    async fn list_messages(&self, user_id: &str, conversation_id: &str) -> Result<Vec<Message>, ClientError> {
        let path = format!("/conversations/{conversation_id}/messages");
        self.send(self.request(Method::GET, user_id, &path)).await
    }
}

// ── In-memory ────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Tables {
    conversations: Vec<Conversation>,
    messages: Vec<Message>,
    next_id: u64,
}

impl Tables {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn owned_mut(&mut self, user_id: &str, id: &str) -> Result<&mut Conversation, ClientError> {
        self.conversations
            .iter_mut()
            .find(|c| c.id == id && c.user_id == user_id)
            .ok_or_else(|| ClientError::Storage(format!("conversation '{id}' not found")))
    }
}

#[derive(Debug, Default)]
pub struct MemoryConversationStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, to exercise error paths.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_writable(&self) -> Result<(), ClientError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ClientError::Storage("store is read-only".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn create_conversation(&self, user_id: &str, title: &str) -> Result<Conversation, ClientError> {
        self.check_writable()?;
        let mut tables = self.tables();
        let now = Utc::now();
        let conversation = Conversation {
            id: tables.next_id("conv"),
            user_id: user_id.to_owned(),
            title: title.to_owned(),
            created_at: now,
            updated_at: now,
        };
        tables.conversations.push(conversation.clone());
        Ok(conversation)
    }

    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>, ClientError> {
        let mut list: Vec<Conversation> = self
            .tables()
            .conversations
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        // Stable sort keeps the later-created conversation first on ties.
        list.reverse();
        list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(list)
    }

    async fn get_conversation(&self, user_id: &str, id: &str) -> Result<Conversation, ClientError> {
        Ok(self.tables().owned_mut(user_id, id)?.clone())
    }

    async fn update_conversation_title(
        &self,
        user_id: &str,
        id: &str,
        title: &str,
    ) -> Result<Conversation, ClientError> {
        self.check_writable()?;
        let mut tables = self.tables();
        let conversation = tables.owned_mut(user_id, id)?;
        conversation.title = title.to_owned();
        conversation.updated_at = Utc::now();
        Ok(conversation.clone())
    }

    async fn delete_conversation(&self, user_id: &str, id: &str) -> Result<(), ClientError> {
        self.check_writable()?;
        let mut tables = self.tables();
        tables.owned_mut(user_id, id)?;
        tables.conversations.retain(|c| c.id != id);
        tables.messages.retain(|m| m.conversation_id != id);
        Ok(())
    }

    async fn append_message(
        &self,
        user_id: &str,
        conversation_id: &str,
        role: Role,
        content: &str,
    ) -> Result<Message, ClientError> {
        self.check_writable()?;
        let mut tables = self.tables();
        let now = Utc::now();
        tables.owned_mut(user_id, conversation_id)?.updated_at = now;
        let message = Message {
            id: tables.next_id("msg"),
            conversation_id: conversation_id.to_owned(),
            role,
            content: content.to_owned(),
            created_at: now,
        };
        tables.messages.push(message.clone());
        Ok(message)
    }

    async fn list_messages(&self, user_id: &str, conversation_id: &str) -> Result<Vec<Message>, ClientError> {
        let mut tables = self.tables();
        tables.owned_mut(user_id, conversation_id)?;
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn mock_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn conversation_json(id: &str, user: &str, title: &str) -> Value {
        json!({
            "id": id,
            "user_id": user,
            "title": title,
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z",
        })
    }

    #[tokio::test]
    async fn http_store_sends_user_header() {
        let app = Router::new()
            .route(
                "/v1/conversations",
                post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                    let user = headers["x-auth-user"].to_str().unwrap().to_owned();
                    Json(conversation_json("c1", &user, body["title"].as_str().unwrap()))
                }),
            )
            .route(
                "/v1/conversations/{id}/messages",
                get(|Path(id): Path<String>| async move {
                    Json(json!([{
                        "id": "m1",
                        "conversation_id": id,
                        "role": "user",
                        "content": "Hi",
                        "created_at": "2026-01-01T00:00:00Z",
                    }]))
                }),
            );
        let base = mock_server(app).await;
        let store = HttpConversationStore::new(&base, "x-auth-user").unwrap();

        let created = store.create_conversation("alice", "New Chat").await.unwrap();
        assert_eq!(created.user_id, "alice");
        assert_eq!(created.title, "New Chat");

        let messages = store.list_messages("alice", "c1").await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
    }

    #[tokio::test]
    async fn http_store_surfaces_server_errors() {
        let app = Router::new().route(
            "/v1/conversations/{id}",
            get(|| async {
                (StatusCode::NOT_FOUND, Json(json!({"error": "conversation 'x' not found"})))
            }),
        );
        let base = mock_server(app).await;
        let store = HttpConversationStore::new(&base, "x-user-id").unwrap();
        match store.get_conversation("alice", "x").await {
            Err(ClientError::Status { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "conversation 'x' not found");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn memory_store_scopes_by_user() {
        let store = MemoryConversationStore::new();
        let conv = store.create_conversation("alice", "New Chat").await.unwrap();
        store.append_message("alice", &conv.id, Role::User, "Hi").await.unwrap();

        assert!(store.list_messages("bob", &conv.id).await.is_err());
        assert!(store.list_conversations("bob").await.unwrap().is_empty());

        store.delete_conversation("alice", &conv.id).await.unwrap();
        assert!(store.list_conversations("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn memory_store_lists_newest_first() {
        let store = MemoryConversationStore::new();
        let first = store.create_conversation("alice", "one").await.unwrap();
        let second = store.create_conversation("alice", "two").await.unwrap();
        let ids: Vec<String> =
            store.list_conversations("alice").await.unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![second.id.clone(), first.id.clone()]);

        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        store.append_message("alice", &first.id, Role::User, "bump").await.unwrap();
        let top = &store.list_conversations("alice").await.unwrap()[0];
        assert_eq!(top.id, first.id);
    }
}
