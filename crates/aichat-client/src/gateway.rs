use std::fmt::Debug;

use aichat_types::{ChatRequest, ChatResponse, Turn};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::ClientError;

/// Produces the assistant's next turn for a conversation so far.
#[async_trait]
pub trait CompletionGateway: Send + Sync + Debug {
    async fn complete(&self, turns: &[Turn]) -> Result<Turn, ClientError>;
}

/// `POST {base}/chat` on an `aichat-server`.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    endpoint: String,
    client: Client,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .user_agent(concat!("aichat-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { endpoint: format!("{}/chat", base_url.trim_end_matches('/')), client })
    }
}

#[async_trait]
impl CompletionGateway for HttpGateway {
    async fn complete(&self, turns: &[Turn]) -> Result<Turn, ClientError> {
        debug!(turns = turns.len(), "requesting completion");
        let body = ChatRequest { messages: turns.to_vec() };
        let resp = self.client.post(&self.endpoint).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(ClientError::from_response(resp).await);
        }
        let reply: ChatResponse = resp.json().await?;
        Ok(reply.message)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn posts_history_and_returns_reply() {
        let app = Router::new().route(
            "/chat",
            post(|Json(body): Json<Value>| async move {
                let last = body["messages"][0]["content"].as_str().unwrap_or_default().to_owned();
                Json(json!({"message": {"role": "assistant", "content": format!("echo {last}")}}))
            }),
        );
        let gateway = HttpGateway::new(&serve(app).await).unwrap();
        let reply = gateway.complete(&[Turn::user("Hi")]).await.unwrap();
        assert_eq!(reply, Turn::assistant("echo Hi"));
    }

    #[tokio::test]
    async fn failure_details_are_kept() {
        let app = Router::new().route(
            "/chat",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "Failed to generate response", "details": "quota"})),
                )
            }),
        );
        let gateway = HttpGateway::new(&serve(app).await).unwrap();
        match gateway.complete(&[Turn::user("Hi")]).await {
            Err(ClientError::Status { status: 500, message }) => {
                assert_eq!(message, "Failed to generate response: quota");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
