//! OpenAI-compatible chat-completion client.
//!
//! Only the non-streaming subset of the protocol is used: one request, one
//! JSON response, first choice wins. No retries and no request timeout.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CompletionProvider, CompletionRequest, ProviderError, ProviderMessage};

// ── Wire types ───────────────────────────────────────────────────────────────

/// Request body for `POST {base}/chat/completions`.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ProviderMessage],
    temperature: f32,
    max_tokens: u32,
}

/// The fields of a chat-completion response that the gateway reads.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: Option<String>,
    model: String,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: &str,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(concat!("aichat-server/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key,
            model: model.to_owned(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<Option<String>, ProviderError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let mut builder = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Status { status: status.as_u16(), body: text });
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&text)?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content);

        debug!(model = %self.model, has_content = content.is_some(), "provider completion received");
        Ok(content)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured {
        bodies: Arc<Mutex<Vec<Value>>>,
        auth: Arc<Mutex<Option<String>>>,
    }

    /// Start a one-route mock provider and return its base URL.
    async fn mock_provider(status: StatusCode, reply: Value, captured: Captured) -> String {
        let app = Router::new()
            .route(
                "/chat/completions",
                post(
                    move |State(c): State<Captured>, headers: HeaderMap, Json(body): Json<Value>| {
                        let reply = reply.clone();
                        async move {
                            c.bodies.lock().unwrap().push(body);
                            *c.auth.lock().unwrap() = headers
                                .get("authorization")
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_owned);
                            (status, Json(reply))
                        }
                    },
                ),
            )
            .with_state(captured);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            messages: vec![
                ProviderMessage::new("system", "be nice"),
                ProviderMessage::new("user", "Hi"),
            ],
            temperature: 0.7,
            max_tokens: 1000,
        }
    }

    #[tokio::test]
    async fn sends_model_and_sampling_parameters() {
        let captured = Captured::default();
        let base = mock_provider(
            StatusCode::OK,
            json!({"choices": [{"index": 0, "message": {"role": "assistant", "content": "Hello!"}}]}),
            captured.clone(),
        )
        .await;

        let provider = OpenAiProvider::new(&format!("{base}/"), Some("sk-test".into()), "test-model").unwrap();
        let content = provider.complete(request()).await.unwrap();
        assert_eq!(content.as_deref(), Some("Hello!"));

        let bodies = captured.bodies.lock().unwrap();
        let body = &bodies[0];
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["max_tokens"], 1000);
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Hi");
        assert_eq!(captured.auth.lock().unwrap().as_deref(), Some("Bearer sk-test"));
    }

    #[tokio::test]
    async fn empty_choices_yield_none() {
        let base = mock_provider(StatusCode::OK, json!({"choices": []}), Captured::default()).await;
        let provider = OpenAiProvider::new(&base, None, "m").unwrap();
        assert_eq!(provider.complete(request()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let base = mock_provider(
            StatusCode::BAD_GATEWAY,
            json!({"error": {"message": "upstream down"}}),
            Captured::default(),
        )
        .await;
        let provider = OpenAiProvider::new(&base, None, "m").unwrap();
        match provider.complete(request()).await {
            Err(ProviderError::Status { status, body }) => {
                assert_eq!(status, 502);
                assert!(body.contains("upstream down"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }
}
