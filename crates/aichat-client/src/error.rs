use thiserror::Error;

/// Errors surfaced by the client-side collaborators.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The action needs a signed-in user.
    #[error("authentication required")]
    AuthRequired,

    #[error("auth provider error: {0}")]
    Auth(String),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("conversation store error: {0}")]
    Storage(String),

    #[error("microphone not available")]
    MicrophoneUnavailable,

    #[error("preferences I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("preferences decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// Build a [`ClientError::Status`] from a failed response, preferring the
    /// `error` field of a JSON error body over the raw text.
    pub(crate) async fn from_response(resp: reqwest::Response) -> Self {
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<aichat_types::ErrorBody>(&text)
            .map(|body| match body.details {
                Some(details) => format!("{}: {}", body.error, details),
                None => body.error,
            })
            .unwrap_or(text);
        ClientError::Status { status, message }
    }
}
