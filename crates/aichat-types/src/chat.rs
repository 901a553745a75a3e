//! Completion gateway request / response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};
use thiserror::Error;
use utoipa::ToSchema;

/// Author of a turn. Callers may only send `user` and `assistant` turns;
/// the system instruction is added by the gateway itself.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One role-tagged message exchanged in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Request body for `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// Conversation so far, oldest first.
    pub messages: Vec<Turn>,
}

/// Response body for a successful `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    /// The generated reply; always `role = "assistant"`.
    pub message: Turn,
}

/// JSON body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Why a `POST /chat` payload was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnRejection {
    /// The body is not an object carrying a `messages` array.
    #[error("Messages array is required")]
    MissingMessages,
    /// Entry `index` does not match `{ role: "user"|"assistant", content: string }`.
    #[error("Invalid message at index {index}")]
    InvalidTurn { index: usize },
}

impl ChatRequest {
    /// Validate an arbitrary JSON payload against the turn schema.
    ///
    /// Only `role` and `content` are read from each entry; any other field is
    /// ignored. An entry missing either field, or carrying a role other than
    /// `user`/`assistant`, rejects the whole request.
    pub fn from_value(value: &Value) -> Result<Self, TurnRejection> {
        let entries = value
            .get("messages")
            .and_then(Value::as_array)
            .ok_or(TurnRejection::MissingMessages)?;

        let messages = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let role = entry
                    .get("role")
                    .and_then(Value::as_str)
                    .and_then(|r| r.parse::<Role>().ok());
                let content = entry.get("content").and_then(Value::as_str);
                match (role, content) {
                    (Some(role), Some(content)) => Ok(Turn { role, content: content.to_owned() }),
                    _ => Err(TurnRejection::InvalidTurn { index }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { messages })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_object_is_missing_messages() {
        assert_eq!(
            ChatRequest::from_value(&json!({})).unwrap_err(),
            TurnRejection::MissingMessages
        );
    }

    #[test]
    fn non_array_messages_are_rejected() {
        for body in [json!({"messages": "hi"}), json!({"messages": null}), json!({"messages": {}}), json!([])] {
            assert_eq!(
                ChatRequest::from_value(&body).unwrap_err(),
                TurnRejection::MissingMessages,
                "{body}"
            );
        }
    }

    #[test]
    fn extra_fields_are_dropped() {
        let req = ChatRequest::from_value(&json!({
            "messages": [
                {"role": "user", "content": "Hi", "id": "123", "timestamp": "now"},
                {"role": "assistant", "content": "Hello!"}
            ]
        }))
        .unwrap();
        assert_eq!(req.messages, vec![Turn::user("Hi"), Turn::assistant("Hello!")]);
    }

    #[test]
    fn malformed_entry_reports_its_index() {
        let err = ChatRequest::from_value(&json!({
            "messages": [
                {"role": "user", "content": "ok"},
                {"role": "system", "content": "nope"}
            ]
        }))
        .unwrap_err();
        assert_eq!(err, TurnRejection::InvalidTurn { index: 1 });
        assert_eq!(err.to_string(), "Invalid message at index 1");

        let err = ChatRequest::from_value(&json!({"messages": [{"role": "user"}]})).unwrap_err();
        assert_eq!(err, TurnRejection::InvalidTurn { index: 0 });
    }

    #[test]
    fn empty_array_is_accepted() {
        let req = ChatRequest::from_value(&json!({"messages": []})).unwrap();
        assert!(req.messages.is_empty());
    }

    #[test]
    fn role_round_trips_as_lowercase() {
        assert_eq!(Role::Assistant.to_string(), "assistant");
        assert_eq!(serde_json::to_value(Role::User).unwrap(), json!("user"));
    }
}
