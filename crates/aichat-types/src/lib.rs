//! Wire types shared by `aichat-server` and `aichat-client`.
//!
//! Everything here is plain data plus the turn-schema validation used by the
//! completion gateway, so the client can build requests with exactly the
//! shape the server accepts.

pub mod chat;
pub mod conversation;
pub mod profile;

pub use chat::{ChatRequest, ChatResponse, ErrorBody, Role, Turn, TurnRejection};
pub use conversation::{
    Conversation, CreateConversationRequest, CreateMessageRequest, Message,
    UpdateConversationRequest, DEFAULT_CONVERSATION_TITLE,
};
pub use profile::{Language, UpdateProfileRequest, UserProfile};
