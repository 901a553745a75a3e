//! Client-side chat session logic: the session controller that drives a
//! conversation against the completion gateway, the input composer, voice
//! capture, the sidebar layout state machine and the local preferences store.

pub mod auth;
pub mod error;
pub mod gateway;
pub mod input;
pub mod prefs;
pub mod session;
pub mod sidebar;
pub mod store;
pub mod voice;

pub use auth::{AuthProvider, AuthSession, AuthUser, OAuthProvider, StaticAuth};
pub use error::ClientError;
pub use gateway::{CompletionGateway, HttpGateway};
pub use input::InputComposer;
pub use prefs::{FileStore, KeyValueStore, MemoryStore, Preferences};
pub use session::{ChatSession, ChatTurn, SendOutcome};
pub use sidebar::SidebarLayout;
pub use store::{ConversationStore, HttpConversationStore, MemoryConversationStore};
pub use voice::{Microphone, PlaceholderTranscriber, Transcriber, VoiceRecorder};
