//! Chat session controller.
//!
//! Owns the visible history of the active conversation and runs one send at
//! a time: persist the user turn, ask the gateway, persist the reply, and
//! title the conversation after its first successful exchange.
//!
//! Every switch of the active conversation bumps an epoch. A send remembers
//! the epoch it started under; once that no longer matches, its turns are
//! still persisted to their own conversation but never shown.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use aichat_types::{Conversation, Message, Role, Turn, DEFAULT_CONVERSATION_TITLE};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::auth::{AuthProvider, AuthUser};
use crate::error::ClientError;
use crate::gateway::CompletionGateway;
use crate::store::ConversationStore;

pub const ERROR_REPLY: &str =
    "Sorry, I encountered an error while processing your message. Please try again.";

/// Titles keep this many characters of the first message.
pub const TITLE_MAX_CHARS: usize = 50;

/// One turn of the visible history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    fn to_turn(&self) -> Turn {
        Turn { role: self.role, content: self.content.clone() }
    }
}

impl From<Message> for ChatTurn {
    fn from(m: Message) -> Self {
        Self { id: m.id, role: m.role, content: m.content, timestamp: m.created_at }
    }
}

/// Title derived from the first user message.
pub fn conversation_title(first_message: &str) -> String {
    let mut chars = first_message.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if head.trim().is_empty() {
        DEFAULT_CONVERSATION_TITLE.to_owned()
    } else if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[derive(Debug)]
pub enum SendOutcome {
    /// Nobody is signed in; the gateway was not contacted.
    AuthRequired,
    /// Another send is still in flight.
    Busy,
    /// No conversation could be created; history is untouched.
    NotStarted(ClientError),
    Replied(ChatTurn),
    /// The reply was persisted, but the user has since switched away.
    Detached { conversation_id: String },
    /// Something failed after the user turn was shown; an error turn was
    /// appended in its place.
    Failed(ClientError),
}

#[derive(Debug, Default)]
struct SessionState {
    active: Option<Conversation>,
    history: Vec<ChatTurn>,
    loading: bool,
    epoch: u64,
    needs_title: bool,
    /// Last id handed out by [`ChatSession::stamp`]; ids never repeat.
    last_turn_id: i64,
}

/// Clears the loading flag however a send ends.
struct LoadingGuard<'a>(&'a Mutex<SessionState>);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).loading = false;
    }
}

#[derive(Debug)]
pub struct ChatSession {
    auth: Arc<dyn AuthProvider>,
    store: Arc<dyn ConversationStore>,
    gateway: Arc<dyn CompletionGateway>,
    state: Mutex<SessionState>,
}

impl ChatSession {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        store: Arc<dyn ConversationStore>,
        gateway: Arc<dyn CompletionGateway>,
    ) -> Self {
        Self { auth, store, gateway, state: Mutex::new(SessionState::default()) }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// New turn stamped now, with an id strictly above the previous one.
    fn stamp(&self, role: Role, content: impl Into<String>) -> ChatTurn {
        let timestamp = Utc::now();
        let mut state = self.state();
        let id = timestamp.timestamp_micros().max(state.last_turn_id + 1);
        state.last_turn_id = id;
        ChatTurn { id: id.to_string(), role, content: content.into(), timestamp }
    }

    fn require_user(&self) -> Result<AuthUser, ClientError> {
        self.auth.current_user().ok_or(ClientError::AuthRequired)
    }

    // ── Read access ──────────────────────────────────────────────────────────

    pub fn history(&self) -> Vec<ChatTurn> {
        self.state().history.clone()
    }

    pub fn active_conversation(&self) -> Option<Conversation> {
        self.state().active.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    /// Whether the composer should refuse to submit.
    pub fn is_input_disabled(&self) -> bool {
        self.is_loading() || self.auth.current_user().is_none()
    }

    // ── Conversation switching ───────────────────────────────────────────────

    fn switch_to(&self, active: Option<Conversation>, history: Vec<ChatTurn>, needs_title: bool) {
        let mut state = self.state();
        state.epoch += 1;
        state.active = active;
        state.history = history;
        state.needs_title = needs_title;
    }

    /// Start an empty conversation and make it active.
    pub async fn new_chat(&self) -> Result<Conversation, ClientError> {
        let user = self.require_user()?;
        let conversation = self.store.create_conversation(&user.id, DEFAULT_CONVERSATION_TITLE).await?;
        info!(conversation_id = %conversation.id, "new conversation");
        self.switch_to(Some(conversation.clone()), Vec::new(), true);
        Ok(conversation)
    }

    /// Make `id` active and replace the history with its persisted messages.
    pub async fn open_conversation(&self, id: &str) -> Result<Conversation, ClientError> {
        let user = self.require_user()?;
        let conversation = self.store.get_conversation(&user.id, id).await?;
        let messages = self.store.list_messages(&user.id, id).await?;
        // A first exchange that failed halfway leaves messages behind but the
        // default title in place.
        let needs_title = messages.is_empty() || conversation.title == DEFAULT_CONVERSATION_TITLE;
        let history = messages.into_iter().map(ChatTurn::from).collect();
        self.switch_to(Some(conversation.clone()), history, needs_title);
        Ok(conversation)
    }

    pub fn clear_conversation(&self) {
        self.switch_to(None, Vec::new(), false);
    }

    pub async fn list_conversations(&self) -> Result<Vec<Conversation>, ClientError> {
        let user = self.require_user()?;
        self.store.list_conversations(&user.id).await
    }

    /// Delete `id`, clearing the view if it was the active conversation.
    pub async fn delete_conversation(&self, id: &str) -> Result<(), ClientError> {
        let user = self.require_user()?;
        self.store.delete_conversation(&user.id, id).await?;
        let was_active = self.state().active.as_ref().is_some_and(|c| c.id == id);
        if was_active {
            self.clear_conversation();
        }
        Ok(())
    }

    // ── Sending ──────────────────────────────────────────────────────────────

    pub async fn send(&self, content: &str) -> SendOutcome {
        let Some(user) = self.auth.current_user() else {
            return SendOutcome::AuthRequired;
        };

        let (epoch, active, needs_title) = {
            let mut state = self.state();
            if state.loading {
                return SendOutcome::Busy;
            }
            state.loading = true;
            (state.epoch, state.active.clone(), state.needs_title)
        };
        let _loading = LoadingGuard(&self.state);

        let (conversation, needs_title) = match active {
            Some(conversation) => (conversation, needs_title),
            None => match self.store.create_conversation(&user.id, DEFAULT_CONVERSATION_TITLE).await {
                Ok(conversation) => {
                    let mut state = self.state();
                    if state.epoch == epoch {
                        state.active = Some(conversation.clone());
                        state.history.clear();
                        state.needs_title = true;
                    }
                    (conversation, true)
                }
                Err(e) => {
                    warn!(error = %e, "could not start a conversation");
                    return SendOutcome::NotStarted(e);
                }
            },
        };

        let user_turn = self.stamp(Role::User, content);
        let turns: Vec<Turn> = {
            let mut state = self.state();
            if state.epoch == epoch {
                state.history.push(user_turn.clone());
                state.history.iter().map(ChatTurn::to_turn).collect()
            } else {
                vec![user_turn.to_turn()]
            }
        };

        match self.exchange(&user, &conversation, epoch, turns, needs_title).await {
            Ok(reply) if self.is_current(epoch) => SendOutcome::Replied(reply),
            Ok(_) => {
                debug!(conversation_id = %conversation.id, "reply landed after a conversation switch");
                SendOutcome::Detached { conversation_id: conversation.id }
            }
            Err(e) => {
                warn!(conversation_id = %conversation.id, error = %e, "send failed");
                let error_turn = self.stamp(Role::Assistant, ERROR_REPLY);
                self.push_if_current(epoch, error_turn);
                SendOutcome::Failed(e)
            }
        }
    }

    /// Persist the user turn, fetch and persist the reply, then title the
    /// conversation if this is its first exchange.
    async fn exchange(
        &self,
        user: &AuthUser,
        conversation: &Conversation,
        epoch: u64,
        turns: Vec<Turn>,
        needs_title: bool,
    ) -> Result<ChatTurn, ClientError> {
        let content = turns.last().map(|t| t.content.clone()).unwrap_or_default();

        self.store
            .append_message(&user.id, &conversation.id, Role::User, &content)
            .await?;

        let reply = self.gateway.complete(&turns).await?;
        let reply = self.stamp(Role::Assistant, reply.content);
        self.push_if_current(epoch, reply.clone());
        self.store
            .append_message(&user.id, &conversation.id, Role::Assistant, &reply.content)
            .await?;

        if needs_title {
            let first = turns
                .iter()
                .find(|t| t.role == Role::User)
                .map_or(content.as_str(), |t| t.content.as_str());
            let title = conversation_title(first);
            let updated = self
                .store
                .update_conversation_title(&user.id, &conversation.id, &title)
                .await?;
            let mut state = self.state();
            if state.epoch == epoch {
                state.active = Some(updated);
                state.needs_title = false;
            }
        }

        Ok(reply)
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.state().epoch == epoch
    }

    fn push_if_current(&self, epoch: u64, turn: ChatTurn) {
        let mut state = self.state();
        if state.epoch == epoch {
            state.history.push(turn);
        }
    }
}
