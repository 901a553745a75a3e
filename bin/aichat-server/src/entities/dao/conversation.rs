use aichat_types::Conversation;
use chrono::{DateTime, Utc};

/// A row in the `conversations` table.
#[derive(Debug, Clone)]
pub struct ConversationRecord {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationRecord {
    pub fn to_response(&self) -> Conversation {
        Conversation {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
