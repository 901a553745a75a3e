use aichat_types::{Language, UserProfile};
use chrono::{DateTime, Utc};

/// A row in the `user_profiles` table.
#[derive(Debug, Clone)]
pub struct ProfileRecord {
    pub id: String,
    pub user_id: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub language_preference: Language,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRecord {
    pub fn to_response(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
            display_name: self.display_name.clone(),
            avatar_url: self.avatar_url.clone(),
            language_preference: self.language_preference,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
