use std::future::Future;

use aichat_types::{Language, UpdateProfileRequest};
use chrono::Utc;
use uuid::Uuid;

use crate::entities::{format_ts, parse_ts, ProfileRecord, SqliteStore};

type ProfileRow = (String, String, Option<String>, Option<String>, String, String, String);

pub trait ProfileStore: Send + Sync + 'static {
    /// Fetch the profile of `user_id`, creating a default one on first access.
    fn get_or_create_profile(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<ProfileRecord, sqlx::Error>> + Send;

    /// Apply a partial update; `None` fields keep their stored value.
    fn update_profile(
        &self,
        user_id: &str,
        patch: &UpdateProfileRequest,
    ) -> impl Future<Output = Result<ProfileRecord, sqlx::Error>> + Send;
}

impl SqliteStore {
    async fn fetch_profile(&self, user_id: &str) -> Result<ProfileRecord, sqlx::Error> {
        let (id, user_id, display_name, avatar_url, language, created_at, updated_at): ProfileRow =
            sqlx::query_as(
                "SELECT id, user_id, display_name, avatar_url, language_preference, created_at, updated_at \
                 FROM user_profiles WHERE user_id = ?1",
            )
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(ProfileRecord {
            id,
            user_id,
            display_name,
            avatar_url,
            language_preference: language.parse().unwrap_or_else(|_| {
                tracing::warn!(raw = %language, "unknown language preference; using default");
                Language::default()
            }),
            created_at: parse_ts(&created_at, "user_profiles.created_at"),
            updated_at: parse_ts(&updated_at, "user_profiles.updated_at"),
        })
    }
}

impl ProfileStore for SqliteStore {
    async fn get_or_create_profile(&self, user_id: &str) -> Result<ProfileRecord, sqlx::Error> {
        let now = format_ts(Utc::now());
        sqlx::query(
            "INSERT INTO user_profiles (id, user_id, language_preference, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?4) \
             ON CONFLICT(user_id) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(Language::default().to_string())
        .bind(&now)
        .execute(&self.pool)
        .await?;
        self.fetch_profile(user_id).await
    }

    async fn update_profile(
        &self,
        user_id: &str,
        patch: &UpdateProfileRequest,
    ) -> Result<ProfileRecord, sqlx::Error> {
        self.get_or_create_profile(user_id).await?;
        sqlx::query(
            "UPDATE user_profiles SET \
                 display_name = COALESCE(?1, display_name), \
                 avatar_url = COALESCE(?2, avatar_url), \
                 language_preference = COALESCE(?3, language_preference), \
                 updated_at = ?4 \
             WHERE user_id = ?5",
        )
        .bind(patch.display_name.as_deref())
        .bind(patch.avatar_url.as_deref())
        .bind(patch.language_preference.map(|l| l.to_string()))
        .bind(format_ts(Utc::now()))
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        self.fetch_profile(user_id).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::memory_store;

    #[tokio::test]
    async fn first_access_creates_default_profile_once() {
        let store = memory_store().await;
        let first = store.get_or_create_profile("alice").await.unwrap();
        let second = store.get_or_create_profile("alice").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.language_preference, Language::En);
        assert!(first.display_name.is_none());
    }

    #[tokio::test]
    async fn partial_update_keeps_other_fields() {
        let store = memory_store().await;
        store
            .update_profile(
                "alice",
                &UpdateProfileRequest {
                    display_name: Some("Alice".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let updated = store
            .update_profile(
                "alice",
                &UpdateProfileRequest {
                    language_preference: Some(Language::So),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("Alice"));
        assert_eq!(updated.language_preference, Language::So);
    }
}
