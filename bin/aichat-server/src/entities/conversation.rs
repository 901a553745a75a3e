use std::future::Future;

use chrono::Utc;

use crate::entities::{format_ts, parse_ts, ConversationRecord, SqliteStore};

type ConversationRow = (String, String, String, String, String);

fn from_row((id, user_id, title, created_at, updated_at): ConversationRow) -> ConversationRecord {
    ConversationRecord {
        id,
        user_id,
        title,
        created_at: parse_ts(&created_at, "conversations.created_at"),
        updated_at: parse_ts(&updated_at, "conversations.updated_at"),
    }
}

pub trait ConversationStore: Send + Sync + 'static {
    fn create_conversation(
        &self,
        record: ConversationRecord,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// All conversations of `user_id`, most recently updated first.
    fn list_conversations(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<ConversationRecord>, sqlx::Error>> + Send;

    fn get_conversation(
        &self,
        user_id: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<ConversationRecord>, sqlx::Error>> + Send;

    /// Set the title and bump `updated_at`. `None` if the conversation does
    /// not exist or belongs to someone else.
    fn rename_conversation(
        &self,
        user_id: &str,
        id: &str,
        title: &str,
    ) -> impl Future<Output = Result<Option<ConversationRecord>, sqlx::Error>> + Send;

    /// Delete a conversation and its messages. Returns `false` if nothing
    /// owned by `user_id` matched.
    fn delete_conversation(
        &self,
        user_id: &str,
        id: &str,
    ) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
}

impl ConversationStore for SqliteStore {
    async fn create_conversation(&self, record: ConversationRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO conversations (id, user_id, title, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.title)
        .bind(format_ts(record.created_at))
        .bind(format_ts(record.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_conversations(&self, user_id: &str) -> Result<Vec<ConversationRecord>, sqlx::Error> {
        let rows: Vec<ConversationRow> = sqlx::query_as(
            "SELECT id, user_id, title, created_at, updated_at \
             FROM conversations WHERE user_id = ?1 \
             ORDER BY updated_at DESC, rowid DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(from_row).collect())
    }

    async fn get_conversation(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<Option<ConversationRecord>, sqlx::Error> {
        let row: Option<ConversationRow> = sqlx::query_as(
            "SELECT id, user_id, title, created_at, updated_at \
             FROM conversations WHERE id = ?1 AND user_id = ?2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(from_row))
    }

    async fn rename_conversation(
        &self,
        user_id: &str,
        id: &str,
        title: &str,
    ) -> Result<Option<ConversationRecord>, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE conversations SET title = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
        )
        .bind(title)
        .bind(format_ts(Utc::now()))
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_conversation(user_id, id).await
    }

    async fn delete_conversation(&self, user_id: &str, id: &str) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM conversations WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }
        // Foreign keys cascade, but a database opened without them must not
        // keep orphaned messages either.
        sqlx::query("DELETE FROM messages WHERE conversation_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::memory_store;
    use chrono::Duration;

    fn record(id: &str, user: &str, age_secs: i64) -> ConversationRecord {
        let at = Utc::now() - Duration::seconds(age_secs);
        ConversationRecord {
            id: id.into(),
            user_id: user.into(),
            title: "New Chat".into(),
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn list_is_scoped_and_newest_first() {
        let store = memory_store().await;
        store.create_conversation(record("old", "alice", 60)).await.unwrap();
        store.create_conversation(record("new", "alice", 1)).await.unwrap();
        store.create_conversation(record("other", "bob", 0)).await.unwrap();

        let ids: Vec<String> = store
            .list_conversations("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn other_users_cannot_read_rename_or_delete() {
        let store = memory_store().await;
        store.create_conversation(record("c1", "alice", 0)).await.unwrap();

        assert!(store.get_conversation("bob", "c1").await.unwrap().is_none());
        assert!(store.rename_conversation("bob", "c1", "x").await.unwrap().is_none());
        assert!(!store.delete_conversation("bob", "c1").await.unwrap());
        assert_eq!(store.get_conversation("alice", "c1").await.unwrap().unwrap().title, "New Chat");
    }

    #[tokio::test]
    async fn rename_bumps_updated_at() {
        let store = memory_store().await;
        let original = record("c1", "alice", 120);
        store.create_conversation(original.clone()).await.unwrap();

        let renamed = store.rename_conversation("alice", "c1", "Trip plans").await.unwrap().unwrap();
        assert_eq!(renamed.title, "Trip plans");
        assert!(renamed.updated_at > original.updated_at);
        assert_eq!(renamed.created_at.timestamp(), original.created_at.timestamp());
    }
}
