use std::future::Future;

use aichat_types::Role;

use crate::entities::{format_ts, parse_ts, MessageRecord, SqliteStore};

pub trait MessageStore: Send + Sync + 'static {
    /// Append a message and bump the parent conversation's `updated_at`.
    ///
    /// Ownership of the conversation must be checked by the caller.
    fn append_message(
        &self,
        msg: MessageRecord,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// Messages of one conversation, oldest first.
    fn list_messages(
        &self,
        conversation_id: &str,
    ) -> impl Future<Output = Result<Vec<MessageRecord>, sqlx::Error>> + Send;
}

impl MessageStore for SqliteStore {
    async fn append_message(&self, msg: MessageRecord) -> Result<(), sqlx::Error> {
        let created_at = format_ts(msg.created_at);
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, role, content, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&msg.id)
        .bind(&msg.conversation_id)
        .bind(msg.role.to_string())
        .bind(&msg.content)
        .bind(&created_at)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE conversations SET updated_at = ?1 WHERE id = ?2")
            .bind(&created_at)
            .bind(&msg.conversation_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<MessageRecord>, sqlx::Error> {
        let rows: Vec<(String, String, String, String, String)> = sqlx::query_as(
            "SELECT id, conversation_id, role, content, created_at \
             FROM messages WHERE conversation_id = ?1 \
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .filter_map(|(id, conversation_id, role, content, created_at)| {
                let role = match role.parse::<Role>() {
                    Ok(role) => role,
                    Err(_) => {
                        tracing::warn!(message_id = %id, raw = %role, "skipping message with unknown role");
                        return None;
                    }
                };
                Some(MessageRecord {
                    id,
                    conversation_id,
                    role,
                    content,
                    created_at: parse_ts(&created_at, "messages.created_at"),
                })
            })
            .collect())
    }
}
