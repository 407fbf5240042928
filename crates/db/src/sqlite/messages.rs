//! SQLite-Implementierung von MessageRepository, SeenRepository und ReactionRepository

use async_trait::async_trait;
use chrono::Utc;
use roomhub_core::{MessageId, RoomId, UserId};

use crate::error::DbError;
use crate::models::{NachrichtRecord, NachrichtenTyp, NeueNachricht, ReaktionRecord};
use crate::repository::{DbResult, MessageRepository, ReactionRepository, SeenRepository};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::row::{bool_spalte, opt_uuid_spalte, uuid_spalte, zeit_spalte, zeitstempel};

#[async_trait]
impl MessageRepository for SqliteDb {
    async fn create_message(&self, data: NeueNachricht<'_>) -> DbResult<NachrichtRecord> {
        let id = MessageId::new();
        let now = Utc::now();
        let now_str = zeitstempel(now);

        sqlx::query(
            "INSERT INTO messages
             (id, room_id, sender_id, content, message_type, replied_to, is_edited,
              created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(id.inner().to_string())
        .bind(data.room_id.inner().to_string())
        .bind(data.sender_id.map(|u| u.inner().to_string()))
        .bind(data.content)
        .bind(data.message_type.als_str())
        .bind(data.replied_to.map(|m| m.inner().to_string()))
        .bind(&now_str)
        .bind(&now_str)
        .execute(&self.pool)
        .await?;

        Ok(NachrichtRecord {
            id,
            room_id: data.room_id,
            sender_id: data.sender_id,
            content: data.content.to_string(),
            message_type: data.message_type,
            replied_to: data.replied_to,
            file_id: None,
            is_edited: false,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_message(&self, id: MessageId) -> DbResult<Option<NachrichtRecord>> {
        let row = sqlx::query(
            "SELECT id, room_id, sender_id, content, message_type, replied_to, file_id,
                    is_edited, created_at, updated_at
             FROM messages WHERE id = ?",
        )
        .bind(id.inner().to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_nachricht(&r)).transpose()
    }

    async fn update_message_content(
        &self,
        id: MessageId,
        content: &str,
    ) -> DbResult<NachrichtRecord> {
        let affected = sqlx::query(
            "UPDATE messages SET content = ?, is_edited = 1, updated_at = ? WHERE id = ?",
        )
        .bind(content)
        .bind(zeitstempel(Utc::now()))
        .bind(id.inner().to_string())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(DbError::nicht_gefunden(format!("Nachricht {id}")));
        }

        self.get_message(id)
            .await?
            .ok_or_else(|| DbError::nicht_gefunden(format!("Nachricht {id}")))
    }

    async fn delete_message(&self, id: MessageId) -> DbResult<bool> {
        let affected = sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(id.inner().to_string())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(affected > 0)
    }

    async fn unread_count(&self, room_id: RoomId, user_id: UserId) -> DbResult<i64> {
        use sqlx::Row as _;

        let room_str = room_id.inner().to_string();
        let user_str = user_id.inner().to_string();

        let row = sqlx::query(
            "SELECT
                (SELECT COUNT(*) FROM messages
                 WHERE room_id = ? AND (sender_id IS NULL OR sender_id != ?))
              - (SELECT COUNT(*) FROM message_seen s
                 JOIN messages m ON m.id = s.message_id
                 WHERE m.room_id = ? AND s.user_id = ?) AS ungelesen",
        )
        .bind(&room_str)
        .bind(&user_str)
        .bind(&room_str)
        .bind(&user_str)
        .fetch_one(&self.pool)
        .await?;

        let ungelesen: i64 = row.try_get("ungelesen")?;
        Ok(ungelesen.max(0))
    }
}

#[async_trait]
impl SeenRepository for SqliteDb {
    async fn mark_seen(&self, message_id: MessageId, user_id: UserId) -> DbResult<bool> {
        let affected = sqlx::query(
            "INSERT OR IGNORE INTO message_seen (message_id, user_id, seen_at) VALUES (?, ?, ?)",
        )
        .bind(message_id.inner().to_string())
        .bind(user_id.inner().to_string())
        .bind(zeitstempel(Utc::now()))
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected > 0)
    }

    async fn seen_by(&self, message_id: MessageId) -> DbResult<Vec<UserId>> {
        let rows = sqlx::query(
            "SELECT user_id FROM message_seen WHERE message_id = ? ORDER BY seen_at ASC",
        )
        .bind(message_id.inner().to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|r| uuid_spalte(r, "user_id")).collect()
    }
}

#[async_trait]
impl ReactionRepository for SqliteDb {
    async fn add_reaction(
        &self,
        message_id: MessageId,
        user_id: UserId,
        emoji: &str,
    ) -> DbResult<bool> {
        let affected = sqlx::query(
            "INSERT OR IGNORE INTO reactions (message_id, user_id, emoji, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(message_id.inner().to_string())
        .bind(user_id.inner().to_string())
        .bind(emoji)
        .bind(zeitstempel(Utc::now()))
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected > 0)
    }

    async fn remove_reaction(
        &self,
        message_id: MessageId,
        user_id: UserId,
        emoji: &str,
    ) -> DbResult<bool> {
        let affected = sqlx::query(
            "DELETE FROM reactions WHERE message_id = ? AND user_id = ? AND emoji = ?",
        )
        .bind(message_id.inner().to_string())
        .bind(user_id.inner().to_string())
        .bind(emoji)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected > 0)
    }

    async fn reactions_for(&self, message_id: MessageId) -> DbResult<Vec<ReaktionRecord>> {
        use sqlx::Row as _;

        let rows = sqlx::query(
            "SELECT message_id, user_id, emoji, created_at
             FROM reactions WHERE message_id = ?
             ORDER BY created_at ASC",
        )
        .bind(message_id.inner().to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| -> DbResult<ReaktionRecord> {
                Ok(ReaktionRecord {
                    message_id: uuid_spalte(r, "message_id")?,
                    user_id: uuid_spalte(r, "user_id")?,
                    emoji: r.try_get("emoji")?,
                    created_at: zeit_spalte(r, "created_at")?,
                })
            })
            .collect()
    }
}

fn row_to_nachricht(row: &sqlx::sqlite::SqliteRow) -> DbResult<NachrichtRecord> {
    use sqlx::Row as _;

    let typ_str: String = row.try_get("message_type")?;
    let message_type = typ_str.parse::<NachrichtenTyp>().map_err(DbError::intern)?;

    Ok(NachrichtRecord {
        id: uuid_spalte(row, "id")?,
        room_id: uuid_spalte(row, "room_id")?,
        sender_id: opt_uuid_spalte(row, "sender_id")?,
        content: row.try_get("content")?,
        message_type,
        replied_to: opt_uuid_spalte(row, "replied_to")?,
        file_id: opt_uuid_spalte(row, "file_id")?,
        is_edited: bool_spalte(row, "is_edited")?,
        created_at: zeit_spalte(row, "created_at")?,
        updated_at: zeit_spalte(row, "updated_at")?,
    })
}
