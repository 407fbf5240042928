//! SQLite-Implementierung des UserRepository
//!
//! Benutzerkonten werden ausserhalb des Hubs verwaltet; der Hub liest hier
//! nur Benutzernamen. `create_user` dient Tests und dem Seeding.

use async_trait::async_trait;
use chrono::Utc;
use roomhub_core::UserId;

use crate::error::DbError;
use crate::models::BenutzerRecord;
use crate::repository::{DbResult, UserRepository};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::row::{uuid_spalte, zeit_spalte, zeitstempel};

#[async_trait]
impl UserRepository for SqliteDb {
    async fn create_user(&self, username: &str) -> DbResult<BenutzerRecord> {
        let id = UserId::new();
        let now = Utc::now();

        sqlx::query("INSERT INTO users (id, username, created_at) VALUES (?, ?, ?)")
            .bind(id.inner().to_string())
            .bind(username)
            .bind(zeitstempel(now))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DbError::aus_sqlx(e, || format!("Benutzername '{username}' bereits vergeben"))
            })?;

        Ok(BenutzerRecord {
            id,
            username: username.to_string(),
            created_at: now,
        })
    }

    async fn get_user(&self, id: UserId) -> DbResult<Option<BenutzerRecord>> {
        let row = sqlx::query("SELECT id, username, created_at FROM users WHERE id = ?")
            .bind(id.inner().to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_benutzer(&r)).transpose()
    }
}

fn row_to_benutzer(row: &sqlx::sqlite::SqliteRow) -> DbResult<BenutzerRecord> {
    use sqlx::Row as _;

    Ok(BenutzerRecord {
        id: uuid_spalte(row, "id")?,
        username: row.try_get("username")?,
        created_at: zeit_spalte(row, "created_at")?,
    })
}
