//! SQLite-Implementierung des CallRepository
//!
//! Der partielle Unique-Index `idx_call_sessions_aktiv` garantiert
//! hoechstens einen aktiven Anruf pro Raum, auch bei parallelen Starts.

use async_trait::async_trait;
use chrono::Utc;
use roomhub_core::{CallId, CallTyp, MedienTyp, RoomId, UserId};

use crate::error::DbError;
use crate::models::{AnrufRecord, AnrufStatus, TeilnehmerRecord};
use crate::repository::{CallRepository, DbResult};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::row::{bool_spalte, opt_zeit_spalte, uuid_spalte, zeit_spalte, zeitstempel};

const TEILNEHMER_SPALTEN: &str = "call_id, user_id, is_audio_enabled, is_video_enabled,
     is_screen_sharing, is_connected, joined_at, left_at";

#[async_trait]
impl CallRepository for SqliteDb {
    async fn active_call(&self, room_id: RoomId) -> DbResult<Option<AnrufRecord>> {
        let row = sqlx::query(
            "SELECT id, room_id, call_type, initiator_id, status, started_at, ended_at
             FROM call_sessions WHERE room_id = ? AND status = 'active'",
        )
        .bind(room_id.inner().to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_anruf(&r)).transpose()
    }

    async fn create_call(
        &self,
        room_id: RoomId,
        initiator_id: UserId,
        call_type: CallTyp,
    ) -> DbResult<AnrufRecord> {
        let id = CallId::new();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO call_sessions (id, room_id, call_type, initiator_id, status, started_at)
             VALUES (?, ?, ?, ?, 'active', ?)",
        )
        .bind(id.inner().to_string())
        .bind(room_id.inner().to_string())
        .bind(call_type.als_str())
        .bind(initiator_id.inner().to_string())
        .bind(zeitstempel(now))
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::aus_sqlx(e, || format!("Raum {room_id} hat bereits einen aktiven Anruf")))?;

        Ok(AnrufRecord {
            id,
            room_id,
            call_type,
            initiator_id,
            status: AnrufStatus::Active,
            started_at: now,
            ended_at: None,
        })
    }

    async fn end_call(&self, call_id: CallId) -> DbResult<bool> {
        let affected = sqlx::query(
            "UPDATE call_sessions SET status = 'ended', ended_at = ?
             WHERE id = ? AND status = 'active'",
        )
        .bind(zeitstempel(Utc::now()))
        .bind(call_id.inner().to_string())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected > 0)
    }

    async fn join_call(
        &self,
        call_id: CallId,
        user_id: UserId,
        audio: bool,
        video: bool,
    ) -> DbResult<TeilnehmerRecord> {
        sqlx::query(
            "INSERT INTO call_participants
             (call_id, user_id, is_audio_enabled, is_video_enabled, is_screen_sharing,
              is_connected, joined_at, left_at)
             VALUES (?, ?, ?, ?, 0, 1, ?, NULL)
             ON CONFLICT (call_id, user_id) DO UPDATE SET
                is_audio_enabled = excluded.is_audio_enabled,
                is_video_enabled = excluded.is_video_enabled,
                is_connected = 1,
                joined_at = CASE WHEN call_participants.left_at IS NULL
                                 THEN call_participants.joined_at
                                 ELSE excluded.joined_at END,
                left_at = NULL",
        )
        .bind(call_id.inner().to_string())
        .bind(user_id.inner().to_string())
        .bind(audio as i64)
        .bind(video as i64)
        .bind(zeitstempel(Utc::now()))
        .execute(&self.pool)
        .await?;

        self.get_participant(call_id, user_id)
            .await?
            .ok_or_else(|| DbError::intern("Teilnehmer nach Upsert nicht lesbar"))
    }

    async fn leave_call(&self, call_id: CallId, user_id: UserId) -> DbResult<bool> {
        let affected = sqlx::query(
            "UPDATE call_participants SET left_at = ?, is_connected = 0
             WHERE call_id = ? AND user_id = ? AND left_at IS NULL",
        )
        .bind(zeitstempel(Utc::now()))
        .bind(call_id.inner().to_string())
        .bind(user_id.inner().to_string())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected > 0)
    }

    async fn leave_all(&self, call_id: CallId) -> DbResult<u64> {
        let affected = sqlx::query(
            "UPDATE call_participants SET left_at = ?, is_connected = 0
             WHERE call_id = ? AND left_at IS NULL",
        )
        .bind(zeitstempel(Utc::now()))
        .bind(call_id.inner().to_string())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected)
    }

    async fn active_participants(&self, call_id: CallId) -> DbResult<Vec<TeilnehmerRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {TEILNEHMER_SPALTEN} FROM call_participants
             WHERE call_id = ? AND left_at IS NULL
             ORDER BY joined_at ASC"
        ))
        .bind(call_id.inner().to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_teilnehmer).collect()
    }

    async fn get_participant(
        &self,
        call_id: CallId,
        user_id: UserId,
    ) -> DbResult<Option<TeilnehmerRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {TEILNEHMER_SPALTEN} FROM call_participants
             WHERE call_id = ? AND user_id = ?"
        ))
        .bind(call_id.inner().to_string())
        .bind(user_id.inner().to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_teilnehmer(&r)).transpose()
    }

    async fn set_media(
        &self,
        call_id: CallId,
        user_id: UserId,
        medium: MedienTyp,
        aktiv: bool,
    ) -> DbResult<bool> {
        let spalte = match medium {
            MedienTyp::Audio => "is_audio_enabled",
            MedienTyp::Video => "is_video_enabled",
            MedienTyp::Screen => "is_screen_sharing",
        };

        let affected = sqlx::query(&format!(
            "UPDATE call_participants SET {spalte} = ?
             WHERE call_id = ? AND user_id = ? AND left_at IS NULL"
        ))
        .bind(aktiv as i64)
        .bind(call_id.inner().to_string())
        .bind(user_id.inner().to_string())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected > 0)
    }
}

fn row_to_anruf(row: &sqlx::sqlite::SqliteRow) -> DbResult<AnrufRecord> {
    use sqlx::Row as _;

    let typ_str: String = row.try_get("call_type")?;
    let call_type = typ_str
        .parse::<CallTyp>()
        .map_err(|e| DbError::intern(e.to_string()))?;
    let status_str: String = row.try_get("status")?;
    let status = status_str.parse::<AnrufStatus>().map_err(DbError::intern)?;

    Ok(AnrufRecord {
        id: uuid_spalte(row, "id")?,
        room_id: uuid_spalte(row, "room_id")?,
        call_type,
        initiator_id: uuid_spalte(row, "initiator_id")?,
        status,
        started_at: zeit_spalte(row, "started_at")?,
        ended_at: opt_zeit_spalte(row, "ended_at")?,
    })
}

fn row_to_teilnehmer(row: &sqlx::sqlite::SqliteRow) -> DbResult<TeilnehmerRecord> {
    Ok(TeilnehmerRecord {
        call_id: uuid_spalte(row, "call_id")?,
        user_id: uuid_spalte(row, "user_id")?,
        is_audio_enabled: bool_spalte(row, "is_audio_enabled")?,
        is_video_enabled: bool_spalte(row, "is_video_enabled")?,
        is_screen_sharing: bool_spalte(row, "is_screen_sharing")?,
        is_connected: bool_spalte(row, "is_connected")?,
        joined_at: zeit_spalte(row, "joined_at")?,
        left_at: opt_zeit_spalte(row, "left_at")?,
    })
}
