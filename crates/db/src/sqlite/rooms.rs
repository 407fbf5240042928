//! SQLite-Implementierung von RoomRepository und MembershipRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use roomhub_core::{MitgliedRolle, RoomId, UserId};

use crate::error::DbError;
use crate::models::{
    MitgliedschaftRecord, NeuerRaum, RaumRecord, RaumUpdate, KAPAZITAET_MAX, KAPAZITAET_MIN,
};
use crate::repository::{DbResult, MembershipRepository, RoomRepository};
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::row::{bool_spalte, opt_zeit_spalte, uuid_spalte, zeit_spalte, zeitstempel};

fn kapazitaet_pruefen(capacity: u32) -> DbResult<()> {
    if !(KAPAZITAET_MIN..=KAPAZITAET_MAX).contains(&capacity) {
        return Err(DbError::UngueltigeDaten(format!(
            "Kapazitaet {capacity} ausserhalb von {KAPAZITAET_MIN}..={KAPAZITAET_MAX}"
        )));
    }
    Ok(())
}

#[async_trait]
impl RoomRepository for SqliteDb {
    async fn create_room(&self, data: NeuerRaum<'_>) -> DbResult<RaumRecord> {
        kapazitaet_pruefen(data.capacity)?;

        let id = RoomId::new();
        let now = Utc::now();
        let now_str = zeitstempel(now);

        sqlx::query(
            "INSERT INTO rooms
             (id, name, description, topic, is_private, capacity, owner_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.inner().to_string())
        .bind(data.name)
        .bind(data.description)
        .bind(data.topic)
        .bind(data.is_private as i64)
        .bind(data.capacity as i64)
        .bind(data.owner_id.inner().to_string())
        .bind(&now_str)
        .bind(&now_str)
        .execute(&self.pool)
        .await?;

        Ok(RaumRecord {
            id,
            name: data.name.to_string(),
            description: data.description.to_string(),
            topic: data.topic.to_string(),
            is_private: data.is_private,
            capacity: data.capacity,
            owner_id: data.owner_id,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_room(&self, id: RoomId) -> DbResult<Option<RaumRecord>> {
        let row = sqlx::query(
            "SELECT id, name, description, topic, is_private, capacity, owner_id,
                    created_at, updated_at
             FROM rooms WHERE id = ?",
        )
        .bind(id.inner().to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_raum(&r)).transpose()
    }

    async fn update_room(&self, id: RoomId, update: RaumUpdate) -> DbResult<RaumRecord> {
        let mut raum = self
            .get_room(id)
            .await?
            .ok_or_else(|| DbError::nicht_gefunden(format!("Raum {id}")))?;

        if let Some(capacity) = update.capacity {
            kapazitaet_pruefen(capacity)?;
            raum.capacity = capacity;
        }
        if let Some(name) = update.name {
            raum.name = name;
        }
        if let Some(description) = update.description {
            raum.description = description;
        }
        if let Some(topic) = update.topic {
            raum.topic = topic;
        }
        if let Some(is_private) = update.is_private {
            raum.is_private = is_private;
        }
        raum.updated_at = Utc::now();

        sqlx::query(
            "UPDATE rooms
             SET name = ?, description = ?, topic = ?, is_private = ?, capacity = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&raum.name)
        .bind(&raum.description)
        .bind(&raum.topic)
        .bind(raum.is_private as i64)
        .bind(raum.capacity as i64)
        .bind(zeitstempel(raum.updated_at))
        .bind(id.inner().to_string())
        .execute(&self.pool)
        .await?;

        Ok(raum)
    }
}

#[async_trait]
impl MembershipRepository for SqliteDb {
    async fn get_membership(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> DbResult<Option<MitgliedschaftRecord>> {
        let row = sqlx::query(
            "SELECT room_id, user_id, role, muted_until, joined_at
             FROM room_memberships WHERE room_id = ? AND user_id = ?",
        )
        .bind(room_id.inner().to_string())
        .bind(user_id.inner().to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_mitgliedschaft(&r)).transpose()
    }

    async fn ensure_membership(
        &self,
        room_id: RoomId,
        user_id: UserId,
        role: MitgliedRolle,
    ) -> DbResult<MitgliedschaftRecord> {
        sqlx::query(
            "INSERT OR IGNORE INTO room_memberships (room_id, user_id, role, joined_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(room_id.inner().to_string())
        .bind(user_id.inner().to_string())
        .bind(role.als_str())
        .bind(zeitstempel(Utc::now()))
        .execute(&self.pool)
        .await?;

        self.get_membership(room_id, user_id)
            .await?
            .ok_or_else(|| DbError::intern("Mitgliedschaft nach Insert nicht lesbar"))
    }

    async fn set_role(
        &self,
        room_id: RoomId,
        user_id: UserId,
        role: MitgliedRolle,
    ) -> DbResult<bool> {
        let affected = sqlx::query(
            "UPDATE room_memberships SET role = ? WHERE room_id = ? AND user_id = ?",
        )
        .bind(role.als_str())
        .bind(room_id.inner().to_string())
        .bind(user_id.inner().to_string())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected > 0)
    }

    async fn set_muted_until(
        &self,
        room_id: RoomId,
        user_id: UserId,
        bis: Option<DateTime<Utc>>,
    ) -> DbResult<bool> {
        let affected = sqlx::query(
            "UPDATE room_memberships SET muted_until = ? WHERE room_id = ? AND user_id = ?",
        )
        .bind(bis.map(zeitstempel))
        .bind(room_id.inner().to_string())
        .bind(user_id.inner().to_string())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected > 0)
    }

    async fn delete_membership(&self, room_id: RoomId, user_id: UserId) -> DbResult<bool> {
        let affected =
            sqlx::query("DELETE FROM room_memberships WHERE room_id = ? AND user_id = ?")
                .bind(room_id.inner().to_string())
                .bind(user_id.inner().to_string())
                .execute(&self.pool)
                .await?
                .rows_affected();

        Ok(affected > 0)
    }
}

fn row_to_raum(row: &sqlx::sqlite::SqliteRow) -> DbResult<RaumRecord> {
    use sqlx::Row as _;

    let capacity: i64 = row.try_get("capacity")?;

    Ok(RaumRecord {
        id: uuid_spalte(row, "id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        topic: row.try_get("topic")?,
        is_private: bool_spalte(row, "is_private")?,
        capacity: u32::try_from(capacity)
            .map_err(|_| DbError::intern(format!("Ungueltige Kapazitaet {capacity}")))?,
        owner_id: uuid_spalte(row, "owner_id")?,
        created_at: zeit_spalte(row, "created_at")?,
        updated_at: zeit_spalte(row, "updated_at")?,
    })
}

fn row_to_mitgliedschaft(row: &sqlx::sqlite::SqliteRow) -> DbResult<MitgliedschaftRecord> {
    use sqlx::Row as _;

    let rolle_str: String = row.try_get("role")?;
    let role = rolle_str
        .parse::<MitgliedRolle>()
        .map_err(|e| DbError::intern(e.to_string()))?;

    Ok(MitgliedschaftRecord {
        room_id: uuid_spalte(row, "room_id")?,
        user_id: uuid_spalte(row, "user_id")?,
        role,
        muted_until: opt_zeit_spalte(row, "muted_until")?,
        joined_at: zeit_spalte(row, "joined_at")?,
    })
}
