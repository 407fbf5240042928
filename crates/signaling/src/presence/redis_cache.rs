//! Presence in Redis (Feature `redis`)
//!
//! Ein Hash pro Raum; Feld = User-UUID, Wert = JSON des Eintrags.
//! `HSET`/`HDEL` sind serverseitig atomar, es gibt kein Get-then-Set.

use std::collections::HashMap;

use async_trait::async_trait;
use roomhub_core::{RoomId, UserId};

use super::{raum_schluessel, sortieren, PresenceCache, PresenceEintrag};
use crate::error::{HubError, HubResult};

/// Haelt eine gemultiplexte Verbindung; jeder Aufruf arbeitet auf einem Klon
pub struct RedisPresenceCache {
    conn: redis::aio::MultiplexedConnection,
}

fn redis_fehler(e: redis::RedisError) -> HubError {
    HubError::Speicher(format!("Redis: {e}"))
}

impl RedisPresenceCache {
    /// Verbindet sich mit Redis und prueft die Verbindung per `PING`
    pub async fn verbinden(url: &str) -> HubResult<Self> {
        let client = redis::Client::open(url).map_err(redis_fehler)?;
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(redis_fehler)?;
        let _: String = redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(redis_fehler)?;

        tracing::info!("Redis-Presence verbunden");
        Ok(Self { conn })
    }
}

#[async_trait]
impl PresenceCache for RedisPresenceCache {
    async fn eintragen(&self, room_id: RoomId, eintrag: PresenceEintrag) -> HubResult<()> {
        let wert = serde_json::to_string(&eintrag)
            .map_err(|e| HubError::intern(format!("Presence-Eintrag: {e}")))?;
        let mut conn = self.conn.clone();
        redis::cmd("HSET")
            .arg(raum_schluessel(&room_id))
            .arg(eintrag.user_id.inner().to_string())
            .arg(wert)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(redis_fehler)
    }

    async fn austragen(&self, room_id: RoomId, user_id: UserId) -> HubResult<bool> {
        let mut conn = self.conn.clone();
        let entfernt: i64 = redis::cmd("HDEL")
            .arg(raum_schluessel(&room_id))
            .arg(user_id.inner().to_string())
            .query_async::<_, i64>(&mut conn)
            .await
            .map_err(redis_fehler)?;
        Ok(entfernt > 0)
    }

    async fn auflisten(&self, room_id: RoomId) -> HubResult<Vec<PresenceEintrag>> {
        let mut conn = self.conn.clone();
        let roh: HashMap<String, String> = redis::cmd("HGETALL")
            .arg(raum_schluessel(&room_id))
            .query_async::<_, HashMap<String, String>>(&mut conn)
            .await
            .map_err(redis_fehler)?;

        let mut liste = Vec::with_capacity(roh.len());
        for (feld, wert) in roh {
            match serde_json::from_str::<PresenceEintrag>(&wert) {
                Ok(eintrag) => liste.push(eintrag),
                Err(e) => {
                    tracing::warn!(room_id = %room_id, feld = %feld, fehler = %e, "Kaputter Presence-Eintrag uebersprungen")
                }
            }
        }
        sortieren(&mut liste);
        Ok(liste)
    }
}
