//! Presence-Store – Wer ist in welchem Raum online
//!
//! Pro Raum ein Hash `room:<id>:online` mit einem Eintrag je Benutzer.
//! Die Backends bieten nur atomare Einzeloperationen auf dem Hash
//! (eintragen, austragen, auflisten); ein Read-Modify-Write ueber den
//! ganzen Raum findet nicht statt. Join/Leave laufen im Hub pro Raum
//! unter `presence_sperren`.
//!
//! Eintraege haben kein TTL; entfernt wird nur explizit.

use async_trait::async_trait;
use roomhub_core::{MitgliedRolle, RoomId, UserId};
use roomhub_protocol::PresenceUser;
use serde::{Deserialize, Serialize};

use crate::error::HubResult;

mod memory;
#[cfg(feature = "redis")]
mod redis_cache;

pub use memory::InMemoryPresenceCache;
#[cfg(feature = "redis")]
pub use redis_cache::RedisPresenceCache;

/// Presence-Eintrag eines Benutzers in einem Raum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEintrag {
    pub user_id: UserId,
    pub username: String,
    pub role: MitgliedRolle,
}

impl From<PresenceEintrag> for PresenceUser {
    fn from(e: PresenceEintrag) -> Self {
        PresenceUser {
            id: e.user_id,
            username: e.username,
            role: e.role,
        }
    }
}

/// Schluessel des Presence-Hashs eines Raums
pub fn raum_schluessel(room_id: &RoomId) -> String {
    format!("room:{}:online", room_id.inner())
}

/// Stabile Reihenfolge fuer Snapshots
pub(crate) fn sortieren(eintraege: &mut [PresenceEintrag]) {
    eintraege.sort_by(|a, b| {
        a.username
            .cmp(&b.username)
            .then_with(|| a.user_id.inner().cmp(&b.user_id.inner()))
    });
}

/// Gemeinsamer Presence-Speicher
#[async_trait]
pub trait PresenceCache: Send + Sync {
    /// Setzt den Eintrag des Benutzers (ueberschreibt eine alte Rolle)
    async fn eintragen(&self, room_id: RoomId, eintrag: PresenceEintrag) -> HubResult<()>;

    /// Gibt true zurueck wenn ein Eintrag entfernt wurde
    async fn austragen(&self, room_id: RoomId, user_id: UserId) -> HubResult<bool>;

    /// Alle Eintraege eines Raums, sortiert nach Benutzername
    async fn auflisten(&self, room_id: RoomId) -> HubResult<Vec<PresenceEintrag>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schluessel_format() {
        let raum = RoomId(uuid::Uuid::nil());
        assert_eq!(
            raum_schluessel(&raum),
            "room:00000000-0000-0000-0000-000000000000:online"
        );
    }
}
