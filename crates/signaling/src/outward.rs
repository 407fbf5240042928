//! Broadcast-API fuer Schichten ausserhalb des Hubs
//!
//! Die REST-Schicht aendert Zustand (Beitritt per HTTP, Datei-Upload, ...)
//! und verteilt die passenden Ereignisse ueber diese Funktionen an die
//! Live-Verbindungen.

use roomhub_core::{RoomId, UserId};
use roomhub_db::models::NachrichtenTyp;
use roomhub_db::RoomStore;
use roomhub_protocol::ServerEvent;

use crate::error::{HubError, HubResult};
use crate::handlers::{benutzername, chat_event};
use crate::server_state::HubState;

impl<D: RoomStore> HubState<D> {
    /// Sendet ein Ereignis an alle Verbindungen eines Raums
    ///
    /// Gibt die Anzahl erfolgreich eingereihter Zustellungen zurueck.
    pub fn an_raum_senden(&self, room_id: RoomId, event: &ServerEvent) -> usize {
        self.registry.an_raum_senden(&room_id, event)
    }

    /// Sendet ein Ereignis an alle Verbindungen eines Benutzers, raumuebergreifend
    pub fn an_user_senden(&self, user_id: UserId, event: &ServerEvent) -> usize {
        self.registry.an_user_senden(&user_id, event)
    }

    /// Persistiert und verteilt die Beitritts-Systemnachricht
    pub async fn mitglied_beigetreten(&self, room_id: RoomId, user_id: UserId) -> HubResult<()> {
        self.systemnachricht_verteilen(room_id, user_id, NachrichtenTyp::Join)
            .await
    }

    /// Persistiert und verteilt die Austritts-Systemnachricht
    pub async fn mitglied_verlassen(&self, room_id: RoomId, user_id: UserId) -> HubResult<()> {
        self.systemnachricht_verteilen(room_id, user_id, NachrichtenTyp::Leave)
            .await
    }

    async fn systemnachricht_verteilen(
        &self,
        room_id: RoomId,
        user_id: UserId,
        typ: NachrichtenTyp,
    ) -> HubResult<()> {
        let name = benutzername(self, user_id)
            .await?
            .ok_or_else(|| HubError::nicht_gefunden("User not found"))?;

        let nachricht = self
            .chat
            .systemnachricht(room_id, user_id, &name, typ)
            .await?;

        tracing::debug!(
            room_id = %room_id,
            user_id = %user_id,
            typ = %typ.als_str(),
            "Systemnachricht verteilt"
        );
        self.registry.an_raum_senden(&room_id, &chat_event(nachricht));
        Ok(())
    }
}
