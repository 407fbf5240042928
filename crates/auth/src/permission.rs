//! Permission-Evaluator fuer Raum-Moderation
//!
//! Reine Entscheidungsfunktionen (ohne I/O) plus ein `PermissionService`,
//! der Besitz und Mitgliedsrolle aus dem Speicher laedt und die
//! Entscheidung anwendet.
//!
//! ```text
//! erlaubt(raum, actor, rollen) =
//!     actor ist Besitzer               -> true
//!     rolle(raum, actor) in rollen     -> true
//!     sonst                            -> false
//! ```
//!
//! Sonderregeln: ein Kick darf nie den Besitzer treffen; Rollen aendern
//! duerfen nur Admins und der Besitzer.

use std::sync::Arc;

use roomhub_core::{MitgliedRolle, RoomId, UserId};
use roomhub_db::{models::RaumRecord, MembershipRepository, RoomRepository};

use crate::error::{AuthError, AuthResult};

/// Rollen mit Moderationsrechten (Kick, Stummschalten, Anruf beenden)
pub const MODERATION_ROLLEN: &[MitgliedRolle] = &[MitgliedRolle::Moderator, MitgliedRolle::Admin];

/// Rollen, die andere Rollen vergeben duerfen
pub const ROLLEN_VERWALTUNG: &[MitgliedRolle] = &[MitgliedRolle::Admin];

pub const KICK_BESITZER: &str = "Cannot kick room owner";
pub const KICK_VERWEIGERT: &str = "You do not have permission to kick users";
pub const BEFOERDERN_VERWEIGERT: &str = "Only admins or the room owner can change roles";
pub const STUMM_VERWEIGERT: &str = "You do not have permission to mute users";
pub const EINSTELLUNGEN_VERWEIGERT: &str = "Only the room owner can update room settings";
pub const ANRUF_BEENDEN_VERWEIGERT: &str = "You do not have permission to end this call";

/// Reine Rollenentscheidung
pub fn erlaubt(ist_besitzer: bool, rolle: Option<MitgliedRolle>, erforderlich: &[MitgliedRolle]) -> bool {
    if ist_besitzer {
        return true;
    }
    rolle.map(|r| erforderlich.contains(&r)).unwrap_or(false)
}

/// Kick-Entscheidung; der Besitzer ist unabhaengig von der Rolle des Akteurs geschuetzt
pub fn kick_entscheiden(
    actor_ist_besitzer: bool,
    actor_rolle: Option<MitgliedRolle>,
    ziel_ist_besitzer: bool,
) -> Result<(), &'static str> {
    if ziel_ist_besitzer {
        return Err(KICK_BESITZER);
    }
    if !erlaubt(actor_ist_besitzer, actor_rolle, MODERATION_ROLLEN) {
        return Err(KICK_VERWEIGERT);
    }
    Ok(())
}

/// Permission-Service ueber dem Raum- und Mitgliedschaftsspeicher
pub struct PermissionService<D> {
    store: Arc<D>,
}

impl<D> Clone for PermissionService<D> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<D: RoomRepository + MembershipRepository> PermissionService<D> {
    pub fn neu(store: Arc<D>) -> Self {
        Self { store }
    }

    async fn raum_laden(&self, room_id: RoomId) -> AuthResult<RaumRecord> {
        self.store
            .get_room(room_id)
            .await?
            .ok_or_else(|| AuthError::RaumNichtGefunden(room_id.to_string()))
    }

    /// Aktuelle Mitgliedsrolle, `None` ohne Mitgliedschaft
    pub async fn rolle(&self, room_id: RoomId, user_id: UserId) -> AuthResult<Option<MitgliedRolle>> {
        Ok(self
            .store
            .get_membership(room_id, user_id)
            .await?
            .map(|m| m.role))
    }

    pub async fn ist_besitzer(&self, room_id: RoomId, user_id: UserId) -> AuthResult<bool> {
        Ok(self.raum_laden(room_id).await?.owner_id == user_id)
    }

    /// `allowed(room, actor, requiredRoles)`
    pub async fn pruefen(
        &self,
        room_id: RoomId,
        actor: UserId,
        erforderlich: &[MitgliedRolle],
    ) -> AuthResult<bool> {
        let raum = self.raum_laden(room_id).await?;
        let rolle = self.rolle(room_id, actor).await?;
        Ok(erlaubt(raum.owner_id == actor, rolle, erforderlich))
    }

    async fn erfordern(
        &self,
        room_id: RoomId,
        actor: UserId,
        erforderlich: &[MitgliedRolle],
        meldung: &str,
    ) -> AuthResult<()> {
        if self.pruefen(room_id, actor, erforderlich).await? {
            Ok(())
        } else {
            tracing::debug!(room_id = %room_id, user_id = %actor, grund = meldung, "Zugriff verweigert");
            Err(AuthError::verweigert(meldung))
        }
    }

    pub async fn kick_erfordern(&self, room_id: RoomId, actor: UserId, ziel: UserId) -> AuthResult<()> {
        let raum = self.raum_laden(room_id).await?;
        let rolle = self.rolle(room_id, actor).await?;
        kick_entscheiden(raum.owner_id == actor, rolle, raum.owner_id == ziel).map_err(|meldung| {
            tracing::debug!(room_id = %room_id, user_id = %actor, ziel = %ziel, grund = meldung, "Kick verweigert");
            AuthError::verweigert(meldung)
        })
    }

    pub async fn befoerdern_erfordern(&self, room_id: RoomId, actor: UserId) -> AuthResult<()> {
        self.erfordern(room_id, actor, ROLLEN_VERWALTUNG, BEFOERDERN_VERWEIGERT)
            .await
    }

    pub async fn stummschalten_erfordern(&self, room_id: RoomId, actor: UserId) -> AuthResult<()> {
        self.erfordern(room_id, actor, MODERATION_ROLLEN, STUMM_VERWEIGERT)
            .await
    }

    /// Nur der Besitzer; liefert den aktuellen Raum fuer das Update zurueck
    pub async fn einstellungen_erfordern(&self, room_id: RoomId, actor: UserId) -> AuthResult<RaumRecord> {
        let raum = self.raum_laden(room_id).await?;
        if raum.owner_id != actor {
            return Err(AuthError::verweigert(EINSTELLUNGEN_VERWEIGERT));
        }
        Ok(raum)
    }

    /// Besitzer, Moderatoren/Admins oder der Initiator des Anrufs
    pub async fn anruf_beenden_erfordern(
        &self,
        room_id: RoomId,
        actor: UserId,
        initiator: UserId,
    ) -> AuthResult<()> {
        if actor == initiator {
            return Ok(());
        }
        self.erfordern(room_id, actor, MODERATION_ROLLEN, ANRUF_BEENDEN_VERWEIGERT)
            .await
    }
}
