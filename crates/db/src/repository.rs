//! Repository-Trait-Definitionen
//!
//! Das Repository-Pattern entkoppelt den Hub von der konkreten
//! Datenbank-Implementierung. Die Traits sind per `async_trait` definiert,
//! damit die Futures `Send` sind und aus beliebigen Tokio-Tasks (eine pro
//! WebSocket-Verbindung) aufgerufen werden koennen.
//!
//! Methodennamen sind ueber alle Traits eindeutig, damit generischer Code
//! mit `D: RoomStore` ohne voll qualifizierte Aufrufe auskommt.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use roomhub_core::{CallId, CallTyp, MedienTyp, MessageId, MitgliedRolle, RoomId, UserId};

use crate::error::DbError;
use crate::models::{
    AnrufRecord, BenutzerRecord, MitgliedschaftRecord, NachrichtRecord, NeueNachricht, NeuerRaum,
    RaumRecord, RaumUpdate, ReaktionRecord, TeilnehmerRecord,
};

/// Result-Alias fuer Datenbankoperationen
pub type DbResult<T> = Result<T, DbError>;

/// Konfiguration fuer die Datenbankverbindung
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Verbindungs-URL (z.B. "sqlite://roomhub.db")
    pub url: String,
    /// Maximale Anzahl gleichzeitiger Verbindungen im Pool
    pub max_verbindungen: u32,
    /// Ob WAL-Modus bei SQLite aktiviert werden soll
    pub sqlite_wal: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://roomhub.db".into(),
            max_verbindungen: 5,
            sqlite_wal: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Benutzer
// ---------------------------------------------------------------------------

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, username: &str) -> DbResult<BenutzerRecord>;
    async fn get_user(&self, id: UserId) -> DbResult<Option<BenutzerRecord>>;
}

// ---------------------------------------------------------------------------
// Raeume & Mitgliedschaften
// ---------------------------------------------------------------------------

#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn create_room(&self, data: NeuerRaum<'_>) -> DbResult<RaumRecord>;
    async fn get_room(&self, id: RoomId) -> DbResult<Option<RaumRecord>>;
    /// Aktualisiert nur die gesetzten Felder; Fehler `NichtGefunden` wenn der Raum fehlt
    async fn update_room(&self, id: RoomId, update: RaumUpdate) -> DbResult<RaumRecord>;
}

#[async_trait]
pub trait MembershipRepository: Send + Sync {
    async fn get_membership(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> DbResult<Option<MitgliedschaftRecord>>;

    /// Legt die Mitgliedschaft an oder liefert die bestehende unveraendert
    async fn ensure_membership(
        &self,
        room_id: RoomId,
        user_id: UserId,
        role: MitgliedRolle,
    ) -> DbResult<MitgliedschaftRecord>;

    /// Gibt false zurueck wenn keine Mitgliedschaft existiert
    async fn set_role(&self, room_id: RoomId, user_id: UserId, role: MitgliedRolle)
        -> DbResult<bool>;

    async fn set_muted_until(
        &self,
        room_id: RoomId,
        user_id: UserId,
        bis: Option<DateTime<Utc>>,
    ) -> DbResult<bool>;

    async fn delete_membership(&self, room_id: RoomId, user_id: UserId) -> DbResult<bool>;
}

// ---------------------------------------------------------------------------
// Nachrichten, Lesebestaetigungen, Reaktionen
// ---------------------------------------------------------------------------

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create_message(&self, data: NeueNachricht<'_>) -> DbResult<NachrichtRecord>;
    async fn get_message(&self, id: MessageId) -> DbResult<Option<NachrichtRecord>>;
    /// Ersetzt den Ciphertext und setzt `is_edited`
    async fn update_message_content(&self, id: MessageId, content: &str)
        -> DbResult<NachrichtRecord>;
    async fn delete_message(&self, id: MessageId) -> DbResult<bool>;
    /// Nachrichten fremder Absender im Raum minus eigene Lesebestaetigungen im Raum
    async fn unread_count(&self, room_id: RoomId, user_id: UserId) -> DbResult<i64>;
}

#[async_trait]
pub trait SeenRepository: Send + Sync {
    /// Get-or-create; true wenn die Zeile neu angelegt wurde
    async fn mark_seen(&self, message_id: MessageId, user_id: UserId) -> DbResult<bool>;
    async fn seen_by(&self, message_id: MessageId) -> DbResult<Vec<UserId>>;
}

#[async_trait]
pub trait ReactionRepository: Send + Sync {
    /// Get-or-create; true wenn die Reaktion neu ist
    async fn add_reaction(&self, message_id: MessageId, user_id: UserId, emoji: &str)
        -> DbResult<bool>;
    async fn remove_reaction(
        &self,
        message_id: MessageId,
        user_id: UserId,
        emoji: &str,
    ) -> DbResult<bool>;
    async fn reactions_for(&self, message_id: MessageId) -> DbResult<Vec<ReaktionRecord>>;
}

// ---------------------------------------------------------------------------
// Anrufe
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CallRepository: Send + Sync {
    async fn active_call(&self, room_id: RoomId) -> DbResult<Option<AnrufRecord>>;

    /// Fehler `Eindeutigkeit` wenn im Raum bereits ein aktiver Anruf existiert
    async fn create_call(
        &self,
        room_id: RoomId,
        initiator_id: UserId,
        call_type: CallTyp,
    ) -> DbResult<AnrufRecord>;

    async fn end_call(&self, call_id: CallId) -> DbResult<bool>;

    /// Tritt bei oder tritt erneut bei (loescht einen alten Austrittszeitpunkt)
    async fn join_call(
        &self,
        call_id: CallId,
        user_id: UserId,
        audio: bool,
        video: bool,
    ) -> DbResult<TeilnehmerRecord>;

    /// Gibt false zurueck wenn der Benutzer kein aktiver Teilnehmer war
    async fn leave_call(&self, call_id: CallId, user_id: UserId) -> DbResult<bool>;

    /// Markiert alle aktiven Teilnehmer als ausgetreten
    async fn leave_all(&self, call_id: CallId) -> DbResult<u64>;

    async fn active_participants(&self, call_id: CallId) -> DbResult<Vec<TeilnehmerRecord>>;

    async fn get_participant(
        &self,
        call_id: CallId,
        user_id: UserId,
    ) -> DbResult<Option<TeilnehmerRecord>>;

    /// Gibt false zurueck wenn der Benutzer kein aktiver Teilnehmer ist
    async fn set_media(
        &self,
        call_id: CallId,
        user_id: UserId,
        medium: MedienTyp,
        aktiv: bool,
    ) -> DbResult<bool>;
}

/// Gesamter Speicher-Kollaborator des Hubs
pub trait RoomStore:
    UserRepository
    + RoomRepository
    + MembershipRepository
    + MessageRepository
    + SeenRepository
    + ReactionRepository
    + CallRepository
    + 'static
{
}

impl<T> RoomStore for T where
    T: UserRepository
        + RoomRepository
        + MembershipRepository
        + MessageRepository
        + SeenRepository
        + ReactionRepository
        + CallRepository
        + 'static
{
}
