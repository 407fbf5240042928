//! Oeffentliche Typen fuer den Chat-Service

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use roomhub_core::{MessageId, RoomId, UserId};
use roomhub_db::models::NachrichtenTyp;
use serde::{Deserialize, Serialize};

/// Maximale Emoji-Laenge in Zeichen
pub const EMOJI_MAX_LAENGE: usize = 10;

/// Eine entschluesselte Chat-Nachricht (Domain-Typ, nicht DB-Record)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatNachricht {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_id: Option<UserId>,
    pub username: Option<String>,
    /// Klartext oder Entschluesselungs-Platzhalter
    pub message: String,
    pub message_type: NachrichtenTyp,
    pub is_edited: bool,
    pub created_at: DateTime<Utc>,
    pub replied_to_message: Option<AntwortVorschau>,
}

/// Vorschau der Nachricht, auf die geantwortet wird
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntwortVorschau {
    pub id: MessageId,
    pub message: String,
    pub username: Option<String>,
}

/// Ergebnis einer Lesebestaetigung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GesehenErgebnis {
    /// true wenn die Lesebestaetigung neu angelegt wurde
    pub neu: bool,
    /// Ungelesene Nachrichten des Benutzers im Raum nach der Bestaetigung
    pub ungelesen: i64,
}

/// Emoji -> Benutzer, die so reagiert haben
pub type ReaktionsUebersicht = BTreeMap<String, Vec<UserId>>;
