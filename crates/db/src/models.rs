//! Datenbankmodelle fuer roomhub
//!
//! Diese Typen repraesentieren Datensaetze aus der Datenbank.
//! Sie sind von den Wire-Typen getrennt und dienen als reine Datenuebertragungsobjekte.

use chrono::{DateTime, Utc};
use roomhub_core::{CallId, CallTyp, MessageId, MitgliedRolle, RoomId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Benutzer
// ---------------------------------------------------------------------------

/// Benutzer-Datensatz aus der Datenbank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenutzerRecord {
    pub id: UserId,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Raeume
// ---------------------------------------------------------------------------

/// Zulaessiger Bereich fuer die Raumkapazitaet
pub const KAPAZITAET_MIN: u32 = 1;
pub const KAPAZITAET_MAX: u32 = 50;
pub const KAPAZITAET_STANDARD: u32 = 10;

/// Raum-Datensatz
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaumRecord {
    pub id: RoomId,
    pub name: String,
    pub description: String,
    pub topic: String,
    pub is_private: bool,
    pub capacity: u32,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Daten zum Erstellen eines neuen Raums
#[derive(Debug, Clone)]
pub struct NeuerRaum<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub topic: &'a str,
    pub is_private: bool,
    pub capacity: u32,
    pub owner_id: UserId,
}

impl<'a> NeuerRaum<'a> {
    pub fn neu(name: &'a str, owner_id: UserId) -> Self {
        Self {
            name,
            description: "",
            topic: "",
            is_private: false,
            capacity: KAPAZITAET_STANDARD,
            owner_id,
        }
    }
}

/// Aenderbare Raumfelder (Allow-List der Raumeinstellungen)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RaumUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub topic: Option<String>,
    pub capacity: Option<u32>,
    pub is_private: Option<bool>,
}

impl RaumUpdate {
    pub fn ist_leer(&self) -> bool {
        self == &Self::default()
    }
}

// ---------------------------------------------------------------------------
// Mitgliedschaften
// ---------------------------------------------------------------------------

/// Mitgliedschaft eines Benutzers in einem Raum
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MitgliedschaftRecord {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub role: MitgliedRolle,
    pub muted_until: Option<DateTime<Utc>>,
    pub joined_at: DateTime<Utc>,
}

impl MitgliedschaftRecord {
    /// Prueft ob die Stummschaltung zum Zeitpunkt `jetzt` noch aktiv ist
    pub fn ist_stummgeschaltet(&self, jetzt: DateTime<Utc>) -> bool {
        self.muted_until.map(|bis| bis > jetzt).unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Nachrichten
// ---------------------------------------------------------------------------

/// Nachrichten-Typ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NachrichtenTyp {
    Chat,
    File,
    Join,
    Leave,
    System,
}

impl NachrichtenTyp {
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::File => "file",
            Self::Join => "join",
            Self::Leave => "leave",
            Self::System => "system",
        }
    }
}

impl std::str::FromStr for NachrichtenTyp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat" => Ok(Self::Chat),
            "file" => Ok(Self::File),
            "join" => Ok(Self::Join),
            "leave" => Ok(Self::Leave),
            "system" => Ok(Self::System),
            _ => Err(format!("Unbekannter Nachrichtentyp: {s}")),
        }
    }
}

/// Nachrichten-Datensatz; `content` ist immer Ciphertext
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NachrichtRecord {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_id: Option<UserId>,
    pub content: String,
    pub message_type: NachrichtenTyp,
    pub replied_to: Option<MessageId>,
    pub file_id: Option<Uuid>,
    pub is_edited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Daten zum Erstellen einer neuen Nachricht
#[derive(Debug, Clone)]
pub struct NeueNachricht<'a> {
    pub room_id: RoomId,
    pub sender_id: Option<UserId>,
    pub content: &'a str,
    pub message_type: NachrichtenTyp,
    pub replied_to: Option<MessageId>,
}

// ---------------------------------------------------------------------------
// Reaktionen
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaktionRecord {
    pub message_id: MessageId,
    pub user_id: UserId,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Anrufe
// ---------------------------------------------------------------------------

/// Status einer CallSession
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnrufStatus {
    Active,
    Ended,
}

impl AnrufStatus {
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Ended => "ended",
        }
    }
}

impl std::str::FromStr for AnrufStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "ended" => Ok(Self::Ended),
            _ => Err(format!("Unbekannter Anrufstatus: {s}")),
        }
    }
}

/// CallSession-Datensatz
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnrufRecord {
    pub id: CallId,
    pub room_id: RoomId,
    pub call_type: CallTyp,
    pub initiator_id: UserId,
    pub status: AnrufStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// CallParticipant-Datensatz
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeilnehmerRecord {
    pub call_id: CallId,
    pub user_id: UserId,
    pub is_audio_enabled: bool,
    pub is_video_enabled: bool,
    pub is_screen_sharing: bool,
    pub is_connected: bool,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
}

impl TeilnehmerRecord {
    /// Aktiv solange kein Austrittszeitpunkt gesetzt ist
    pub fn ist_aktiv(&self) -> bool {
        self.left_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn stummschaltung_nur_in_der_zukunft() {
        let jetzt = Utc::now();
        let mut m = MitgliedschaftRecord {
            room_id: RoomId::new(),
            user_id: UserId::new(),
            role: MitgliedRolle::Member,
            muted_until: None,
            joined_at: jetzt,
        };
        assert!(!m.ist_stummgeschaltet(jetzt));

        m.muted_until = Some(jetzt + Duration::minutes(10));
        assert!(m.ist_stummgeschaltet(jetzt));

        m.muted_until = Some(jetzt - Duration::seconds(1));
        assert!(!m.ist_stummgeschaltet(jetzt));
    }

    #[test]
    fn raum_update_leer() {
        assert!(RaumUpdate::default().ist_leer());
        let u = RaumUpdate {
            topic: Some("Mathe".into()),
            ..Default::default()
        };
        assert!(!u.ist_leer());
    }

    #[test]
    fn nachrichtentyp_parsen() {
        assert_eq!("join".parse::<NachrichtenTyp>().unwrap(), NachrichtenTyp::Join);
        assert!("pomodoro".parse::<NachrichtenTyp>().is_err());
    }
}
