//! Gemeinsame Identifikationstypen fuer roomhub
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen. Auf dem Draht
//! (JSON) erscheinen sie als nackte UUID, im Log mit Praefix.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RoomhubError;

macro_rules! id_typ {
    ($(#[$meta:meta])* $name:ident, $praefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Erstellt eine neue zufaellige ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Gibt die innere UUID zurueck
            pub fn inner(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($praefix, ":{}"), self.0)
            }
        }

        impl FromStr for $name {
            type Err = RoomhubError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let roh = s.strip_prefix(concat!($praefix, ":")).unwrap_or(s);
                Uuid::parse_str(roh)
                    .map(Self)
                    .map_err(|_| RoomhubError::UngueltigeId(s.to_string()))
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

id_typ!(
    /// Eindeutige Raum-ID
    RoomId,
    "room"
);
id_typ!(
    /// Eindeutige Benutzer-ID
    UserId,
    "user"
);
id_typ!(
    /// Eindeutige Nachrichten-ID
    MessageId,
    "msg"
);
id_typ!(
    /// Eindeutige Anruf-ID (CallSession)
    CallId,
    "call"
);
id_typ!(
    /// Eindeutige ID einer einzelnen Client-Verbindung
    ///
    /// Ein Benutzer kann mehrere Verbindungen gleichzeitig halten
    /// (mehrere Tabs, mehrere Geraete).
    ConnectionId,
    "conn"
);

// ---------------------------------------------------------------------------
// Mitgliedsrolle
// ---------------------------------------------------------------------------

/// Rolle eines Mitglieds innerhalb eines Raums
///
/// Der Raumbesitzer ist keine Rolle, sondern ein Attribut des Raums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MitgliedRolle {
    #[default]
    Member,
    Moderator,
    Admin,
}

impl MitgliedRolle {
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for MitgliedRolle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.als_str())
    }
}

impl FromStr for MitgliedRolle {
    type Err = RoomhubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Self::Member),
            "moderator" => Ok(Self::Moderator),
            "admin" => Ok(Self::Admin),
            _ => Err(RoomhubError::UngueltigeRolle(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Anrufe
// ---------------------------------------------------------------------------

/// Art eines Anrufs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CallTyp {
    Audio,
    #[default]
    Video,
}

impl CallTyp {
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

impl FromStr for CallTyp {
    type Err = RoomhubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            _ => Err(RoomhubError::UngueltigerAnrufTyp(s.to_string())),
        }
    }
}

/// Umschaltbares Medium eines Anrufteilnehmers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MedienTyp {
    Audio,
    Video,
    Screen,
}

impl MedienTyp {
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Screen => "screen",
        }
    }
}

impl FromStr for MedienTyp {
    type Err = RoomhubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            "screen" => Ok(Self::Screen),
            _ => Err(RoomhubError::UngueltigerMedienTyp(s.to_string())),
        }
    }
}
