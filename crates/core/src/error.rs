//! Fehlertypen fuer roomhub
//!
//! Gemeinsamer Fehler-Enum fuer Werte, die ausserhalb eines einzelnen
//! Crates geparst oder validiert werden.

use thiserror::Error;

/// Globaler Result-Alias fuer roomhub-core
pub type Result<T> = std::result::Result<T, RoomhubError>;

#[derive(Debug, Error)]
pub enum RoomhubError {
    #[error("Ungueltige Rolle: {0}")]
    UngueltigeRolle(String),

    #[error("Ungueltiger Anruftyp: {0}")]
    UngueltigerAnrufTyp(String),

    #[error("Ungueltiger Medientyp: {0}")]
    UngueltigerMedienTyp(String),

    #[error("Ungueltige ID: {0}")]
    UngueltigeId(String),

    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl RoomhubError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }
}
