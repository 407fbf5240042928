//! Fehlertypen fuer den Auth-Service

use thiserror::Error;

/// Alle moeglichen Fehler im Auth-Service
#[derive(Debug, Error)]
pub enum AuthError {
    // --- Session ---
    #[error("Session nicht gefunden oder abgelaufen")]
    SessionUngueltig,

    #[error("Session abgelaufen")]
    SessionAbgelaufen,

    // --- JWT ---
    #[error("Token ungueltig: {0}")]
    TokenUngueltig(String),

    // --- Berechtigungen ---
    /// Die Nachricht geht unveraendert an den Client
    #[error("Zugriff verweigert: {0}")]
    ZugriffVerweigert(String),

    #[error("Raum nicht gefunden: {0}")]
    RaumNichtGefunden(String),

    // --- Datenbank ---
    #[error("Datenbankfehler: {0}")]
    Datenbank(#[from] roomhub_db::DbError),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl AuthError {
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    pub fn verweigert(msg: impl Into<String>) -> Self {
        Self::ZugriffVerweigert(msg.into())
    }
}

/// Result-Alias fuer den Auth-Service
pub type AuthResult<T> = Result<T, AuthError>;
