//! Fehlertypen fuer den Raum-Hub
//!
//! Der `Display`-Text jeder Variante ist die Meldung, die der Client im
//! `error`-Ereignis erhaelt. Speicher- und interne Details werden nur
//! geloggt, nie gesendet.

use chrono::{DateTime, Utc};
use roomhub_auth::AuthError;
use roomhub_chat::ChatError;
use roomhub_db::DbError;
use thiserror::Error;

/// Fehlertyp fuer den Raum-Hub
#[derive(Debug, Error)]
pub enum HubError {
    /// Keine gueltige Identitaet beim Handshake
    #[error("Authentication required")]
    Authentifizierung,

    /// Rollen- oder Besitzpruefung fehlgeschlagen
    #[error("{0}")]
    ZugriffVerweigert(String),

    /// Raum, Nachricht, Benutzer oder Anruf existiert nicht
    #[error("{0}")]
    NichtGefunden(String),

    /// Pflichtfeld fehlt oder Wert ausserhalb des erlaubten Bereichs
    #[error("{0}")]
    Validierung(String),

    /// Absender ist im Raum stummgeschaltet
    #[error("You are muted until {}", .bis.to_rfc3339())]
    Stummgeschaltet { bis: DateTime<Utc> },

    /// Speicher nicht erreichbar oder Abfrage fehlgeschlagen
    #[error("Storage temporarily unavailable, please retry")]
    Speicher(String),

    #[error("Internal server error")]
    Intern(String),
}

impl HubError {
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    pub fn validierung(msg: impl Into<String>) -> Self {
        Self::Validierung(msg.into())
    }

    pub fn nicht_gefunden(msg: impl Into<String>) -> Self {
        Self::NichtGefunden(msg.into())
    }

    /// Label fuer `roomhub_befehle_abgelehnt_gesamt`
    pub fn grund(&self) -> &'static str {
        match self {
            Self::Authentifizierung => "authentifizierung",
            Self::ZugriffVerweigert(_) => "zugriff_verweigert",
            Self::NichtGefunden(_) => "nicht_gefunden",
            Self::Validierung(_) => "validierung",
            Self::Stummgeschaltet { .. } => "stummgeschaltet",
            Self::Speicher(_) => "speicher",
            Self::Intern(_) => "intern",
        }
    }

    /// Detail fuer das Log (bei Speicher/Intern nicht im Display enthalten)
    pub fn detail(&self) -> String {
        match self {
            Self::Speicher(d) | Self::Intern(d) => d.clone(),
            anders => anders.to_string(),
        }
    }
}

impl From<DbError> for HubError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NichtGefunden(_) => Self::NichtGefunden("Not found".into()),
            DbError::UngueltigeDaten(msg) => Self::Validierung(msg),
            anders => Self::Speicher(anders.to_string()),
        }
    }
}

impl From<ChatError> for HubError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::NachrichtNichtGefunden(msg) => Self::NichtGefunden(msg),
            ChatError::KeineBerechtigung(msg) => Self::ZugriffVerweigert(msg),
            ChatError::Stummgeschaltet { bis } => Self::Stummgeschaltet { bis },
            ChatError::UngueltigeEingabe(msg) => Self::Validierung(msg),
            ChatError::Verschluesselung(e) => Self::Intern(e.to_string()),
            ChatError::DatenbankFehler(e) => e.into(),
        }
    }
}

impl From<AuthError> for HubError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::ZugriffVerweigert(msg) => Self::ZugriffVerweigert(msg),
            AuthError::RaumNichtGefunden(_) => Self::NichtGefunden("Room not found".into()),
            AuthError::Datenbank(e) => e.into(),
            AuthError::SessionUngueltig
            | AuthError::SessionAbgelaufen
            | AuthError::TokenUngueltig(_) => Self::Authentifizierung,
            AuthError::Intern(msg) => Self::Intern(msg),
        }
    }
}

/// Result-Typ fuer den Raum-Hub
pub type HubResult<T> = Result<T, HubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speicherdetails_gehen_nicht_an_den_client() {
        let e: HubError = DbError::intern("disk I/O error at /var/lib/roomhub.db").into();
        assert_eq!(e.to_string(), "Storage temporarily unavailable, please retry");
        assert!(e.detail().contains("disk I/O"));
        assert_eq!(e.grund(), "speicher");
    }

    #[test]
    fn chat_fehler_werden_abgebildet() {
        let e: HubError = ChatError::KeineBerechtigung("You can only edit your own messages".into()).into();
        assert_eq!(e.to_string(), "You can only edit your own messages");
        assert_eq!(e.grund(), "zugriff_verweigert");

        let e: HubError = ChatError::DatenbankFehler(DbError::nicht_gefunden("x")).into();
        assert!(matches!(e, HubError::NichtGefunden(_)));
    }

    #[test]
    fn auth_verweigerung_behaelt_meldung() {
        let e: HubError = AuthError::verweigert("Cannot kick room owner").into();
        assert_eq!(e.to_string(), "Cannot kick room owner");
    }
}
