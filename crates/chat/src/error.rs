//! Fehlertypen fuer das Chat-Crate
//!
//! Die String-Nutzlasten sind fuer den Client formuliert.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Chat-Fehlertypen
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Nachricht nicht gefunden: {0}")]
    NachrichtNichtGefunden(String),

    #[error("Keine Berechtigung: {0}")]
    KeineBerechtigung(String),

    #[error("Stummgeschaltet bis {bis}")]
    Stummgeschaltet { bis: DateTime<Utc> },

    #[error("Ungueltige Eingabe: {0}")]
    UngueltigeEingabe(String),

    #[error("Verschluesselungs-Fehler: {0}")]
    Verschluesselung(#[from] roomhub_crypto::CryptoError),

    #[error("Datenbank-Fehler: {0}")]
    DatenbankFehler(#[from] roomhub_db::DbError),
}

pub type ChatResult<T> = Result<T, ChatError>;
