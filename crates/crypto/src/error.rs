//! Fehlertypen fuer das Kryptografie-Subsystem

use thiserror::Error;

/// Fehler im Kryptografie-Subsystem
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Verschluesselung fehlgeschlagen: {0}")]
    Verschluesselung(String),

    #[error("Entschluesselung fehlgeschlagen: {0}")]
    Entschluesselung(String),

    #[error("Ungueltige Schluessel-Laenge: erwartet {erwartet}, erhalten {erhalten}")]
    UngueltigeSchluesselLaenge { erwartet: usize, erhalten: usize },

    #[error("Ungueltige Daten: {0}")]
    UngueltigeDaten(String),

    #[error("Key Derivation fehlgeschlagen: {0}")]
    KeyDerivation(String),

    #[error("Base64-Dekodierung fehlgeschlagen: {0}")]
    Base64(#[from] base64::DecodeError),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
