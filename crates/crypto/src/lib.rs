//! # roomhub-crypto
//!
//! Verschluesselung von Chat-Nachrichteninhalten im Ruhezustand.
//!
//! Der Hub speichert Nachrichten ausschliesslich als Ciphertext. Beim
//! Ausliefern wird entschluesselt; schlaegt das fehl, erscheint statt des
//! Inhalts ein fester Platzhalter, damit der Verlauf trotzdem darstellbar
//! bleibt.
//!
//! ## Module
//! - `cipher` - AES-256-GCM Nachrichten-Cipher mit HKDF-abgeleitetem Schluessel
//! - `error` - Fehlertypen

pub mod cipher;
pub mod error;

// Bequeme Re-Exports
pub use cipher::{hkdf_derive, NachrichtenCipher, ENTSCHLUESSELUNG_PLATZHALTER};
pub use error::{CryptoError, CryptoResult};
