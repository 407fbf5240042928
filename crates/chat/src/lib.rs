//! roomhub-chat – Nachrichtendienst des Raum-Hubs
//!
//! Dieses Crate implementiert:
//! - ChatService: Nachrichten senden (verschluesselt), editieren, loeschen
//! - Antwort-Vorschauen mit Entschluesselungs-Platzhalter
//! - Lesebestaetigungen und Ungelesen-Zaehler
//! - Reaktionen (Emoji pro Benutzer und Nachricht)
//! - Systemnachrichten fuer Beitritt/Austritt
//!
//! # Beispiel
//!
//! ```no_run
//! use std::sync::Arc;
//! use roomhub_chat::ChatService;
//! use roomhub_crypto::NachrichtenCipher;
//! use roomhub_db::SqliteDb;
//!
//! #[tokio::main]
//! async fn main() {
//!     let db = Arc::new(SqliteDb::in_memory().await.unwrap());
//!     let cipher = Arc::new(NachrichtenCipher::aus_geheimnis("geheim").unwrap());
//!     let chat = ChatService::neu(db, cipher, 4096);
//! }
//! ```

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod tests;

// Bequeme Re-Exporte
pub use error::{ChatError, ChatResult};
pub use service::ChatService;
pub use types::{AntwortVorschau, ChatNachricht, GesehenErgebnis, ReaktionsUebersicht, EMOJI_MAX_LAENGE};
