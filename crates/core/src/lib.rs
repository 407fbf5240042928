//! roomhub-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen roomhub-Crates gemeinsam genutzt werden: ID-Newtypes,
//! Mitgliedsrollen und die Aufzaehlungen fuer Anrufe.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{Result, RoomhubError};
pub use types::{
    CallId, CallTyp, ConnectionId, MedienTyp, MessageId, MitgliedRolle, RoomId, UserId,
};
