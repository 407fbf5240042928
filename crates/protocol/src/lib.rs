//! roomhub-protocol – Wire-Protokoll des Raum-Hubs
//!
//! Dieses Crate definiert alle Frames, die zwischen Client und Hub ueber
//! die WebSocket-Verbindung ausgetauscht werden. Jeder Frame ist ein
//! JSON-Objekt mit einem `type`-Feld.
//!
//! - `command`: eingehende Befehle (Client -> Hub) als geschlossener Tagged-Enum
//! - `event`: ausgehende Ereignisse (Hub -> Client)
//! - `frame`: Dekodierung mit toleranter Behandlung unbekannter Typen

pub mod command;
pub mod event;
pub mod frame;

pub use command::ClientBefehl;
pub use event::{AnrufEndeGrund, PresenceUser, ReplyPreview, RoomInfo, ServerEvent};
pub use frame::{frame_dekodieren, Eingang};
