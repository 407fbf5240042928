//! roomhub-signaling – Raum-Hub fuer Echtzeit-Ereignisse
//!
//! Dieser Crate implementiert den Hub hinter `GET /ws/room/{room_id}/`:
//! Live-Verbindungen, Presence, Befehls-Routing, Moderation und das
//! Signaling fuer Raum-Anrufe (WebRTC-Relay, Anruf-Lebenszyklus).
//!
//! ## Architektur
//!
//! ```text
//! ws_router (Handshake: Credential + Raum)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |  Connecting -> Authenticated -> Joined -> Closed
//!     |
//!     v
//! MessageDispatcher
//!     |
//!     +-- ChatHandler        (Nachricht, Edit, Delete, Typing, Seen, Reaktion)
//!     +-- ModerationHandler  (Kick, Promote, Mute, Raum-Einstellungen)
//!     +-- RelayHandler       (Offer, Answer, ICE-Kandidat)
//!     +-- CallHandler        (Start, Verlassen, Beenden, Medien)
//!
//! SessionRegistry – Verbindungen pro Raum und pro Benutzer, Zustellung
//! PresenceCache   – Wer ist im Raum online, mit welcher Rolle
//! ```

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod outward;
pub mod presence;
pub mod registry;
pub mod server_state;
pub mod ws;

// Bequeme Re-Exporte
pub use connection::ClientConnection;
pub use dispatcher::MessageDispatcher;
pub use error::{HubError, HubResult};
pub use lifecycle::{beitreten, frame_verarbeiten, trennen, Beitritt, VerbindungsKontext};
#[cfg(feature = "redis")]
pub use presence::RedisPresenceCache;
pub use presence::{InMemoryPresenceCache, PresenceCache, PresenceEintrag};
pub use registry::{SessionRegistry, CLOSE_GEKICKT};
pub use server_state::{HubConfig, HubState};
pub use ws::ws_router;
