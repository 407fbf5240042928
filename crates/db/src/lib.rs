//! roomhub-db – Speicher-Abstraktion
//!
//! Dieses Crate stellt das Repository-Pattern bereit, ueber das der Hub
//! Raeume, Mitgliedschaften, Nachrichten, Lesebestaetigungen, Reaktionen und
//! Anrufe liest und schreibt. Die mitgelieferte Implementierung ist SQLite
//! via sqlx; Migrationen liegen unter `migrations/`.

pub mod error;
pub mod models;
pub mod repository;
pub mod sqlite;

pub use error::DbError;
pub use repository::{
    CallRepository, DatabaseConfig, DbResult, MembershipRepository, MessageRepository,
    ReactionRepository, RoomRepository, RoomStore, SeenRepository, UserRepository,
};
pub use sqlite::SqliteDb;
