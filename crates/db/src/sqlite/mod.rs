//! SQLite-Backend-Implementierungen fuer alle Repository-Traits

pub mod calls;
pub mod messages;
pub mod pool;
pub mod rooms;
mod row;
pub mod users;

pub use pool::SqliteDb;
