//! SQLite-Pool des Raum-Hubs
//!
//! Betrieb: Datei-Datenbank, optional im WAL-Modus. Tests: `sqlite::memory:`
//! mit genau einer dauerhaft gehaltenen Verbindung. Beide Wege laufen ueber
//! `verbinden`, das die Migrationen anwendet.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info, warn};

use crate::error::DbError;
use crate::repository::DatabaseConfig;

/// Wartezeit auf gesperrte Tabellen, bevor SQLite `SQLITE_BUSY` meldet
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Speicher-Kollaborateur des Hubs auf SQLite-Basis
#[derive(Debug, Clone)]
pub struct SqliteDb {
    pub(crate) pool: SqlitePool,
}

impl SqliteDb {
    /// Oeffnet (oder erzeugt) die Raum-Datenbank aus der Konfiguration
    pub async fn oeffnen(config: &DatabaseConfig) -> Result<Self, DbError> {
        let journal = if config.sqlite_wal {
            SqliteJournalMode::Wal
        } else {
            SqliteJournalMode::Delete
        };
        let opts = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .journal_mode(journal)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true);
        let pool_opts = SqlitePoolOptions::new().max_connections(config.max_verbindungen);

        let db = Self::verbinden(opts, pool_opts).await?;
        info!(
            url = %config.url,
            wal = config.sqlite_wal,
            max_verbindungen = config.max_verbindungen,
            "Raum-Datenbank bereit"
        );
        Ok(db)
    }

    /// In-Memory-Datenbank fuer Tests
    pub async fn in_memory() -> Result<Self, DbError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        // Die Datenbank lebt nur so lange wie ihre einzige Verbindung
        let pool_opts = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);

        Self::verbinden(opts, pool_opts).await
    }

    async fn verbinden(
        opts: SqliteConnectOptions,
        pool_opts: SqlitePoolOptions,
    ) -> Result<Self, DbError> {
        let pool = pool_opts.connect_with(opts).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!("Migrationen angewendet");
        Ok(Self { pool })
    }

    /// Lebenszeichen fuer den Health-Endpunkt
    pub async fn erreichbar(&self) -> bool {
        match sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!(fehler = %e, "Raum-Datenbank nicht erreichbar");
                false
            }
        }
    }

    /// Direkter Pool-Zugriff (Tests)
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
