//! roomhub Server – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet den Server.

use anyhow::Result;
use roomhub_observability::logging_initialisieren;
use roomhub_server::{config::ServerConfig, Server};

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var("ROOMHUB_CONFIG").unwrap_or_else(|_| "config.toml".into());

    // Konfiguration laden (Standardwerte falls Datei fehlt), Geheimnisse aus der Umgebung
    let config = ServerConfig::laden(&config_pfad)?.umgebung_anwenden();

    logging_initialisieren(&config.logging.level, &config.logging.format);
    config.pruefen()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "roomhub Server wird initialisiert"
    );

    Server::neu(config).starten().await
}
