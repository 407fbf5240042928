//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte; Geheimnisse koennen per Umgebungsvariable
//! gesetzt werden (`ROOMHUB_JWT_SECRET`, `ROOMHUB_ENCRYPTION_KEY`).

use roomhub_db::DatabaseConfig;
use roomhub_signaling::HubConfig;
use serde::{Deserialize, Serialize};

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Datenbank-Einstellungen
    pub datenbank: DatenbankEinstellungen,
    /// Geheimnisse fuer Token und Nachrichten-Verschluesselung
    pub sicherheit: SicherheitsEinstellungen,
    /// Hub-Einstellungen (Keepalive, Queues, Moderation)
    pub hub: HubEinstellungen,
    /// Presence-Backend
    pub presence: PresenceEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "roomhub".into(),
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    pub bind_adresse: String,
    /// Port fuer HTTP und WebSocket
    pub http_port: u16,
    /// Port fuer Metriken und Health
    pub metrics_port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            http_port: 8000,
            metrics_port: 9100,
        }
    }
}

/// Datenbank-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatenbankEinstellungen {
    /// Verbindungs-URL
    pub url: String,
    /// Maximale Verbindungspool-Groesse
    pub max_verbindungen: u32,
    pub sqlite_wal: bool,
}

impl Default for DatenbankEinstellungen {
    fn default() -> Self {
        let standard = DatabaseConfig::default();
        Self {
            url: standard.url,
            max_verbindungen: standard.max_verbindungen,
            sqlite_wal: standard.sqlite_wal,
        }
    }
}

/// Geheimnisse; leer bedeutet "nicht gesetzt"
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SicherheitsEinstellungen {
    /// HS256-Secret fuer JWT (leer = JWT-Aufloesung deaktiviert)
    pub jwt_secret: String,
    /// Geheimnis, aus dem der Nachrichtenschluessel abgeleitet wird
    pub verschluesselungs_schluessel: String,
    /// Lebensdauer der In-Memory-Sessions
    pub session_ttl_sek: i64,
}

impl Default for SicherheitsEinstellungen {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            verschluesselungs_schluessel: String::new(),
            session_ttl_sek: 24 * 60 * 60,
        }
    }
}

/// Hub-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubEinstellungen {
    pub keepalive_sek: u64,
    pub verbindungs_timeout_sek: u64,
    /// Ausstehende Ereignisse pro Verbindung, danach wird verworfen
    pub send_queue_groesse: usize,
    pub mute_standard_minuten: i64,
    pub max_nachrichten_laenge: usize,
}

impl Default for HubEinstellungen {
    fn default() -> Self {
        let standard = HubConfig::default();
        Self {
            keepalive_sek: standard.keepalive_sek,
            verbindungs_timeout_sek: standard.verbindungs_timeout_sek,
            send_queue_groesse: standard.send_queue_groesse,
            mute_standard_minuten: standard.mute_standard_minuten,
            max_nachrichten_laenge: standard.max_nachrichten_laenge,
        }
    }
}

/// Presence-Backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceEinstellungen {
    pub backend: PresenceBackend,
    pub redis_url: String,
}

impl Default for PresenceEinstellungen {
    fn default() -> Self {
        Self {
            backend: PresenceBackend::Memory,
            redis_url: "redis://127.0.0.1:6379".into(),
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => Self::aus_toml(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    pub fn aus_toml(inhalt: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(inhalt)
    }

    /// Uebernimmt Geheimnisse aus der Umgebung (haben Vorrang vor der Datei)
    pub fn umgebung_anwenden(mut self) -> Self {
        self.umgebung_anwenden_mit(|name| std::env::var(name).ok());
        self
    }

    fn umgebung_anwenden_mit(&mut self, lesen: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lesen("ROOMHUB_JWT_SECRET").filter(|s| !s.is_empty()) {
            self.sicherheit.jwt_secret = secret;
        }
        if let Some(schluessel) = lesen("ROOMHUB_ENCRYPTION_KEY").filter(|s| !s.is_empty()) {
            self.sicherheit.verschluesselungs_schluessel = schluessel;
        }
    }

    /// Prueft Werte, die der Server nicht selbst korrigieren kann
    pub fn pruefen(&self) -> anyhow::Result<()> {
        if self.sicherheit.verschluesselungs_schluessel.is_empty() {
            anyhow::bail!(
                "sicherheit.verschluesselungs_schluessel fehlt (oder ROOMHUB_ENCRYPTION_KEY setzen)"
            );
        }
        if !roomhub_observability::logging::log_level_gueltig(&self.logging.level) {
            anyhow::bail!("Ungueltiges Log-Level '{}'", self.logging.level);
        }
        if !roomhub_observability::logging::log_format_gueltig(&self.logging.format) {
            anyhow::bail!("Ungueltiges Log-Format '{}'", self.logging.format);
        }
        if self.hub.send_queue_groesse == 0 {
            anyhow::bail!("hub.send_queue_groesse muss groesser als 0 sein");
        }
        if self.hub.mute_standard_minuten <= 0 {
            anyhow::bail!("hub.mute_standard_minuten muss positiv sein");
        }
        if self.hub.keepalive_sek >= self.hub.verbindungs_timeout_sek {
            anyhow::bail!("hub.keepalive_sek muss kleiner als hub.verbindungs_timeout_sek sein");
        }
        Ok(())
    }

    /// Gibt die Bind-Adresse fuer HTTP/WebSocket zurueck
    pub fn http_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.http_port)
    }

    /// Gibt die Bind-Adresse fuer den Observability-Server zurueck
    pub fn metrics_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.metrics_port)
    }

    pub fn datenbank_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.datenbank.url.clone(),
            max_verbindungen: self.datenbank.max_verbindungen,
            sqlite_wal: self.datenbank.sqlite_wal,
        }
    }

    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            keepalive_sek: self.hub.keepalive_sek,
            verbindungs_timeout_sek: self.hub.verbindungs_timeout_sek,
            send_queue_groesse: self.hub.send_queue_groesse,
            mute_standard_minuten: self.hub.mute_standard_minuten,
            max_nachrichten_laenge: self.hub.max_nachrichten_laenge,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mit_schluessel() -> ServerConfig {
        let mut cfg = ServerConfig::default();
        cfg.sicherheit.verschluesselungs_schluessel = "geheim".into();
        cfg
    }

    #[test]
    fn standard_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.netzwerk.http_port, 8000);
        assert_eq!(cfg.netzwerk.metrics_port, 9100);
        assert_eq!(cfg.datenbank.url, "sqlite://roomhub.db");
        assert_eq!(cfg.hub.mute_standard_minuten, 10);
        assert_eq!(cfg.presence.backend, PresenceBackend::Memory);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.http_bind_adresse(), "0.0.0.0:8000");
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [netzwerk]
            http_port = 8080

            [hub]
            send_queue_groesse = 16

            [presence]
            backend = "redis"
            redis_url = "redis://cache:6379"
        "#;
        let cfg = ServerConfig::aus_toml(toml).unwrap();
        assert_eq!(cfg.netzwerk.http_port, 8080);
        assert_eq!(cfg.hub_config().send_queue_groesse, 16);
        assert_eq!(cfg.presence.backend, PresenceBackend::Redis);
        assert_eq!(cfg.presence.redis_url, "redis://cache:6379");
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.netzwerk.metrics_port, 9100);
        assert_eq!(cfg.hub.keepalive_sek, 30);
    }

    #[test]
    fn unbekanntes_presence_backend() {
        assert!(ServerConfig::aus_toml("[presence]\nbackend = \"memcached\"").is_err());
    }

    #[test]
    fn umgebung_ueberschreibt_geheimnisse() {
        let mut cfg = ServerConfig::default();
        cfg.sicherheit.jwt_secret = "aus-datei".into();
        cfg.umgebung_anwenden_mit(|name| match name {
            "ROOMHUB_JWT_SECRET" => Some("aus-env".into()),
            "ROOMHUB_ENCRYPTION_KEY" => Some(String::new()),
            _ => None,
        });
        assert_eq!(cfg.sicherheit.jwt_secret, "aus-env");
        assert!(cfg.sicherheit.verschluesselungs_schluessel.is_empty());
    }

    #[test]
    fn pruefen() {
        assert!(ServerConfig::default().pruefen().is_err());
        assert!(mit_schluessel().pruefen().is_ok());

        let mut cfg = mit_schluessel();
        cfg.hub.keepalive_sek = 120;
        assert!(cfg.pruefen().is_err());

        let mut cfg = mit_schluessel();
        cfg.logging.level = "laut".into();
        assert!(cfg.pruefen().is_err());
    }
}
