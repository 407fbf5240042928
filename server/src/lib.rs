//! roomhub-server – Bibliotheks-Root
//!
//! Verdrahtet Speicher, Identitaet, Presence und Hub und startet den
//! HTTP/WebSocket-Server plus den Observability-Server.

pub mod config;

use anyhow::Result;
use config::{PresenceBackend, PresenceEinstellungen, ServerConfig};
use roomhub_auth::{JwtResolver, ResolverKette, SessionStore};
use roomhub_crypto::NachrichtenCipher;
use roomhub_db::SqliteDb;
use roomhub_observability::{observability_server_starten, HealthState, HubMetriken};
use roomhub_signaling::{ws_router, HubState, InMemoryPresenceCache, PresenceCache};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

/// Intervall des Speicher-Checks fuer `/health`
const SPEICHER_CHECK_INTERVALL: Duration = Duration::from_secs(30);

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Datenbank oeffnen und migrieren
    /// 2. Cipher, Identitaets-Resolver und Presence-Backend aufbauen
    /// 3. Observability-Server starten
    /// 4. HTTP/WebSocket-Server starten
    /// 5. Auf Ctrl-C warten, dann alle Verbindungen per watch-Kanal schliessen
    pub async fn starten(self) -> Result<()> {
        let cfg = self.config;
        tracing::info!(
            server_name = %cfg.server.name,
            http = %cfg.http_bind_adresse(),
            metrics = %cfg.metrics_bind_adresse(),
            "Server startet"
        );

        let db = Arc::new(SqliteDb::oeffnen(&cfg.datenbank_config()).await?);
        let cipher = Arc::new(NachrichtenCipher::aus_geheimnis(
            &cfg.sicherheit.verschluesselungs_schluessel,
        )?);

        let sessions = SessionStore::mit_ttl(cfg.sicherheit.session_ttl_sek);
        SessionStore::cleanup_starten(&sessions);

        let mut resolver = ResolverKette::neu();
        if cfg.sicherheit.jwt_secret.is_empty() {
            tracing::warn!("Kein JWT-Secret konfiguriert – nur Session-Tokens werden akzeptiert");
        } else {
            resolver = resolver.mit(Arc::new(JwtResolver::neu(
                Arc::clone(&db),
                cfg.sicherheit.jwt_secret.as_bytes(),
            )));
        }
        resolver = resolver.mit(sessions);

        let presence = presence_backend(&cfg.presence).await?;

        let metriken = HubMetriken::neu()?;
        let health = HealthState::neu(metriken.clone());
        let hub = HubState::neu(
            cfg.hub_config(),
            Arc::clone(&db),
            cipher,
            Arc::new(resolver),
            presence,
            metriken.clone(),
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let metrics_addr: SocketAddr = cfg.metrics_bind_adresse().parse()?;
        let observability = tokio::spawn(observability_server_starten(
            metrics_addr,
            metriken,
            health.clone(),
            shutdown_rx.clone(),
        ));

        tokio::spawn(speicher_ueberwachen(
            Arc::clone(&db),
            health,
            shutdown_rx.clone(),
        ));

        let app = ws_router(hub, shutdown_rx).layer(TraceLayer::new_for_http());
        let listener = tokio::net::TcpListener::bind(cfg.http_bind_adresse()).await?;
        tracing::info!(adresse = %cfg.http_bind_adresse(), "HTTP/WebSocket-Server bereit");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(fehler = %e, "Ctrl-C-Handler fehlgeschlagen");
                }
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                let _ = shutdown_tx.send(true);
            })
            .await?;

        match observability.await {
            Ok(Err(e)) => tracing::warn!(fehler = %e, "Observability-Server mit Fehler beendet"),
            Err(e) => tracing::warn!(fehler = %e, "Observability-Task abgebrochen"),
            Ok(Ok(())) => {}
        }

        tracing::info!("Server beendet");
        Ok(())
    }
}

/// Waehlt das Presence-Backend aus der Konfiguration
async fn presence_backend(einstellungen: &PresenceEinstellungen) -> Result<Arc<dyn PresenceCache>> {
    match einstellungen.backend {
        PresenceBackend::Memory => {
            tracing::info!("Presence im Prozessspeicher");
            Ok(Arc::new(InMemoryPresenceCache::neu()))
        }
        #[cfg(feature = "redis")]
        PresenceBackend::Redis => {
            let cache = roomhub_signaling::RedisPresenceCache::verbinden(&einstellungen.redis_url).await?;
            tracing::info!(url = %einstellungen.redis_url, "Presence in Redis");
            Ok(Arc::new(cache))
        }
        #[cfg(not(feature = "redis"))]
        PresenceBackend::Redis => {
            anyhow::bail!("Presence-Backend 'redis' erfordert das Feature 'redis'")
        }
    }
}

/// Prueft periodisch den Speicher und setzt den Health-Status
async fn speicher_ueberwachen(db: Arc<SqliteDb>, health: HealthState, mut shutdown_rx: watch::Receiver<bool>) {
    let mut intervall = tokio::time::interval(SPEICHER_CHECK_INTERVALL);
    loop {
        tokio::select! {
            _ = intervall.tick() => {
                let ok = db.erreichbar().await;
                if !ok {
                    tracing::warn!("Speicher nicht erreichbar");
                }
                health.speicher_status_setzen(ok);
            }
            Ok(()) = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
}
