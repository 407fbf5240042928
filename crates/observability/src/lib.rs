//! # roomhub-observability
//!
//! Observability-Crate fuer roomhub:
//! - Prometheus-kompatible Metriken des Hubs (`/metrics`)
//! - Health-Check-Endpunkt (`/health`)
//! - Structured Logging (Text oder JSON) via tracing-subscriber

pub mod health;
pub mod logging;
pub mod metrics;

pub use health::{health_router, HealthResponse, HealthState, HealthStatus};
pub use logging::logging_initialisieren;
pub use metrics::{metrics_router, HubMetriken};

use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;
use tokio::sync::watch;

/// Router mit `/metrics` und `/health`
pub fn observability_router(metriken: HubMetriken, health: HealthState) -> Router {
    Router::new()
        .merge(metrics_router(metriken))
        .merge(health_router(health))
}

/// Startet den Observability-HTTP-Server (Metriken + Health)
///
/// Endpunkte:
/// - `GET /metrics` – Prometheus scrape format
/// - `GET /health`  – Health-Check JSON
///
/// Beendet sich, sobald `shutdown_rx` auf `true` wechselt.
pub async fn observability_server_starten(
    bind_addr: SocketAddr,
    metriken: HubMetriken,
    health: HealthState,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    let app = observability_router(metriken, health);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Observability-Server gestartet");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while shutdown_rx.changed().await.is_ok() {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        })
        .await?;
    Ok(())
}
