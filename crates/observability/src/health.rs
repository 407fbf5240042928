//! Health-Check-Endpunkt
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime und Anzahl offener Verbindungen

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::HubMetriken;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_sek: u64,
    pub verbindungen: i64,
}

/// Geteilter Zustand fuer den Health-Check-Handler
#[derive(Clone)]
pub struct HealthState {
    start_time: Arc<Instant>,
    speicher_ok: Arc<AtomicBool>,
    metriken: HubMetriken,
}

impl HealthState {
    pub fn neu(metriken: HubMetriken) -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            speicher_ok: Arc::new(AtomicBool::new(true)),
            metriken,
        }
    }

    pub fn uptime_sek(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Wird vom Server gesetzt, wenn der Speicher nicht erreichbar ist
    pub fn speicher_status_setzen(&self, ok: bool) {
        self.speicher_ok.store(ok, Ordering::Relaxed);
    }

    pub fn antwort(&self) -> HealthResponse {
        let status = if self.speicher_ok.load(Ordering::Relaxed) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_sek: self.uptime_sek(),
            verbindungen: self.metriken.verbindungen_aktiv.get(),
        }
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – 200 auch bei degraded, die Probe soll nicht failen
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.antwort()))
}
