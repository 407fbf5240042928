//! Prometheus-kompatible Metriken fuer den Raum-Hub
//!
//! Registrierte Metriken:
//! - `roomhub_verbindungen_aktiv` – Gauge: Offene WebSocket-Verbindungen
//! - `roomhub_raeume_aktiv` – Gauge: Raeume mit mindestens einer Verbindung
//! - `roomhub_anrufe_aktiv` – Gauge: Laufende Anrufe
//! - `roomhub_befehle_gesamt` – Counter: Verarbeitete Befehle (typ)
//! - `roomhub_befehl_dauer_sekunden` – Histogram: Verarbeitungsdauer (typ)
//! - `roomhub_befehle_abgelehnt_gesamt` – Counter: Abgelehnte Befehle (grund)
//! - `roomhub_zustellungen_verworfen_gesamt` – Counter: Wegen voller Queue verworfene Ereignisse

use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Alle Hub-Metriken
#[derive(Clone)]
pub struct HubMetriken {
    pub registry: Arc<Registry>,

    pub verbindungen_aktiv: IntGauge,
    pub raeume_aktiv: IntGauge,
    pub anrufe_aktiv: IntGauge,

    pub befehle_gesamt: IntCounterVec,
    pub befehl_dauer_sekunden: HistogramVec,
    pub befehle_abgelehnt_gesamt: IntCounterVec,
    pub zustellungen_verworfen_gesamt: IntCounter,
}

impl HubMetriken {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        // --- Zustand ---
        let verbindungen_aktiv = IntGauge::with_opts(Opts::new(
            "roomhub_verbindungen_aktiv",
            "Anzahl offener WebSocket-Verbindungen",
        ))?;
        registry.register(Box::new(verbindungen_aktiv.clone()))?;

        let raeume_aktiv = IntGauge::with_opts(Opts::new(
            "roomhub_raeume_aktiv",
            "Anzahl Raeume mit mindestens einer Verbindung",
        ))?;
        registry.register(Box::new(raeume_aktiv.clone()))?;

        let anrufe_aktiv = IntGauge::with_opts(Opts::new(
            "roomhub_anrufe_aktiv",
            "Anzahl laufender Anrufe",
        ))?;
        registry.register(Box::new(anrufe_aktiv.clone()))?;

        // --- Befehle ---
        let befehle_gesamt = IntCounterVec::new(
            Opts::new("roomhub_befehle_gesamt", "Gesamtanzahl verarbeiteter Befehle"),
            &["typ"],
        )?;
        registry.register(Box::new(befehle_gesamt.clone()))?;

        let befehl_dauer_sekunden = HistogramVec::new(
            HistogramOpts::new(
                "roomhub_befehl_dauer_sekunden",
                "Verarbeitungsdauer eines Befehls in Sekunden",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 1.0]),
            &["typ"],
        )?;
        registry.register(Box::new(befehl_dauer_sekunden.clone()))?;

        let befehle_abgelehnt_gesamt = IntCounterVec::new(
            Opts::new(
                "roomhub_befehle_abgelehnt_gesamt",
                "Befehle, die mit einem Fehler-Ereignis beantwortet wurden",
            ),
            &["grund"],
        )?;
        registry.register(Box::new(befehle_abgelehnt_gesamt.clone()))?;

        let zustellungen_verworfen_gesamt = IntCounter::with_opts(Opts::new(
            "roomhub_zustellungen_verworfen_gesamt",
            "Ereignisse, die wegen voller Send-Queue verworfen wurden",
        ))?;
        registry.register(Box::new(zustellungen_verworfen_gesamt.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            verbindungen_aktiv,
            raeume_aktiv,
            anrufe_aktiv,
            befehle_gesamt,
            befehl_dauer_sekunden,
            befehle_abgelehnt_gesamt,
            zustellungen_verworfen_gesamt,
        })
    }

    /// Zaehlt einen verarbeiteten Befehl samt Dauer
    pub fn befehl_erfassen(&self, typ: &str, dauer_sek: f64) {
        self.befehle_gesamt.with_label_values(&[typ]).inc();
        self.befehl_dauer_sekunden
            .with_label_values(&[typ])
            .observe(dauer_sek);
    }

    pub fn befehl_abgelehnt(&self, grund: &str) {
        self.befehle_abgelehnt_gesamt.with_label_values(&[grund]).inc();
    }

    pub fn zustellung_verworfen(&self) {
        self.zustellungen_verworfen_gesamt.inc();
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: HubMetriken) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<HubMetriken>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metriken_erstellen_erfolgreich() {
        let metriken = HubMetriken::neu().unwrap();
        assert!(!metriken.registry.gather().is_empty());
    }

    #[test]
    fn gauge_verbindungen() {
        let metriken = HubMetriken::neu().unwrap();
        metriken.verbindungen_aktiv.inc();
        metriken.verbindungen_aktiv.inc();
        metriken.verbindungen_aktiv.dec();
        assert_eq!(metriken.verbindungen_aktiv.get(), 1);
    }

    #[test]
    fn befehle_mit_labels() {
        let metriken = HubMetriken::neu().unwrap();
        metriken.befehl_erfassen("chat_message", 0.002);
        metriken.befehl_erfassen("chat_message", 0.004);
        metriken.befehl_abgelehnt("stummgeschaltet");

        assert_eq!(
            metriken
                .befehle_gesamt
                .with_label_values(&["chat_message"])
                .get(),
            2
        );
        assert_eq!(
            metriken
                .befehle_abgelehnt_gesamt
                .with_label_values(&["stummgeschaltet"])
                .get(),
            1
        );
    }

    #[test]
    fn export_prometheus_format() {
        let metriken = HubMetriken::neu().unwrap();
        metriken.zustellung_verworfen();
        metriken.befehl_erfassen("typing", 0.0001);

        let output = metriken.exportieren().unwrap();
        assert!(output.contains("roomhub_zustellungen_verworfen_gesamt 1"));
        assert!(output.contains("roomhub_befehle_gesamt{typ=\"typing\"} 1"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn zwei_instanzen_kollidieren_nicht() {
        // Jede Instanz hat eine eigene Registry
        let a = HubMetriken::neu().unwrap();
        let b = HubMetriken::neu().unwrap();
        a.verbindungen_aktiv.set(3);
        assert_eq!(b.verbindungen_aktiv.get(), 0);
    }
}
