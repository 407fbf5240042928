//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `RUST_LOG`: Filter-Direktiven (z.B. `roomhub_signaling=debug`), hat Vorrang
//!   vor dem Level aus der Konfiguration
//! - `ROOMHUB_LOG_FORMAT`: Format (text/json), hat Vorrang vor der Konfiguration

use tracing_subscriber::{fmt, EnvFilter};

/// Initialisiert das Logging-System.
///
/// Faellt auf `info` / `text` zurueck falls weder Umgebung noch Konfiguration
/// etwas Gueltiges liefern.
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match log_format_aus_env(format).as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_current_span(true)
                .init();
        }
        _ => {
            fmt().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Log-Format aus `ROOMHUB_LOG_FORMAT`, sonst der uebergebene Standard
pub fn log_format_aus_env(standard: &str) -> String {
    std::env::var("ROOMHUB_LOG_FORMAT").unwrap_or_else(|_| standard.to_string())
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_werte() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(log_level_gueltig(level));
        }
        assert!(!log_level_gueltig("verbose"));
        assert!(!log_level_gueltig("INFO")); // Gross-/Kleinschreibung
        assert!(!log_level_gueltig(""));
    }

    #[test]
    fn log_format_werte() {
        assert!(log_format_gueltig("text"));
        assert!(log_format_gueltig("json"));
        assert!(!log_format_gueltig("xml"));
        assert!(!log_format_gueltig("JSON"));
    }

    #[test]
    fn log_format_aus_env_umgebung_und_fallback() {
        std::env::remove_var("ROOMHUB_LOG_FORMAT");
        assert_eq!(log_format_aus_env("text"), "text");

        std::env::set_var("ROOMHUB_LOG_FORMAT", "json");
        assert_eq!(log_format_aus_env("text"), "json");
        std::env::remove_var("ROOMHUB_LOG_FORMAT");
    }
}
