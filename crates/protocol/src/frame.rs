//! Dekodierung eingehender Text-Frames
//!
//! Unbekannte `type`-Werte werden still ignoriert. Kaputte Frames und
//! bekannte Typen mit ungueltiger Nutzlast sind Validierungsfehler.

use serde_json::Value;

use crate::command::ClientBefehl;

/// Ergebnis der Frame-Dekodierung
#[derive(Debug, Clone, PartialEq)]
pub enum Eingang {
    Befehl(ClientBefehl),
    /// Unbekannter Typ, wird nicht beantwortet
    Ignoriert { typ: String },
    /// Fehlermeldung fuer den Absender
    Ungueltig(String),
}

/// Dekodiert einen Text-Frame in einen Befehl
pub fn frame_dekodieren(text: &str) -> Eingang {
    let mut wert: Value = match serde_json::from_str(text) {
        Ok(w) => w,
        Err(_) => return Eingang::Ungueltig("Invalid JSON".into()),
    };

    let Some(objekt) = wert.as_object_mut() else {
        return Eingang::Ungueltig("Frame must be a JSON object".into());
    };

    let typ = match objekt.get("type") {
        Some(Value::String(t)) => t.clone(),
        Some(_) => return Eingang::Ungueltig("Event type must be a string".into()),
        // Aeltere Clients senden Chat-Nachrichten ohne `type`
        None if objekt.contains_key("message") => {
            objekt.insert("type".into(), Value::String("chat_message".into()));
            "chat_message".to_string()
        }
        None => return Eingang::Ungueltig("Missing event type".into()),
    };

    match serde_json::from_value::<ClientBefehl>(wert) {
        Ok(ClientBefehl::Unbekannt) => Eingang::Ignoriert { typ },
        Ok(befehl) => Eingang::Befehl(befehl),
        Err(e) => Eingang::Ungueltig(format!("Invalid payload for {typ}: {e}")),
    }
}
