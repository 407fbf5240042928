//! Befehls-Handler des Raum-Hubs
//!
//! Jeder Handler bekommt die Nutzlast, den Kontext der ausloesenden
//! Verbindung und den Hub-Zustand. Er prueft zuerst alle Vorbedingungen,
//! schreibt dann in den Speicher und verteilt zuletzt die Ereignisse.

pub mod call_handler;
pub mod chat_handler;
pub mod moderation_handler;
pub mod relay_handler;

use roomhub_chat::ChatNachricht;
use roomhub_core::UserId;
use roomhub_db::RoomStore;
use roomhub_protocol::{ReplyPreview, ServerEvent};

use crate::error::{HubError, HubResult};
use crate::server_state::HubState;

/// Wandelt eine Chat-Nachricht in das Wire-Ereignis
pub(crate) fn chat_event(n: ChatNachricht) -> ServerEvent {
    ServerEvent::ChatMessage {
        id: n.id,
        message: n.message,
        username: n.username,
        sender_id: n.sender_id,
        created_at: n.created_at,
        message_type: n.message_type.als_str().to_string(),
        is_edited: n.is_edited,
        replied_to_message: n.replied_to_message.map(|v| ReplyPreview {
            id: v.id,
            message: v.message,
            username: v.username,
        }),
    }
}

/// Pflichtfeld aus einer Nutzlast
pub(crate) fn pflicht<T>(wert: Option<T>, feld: &str) -> HubResult<T> {
    wert.ok_or_else(|| HubError::validierung(format!("{feld} is required")))
}

/// Benutzername aus dem Speicher, `None` wenn der Benutzer fehlt
pub(crate) async fn benutzername<D: RoomStore>(state: &HubState<D>, user_id: UserId) -> HubResult<Option<String>> {
    Ok(state.store.get_user(user_id).await?.map(|u| u.username))
}
