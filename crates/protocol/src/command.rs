//! Eingehende Befehle (Client -> Hub)
//!
//! ## Design
//! - Ein geschlossener Tagged-Enum (`type`-Feld), exhaustiv gematcht im Router
//! - Unbekannte `type`-Werte landen in `Unbekannt` und werden ignoriert
//! - Pflichtfelder sind `Option`; fehlende Felder lehnt der Handler mit
//!   eigener Meldung ab

use roomhub_core::{CallTyp, MessageId, UserId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Nutzlasten
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatMessageRequest {
    /// Aeltere Clients senden den Text als `message`
    #[serde(default, alias = "message")]
    pub content: Option<String>,
    #[serde(default, alias = "replied_to", alias = "reply_to_id")]
    pub reply_to: Option<MessageId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditMessageRequest {
    #[serde(default)]
    pub message_id: Option<MessageId>,
    #[serde(default, alias = "message")]
    pub content: Option<String>,
}

/// Befehl, der sich auf genau eine Nachricht bezieht
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageRef {
    #[serde(default)]
    pub message_id: Option<MessageId>,
}

fn wahr() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypingRequest {
    #[serde(default = "wahr")]
    pub is_typing: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReactionRequest {
    #[serde(default)]
    pub message_id: Option<MessageId>,
    #[serde(default)]
    pub emoji: Option<String>,
}

/// Befehl, der sich auf einen anderen Benutzer bezieht
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    #[serde(default)]
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromoteRequest {
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Als String, damit ungueltige Rollen gezielt abgelehnt werden koennen
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MuteRequest {
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Dauer in Minuten
    #[serde(default)]
    pub duration: Option<i64>,
}

/// Allow-List der aenderbaren Raumfelder; andere Schluessel werden ignoriert
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomSettings {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub capacity: Option<i64>,
    #[serde(default)]
    pub is_private: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomSettingsRequest {
    #[serde(default)]
    pub settings: RoomSettings,
}

/// WebRTC-Relay-Frame; der Inhalt wird nicht interpretiert
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayRequest {
    #[serde(default)]
    pub target_user_id: Option<UserId>,
    #[serde(default, alias = "offer", alias = "answer", alias = "candidate")]
    pub payload: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaToggleRequest {
    #[serde(default)]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartCallRequest {
    #[serde(default)]
    pub call_type: Option<CallTyp>,
}

// ---------------------------------------------------------------------------
// Befehl
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientBefehl {
    // Chat
    ChatMessage(ChatMessageRequest),
    EditMessage(EditMessageRequest),
    DeleteMessage(MessageRef),
    Typing(TypingRequest),
    MarkSeen(MessageRef),
    AddReaction(ReactionRequest),
    RemoveReaction(ReactionRequest),

    // Moderation
    KickUser(UserRef),
    PromoteUser(PromoteRequest),
    MuteUser(MuteRequest),
    UpdateRoomSettings(RoomSettingsRequest),

    // WebRTC-Relay
    WebrtcOffer(RelayRequest),
    WebrtcAnswer(RelayRequest),
    IceCandidate(RelayRequest),

    // Anruf
    StartCall(StartCallRequest),
    CallLeft,
    EndCall,
    CallToggleAudio(MediaToggleRequest),
    CallToggleVideo(MediaToggleRequest),
    CallToggleScreen(MediaToggleRequest),

    /// Jeder andere `type`
    #[serde(other)]
    Unbekannt,
}

impl ClientBefehl {
    /// Wire-Name des Befehls (fuer Logs und Metrik-Labels)
    pub fn typ_name(&self) -> &'static str {
        match self {
            Self::ChatMessage(_) => "chat_message",
            Self::EditMessage(_) => "edit_message",
            Self::DeleteMessage(_) => "delete_message",
            Self::Typing(_) => "typing",
            Self::MarkSeen(_) => "mark_seen",
            Self::AddReaction(_) => "add_reaction",
            Self::RemoveReaction(_) => "remove_reaction",
            Self::KickUser(_) => "kick_user",
            Self::PromoteUser(_) => "promote_user",
            Self::MuteUser(_) => "mute_user",
            Self::UpdateRoomSettings(_) => "update_room_settings",
            Self::WebrtcOffer(_) => "webrtc_offer",
            Self::WebrtcAnswer(_) => "webrtc_answer",
            Self::IceCandidate(_) => "ice_candidate",
            Self::StartCall(_) => "start_call",
            Self::CallLeft => "call_left",
            Self::EndCall => "end_call",
            Self::CallToggleAudio(_) => "call_toggle_audio",
            Self::CallToggleVideo(_) => "call_toggle_video",
            Self::CallToggleScreen(_) => "call_toggle_screen",
            Self::Unbekannt => "unknown",
        }
    }
}
