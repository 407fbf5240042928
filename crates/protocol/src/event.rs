//! Ausgehende Ereignisse (Hub -> Client)
//!
//! Jedes Ereignis wird als JSON-Objekt mit `type` plus Nutzlast serialisiert.
//! Ein Broadcast wird genau einmal serialisiert und als geteilter String an
//! alle Empfaenger-Queues verteilt.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use roomhub_core::{CallId, CallTyp, MedienTyp, MessageId, MitgliedRolle, RoomId, UserId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Bausteine
// ---------------------------------------------------------------------------

/// Eintrag im Presence-Snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUser {
    pub id: UserId,
    pub username: String,
    pub role: MitgliedRolle,
}

/// Vorschau der beantworteten Nachricht
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyPreview {
    pub id: MessageId,
    pub message: String,
    pub username: Option<String>,
}

/// Raumdaten nach einer Einstellungsaenderung
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: RoomId,
    pub name: String,
    pub description: String,
    pub topic: String,
    pub capacity: u32,
    pub is_private: bool,
    pub owner_id: UserId,
}

/// Grund fuer das Ende eines Anrufs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnrufEndeGrund {
    AllParticipantsLeft,
    EndedByHost,
}

// ---------------------------------------------------------------------------
// Ereignis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    PresenceUpdate {
        users: Vec<PresenceUser>,
    },

    // --- Chat ---
    ChatMessage {
        id: MessageId,
        message: String,
        username: Option<String>,
        sender_id: Option<UserId>,
        created_at: DateTime<Utc>,
        message_type: String,
        is_edited: bool,
        replied_to_message: Option<ReplyPreview>,
    },
    MessageUpdate {
        id: MessageId,
        message: String,
        is_edited: bool,
    },
    MessageDelete {
        id: MessageId,
    },
    UserTyping {
        user_id: UserId,
        username: String,
        is_typing: bool,
    },
    UnreadCountUpdate {
        unread_count: i64,
    },
    MessageSeenUpdate {
        message_id: MessageId,
        user_id: UserId,
        username: String,
    },
    ReactionUpdate {
        message_id: MessageId,
        reactions: BTreeMap<String, Vec<UserId>>,
    },

    // --- Moderation ---
    UserKicked {
        user_id: UserId,
        username: Option<String>,
    },
    RemovedFromRoom {
        room_id: RoomId,
        message: String,
    },
    RoleUpdated {
        user_id: UserId,
        username: Option<String>,
        role: MitgliedRolle,
    },
    RoomSettingsUpdated {
        room: RoomInfo,
    },
    UserMuted {
        user_id: UserId,
        username: Option<String>,
        muted_until: DateTime<Utc>,
    },
    YouWereMuted {
        room_id: RoomId,
        muted_until: DateTime<Utc>,
        duration_minutes: i64,
    },

    // --- WebRTC-Relay ---
    WebrtcOffer {
        from_user_id: UserId,
        from_username: String,
        room_id: RoomId,
        offer: serde_json::Value,
    },
    WebrtcAnswer {
        from_user_id: UserId,
        from_username: String,
        room_id: RoomId,
        answer: serde_json::Value,
    },
    IceCandidate {
        from_user_id: UserId,
        from_username: String,
        room_id: RoomId,
        candidate: serde_json::Value,
    },

    // --- Anruf ---
    CallStarted {
        call_id: CallId,
        call_type: CallTyp,
        initiated_by: String,
        initiated_by_id: UserId,
    },
    CallParticipantJoined {
        call_id: CallId,
        user_id: UserId,
        username: String,
        is_audio_enabled: bool,
        is_video_enabled: bool,
        participant_count: usize,
    },
    CallParticipantLeft {
        call_id: CallId,
        user_id: UserId,
        username: String,
        participant_count: usize,
    },
    CallMediaToggle {
        user_id: UserId,
        username: String,
        media_type: MedienTyp,
        enabled: bool,
    },
    CallEnded {
        call_id: CallId,
        reason: AnrufEndeGrund,
        ended_by: Option<String>,
    },

    Error {
        message: String,
    },
}

impl ServerEvent {
    /// Erstellt ein privates Fehler-Ereignis
    pub fn fehler(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Serialisiert das Ereignis als JSON-Text-Frame
    pub fn als_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Wire-Name des Ereignisses
    pub fn typ_name(&self) -> &'static str {
        match self {
            Self::PresenceUpdate { .. } => "presence_update",
            Self::ChatMessage { .. } => "chat_message",
            Self::MessageUpdate { .. } => "message_update",
            Self::MessageDelete { .. } => "message_delete",
            Self::UserTyping { .. } => "user_typing",
            Self::UnreadCountUpdate { .. } => "unread_count_update",
            Self::MessageSeenUpdate { .. } => "message_seen_update",
            Self::ReactionUpdate { .. } => "reaction_update",
            Self::UserKicked { .. } => "user_kicked",
            Self::RemovedFromRoom { .. } => "removed_from_room",
            Self::RoleUpdated { .. } => "role_updated",
            Self::RoomSettingsUpdated { .. } => "room_settings_updated",
            Self::UserMuted { .. } => "user_muted",
            Self::YouWereMuted { .. } => "you_were_muted",
            Self::WebrtcOffer { .. } => "webrtc_offer",
            Self::WebrtcAnswer { .. } => "webrtc_answer",
            Self::IceCandidate { .. } => "ice_candidate",
            Self::CallStarted { .. } => "call_started",
            Self::CallParticipantJoined { .. } => "call_participant_joined",
            Self::CallParticipantLeft { .. } => "call_participant_left",
            Self::CallMediaToggle { .. } => "call_media_toggle",
            Self::CallEnded { .. } => "call_ended",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn presence_update_format() {
        let uid = UserId(uuid::Uuid::nil());
        let ev = ServerEvent::PresenceUpdate {
            users: vec![PresenceUser {
                id: uid,
                username: "anna".into(),
                role: MitgliedRolle::Admin,
            }],
        };
        let wert: serde_json::Value = serde_json::from_str(&ev.als_json().unwrap()).unwrap();
        assert_eq!(
            wert,
            json!({
                "type": "presence_update",
                "users": [{"id": "00000000-0000-0000-0000-000000000000", "username": "anna", "role": "admin"}]
            })
        );
    }

    #[test]
    fn fehler_format() {
        let json = ServerEvent::fehler("Cannot kick room owner").als_json().unwrap();
        assert_eq!(json, r#"{"type":"error","message":"Cannot kick room owner"}"#);
    }

    #[test]
    fn anruf_ende_grund_snake_case() {
        let ev = ServerEvent::CallEnded {
            call_id: CallId(uuid::Uuid::nil()),
            reason: AnrufEndeGrund::AllParticipantsLeft,
            ended_by: None,
        };
        let wert: serde_json::Value = serde_json::from_str(&ev.als_json().unwrap()).unwrap();
        assert_eq!(wert["type"], "call_ended");
        assert_eq!(wert["reason"], "all_participants_left");
        assert_eq!(ev.typ_name(), "call_ended");
    }
}
