//! WebRTC-Relay – Offer/Answer/ICE an genau einen Ziel-Benutzer
//!
//! Der Hub interpretiert SDP und Kandidaten nicht. Geprueft wird nur, dass
//! Ziel und Nutzlast vorhanden sind; ein ICE-Kandidat `null` (Ende der
//! Kandidaten) ist erlaubt. Ein Ziel ohne Verbindung ist kein Fehler.

use roomhub_db::RoomStore;
use roomhub_protocol::command::RelayRequest;
use roomhub_protocol::ServerEvent;
use serde_json::Value;
use std::sync::Arc;

use super::pflicht;
use crate::error::HubResult;
use crate::lifecycle::VerbindungsKontext;
use crate::server_state::HubState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayArt {
    Offer,
    Answer,
    IceCandidate,
}

pub fn handle_relay<D: RoomStore>(
    art: RelayArt,
    req: RelayRequest,
    ctx: &VerbindungsKontext,
    state: &Arc<HubState<D>>,
) -> HubResult<()> {
    let ziel = pflicht(req.target_user_id, "target_user_id")?;

    let from_user_id = ctx.user_id;
    let from_username = ctx.username.clone();
    let room_id = ctx.room_id;

    let event = match art {
        RelayArt::Offer => ServerEvent::WebrtcOffer {
            from_user_id,
            from_username,
            room_id,
            offer: pflicht(req.payload, "offer")?,
        },
        RelayArt::Answer => ServerEvent::WebrtcAnswer {
            from_user_id,
            from_username,
            room_id,
            answer: pflicht(req.payload, "answer")?,
        },
        RelayArt::IceCandidate => ServerEvent::IceCandidate {
            from_user_id,
            from_username,
            room_id,
            candidate: req.payload.unwrap_or(Value::Null),
        },
    };

    let zugestellt = state.registry.an_user_senden(&ziel, &event);
    tracing::trace!(
        from = %ctx.user_id,
        ziel = %ziel,
        typ = event.typ_name(),
        zugestellt,
        "WebRTC-Signal weitergeleitet"
    );
    Ok(())
}
