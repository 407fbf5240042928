//! Message-Dispatcher – Routet Befehle an die richtigen Handler
//!
//! Jeder Befehl ist eine Variante von `ClientBefehl`; das `match` ist
//! erschoepfend. Handler liefern `HubResult<()>` und verteilen ihre
//! Ereignisse selbst. Ein Fehler wird hier einheitlich behandelt: Log,
//! Metrik und ein privates `error`-Ereignis an die ausloesende Verbindung.
//! Handler pruefen vor jedem Schreibzugriff, ein Fehler hinterlaesst
//! daher keinen halben Zustand.

use roomhub_db::RoomStore;
use roomhub_protocol::{ClientBefehl, ServerEvent};
use roomhub_core::MedienTyp;
use std::sync::Arc;
use std::time::Instant;

use crate::error::HubError;
use crate::handlers::{call_handler, chat_handler, moderation_handler, relay_handler};
use crate::lifecycle::VerbindungsKontext;
use crate::server_state::HubState;

/// Zentraler Dispatcher
pub struct MessageDispatcher<D: RoomStore> {
    state: Arc<HubState<D>>,
}

impl<D: RoomStore> MessageDispatcher<D> {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<HubState<D>>) -> Self {
        Self { state }
    }

    /// Verarbeitet einen Befehl einer beigetretenen Verbindung
    pub async fn dispatch(&self, befehl: ClientBefehl, ctx: &VerbindungsKontext) {
        let typ = befehl.typ_name();
        let start = Instant::now();
        let state = &self.state;

        let ergebnis = match befehl {
            // -------------------------------------------------------------------
            // Chat
            // -------------------------------------------------------------------
            ClientBefehl::ChatMessage(req) => chat_handler::handle_chat_message(req, ctx, state).await,
            ClientBefehl::EditMessage(req) => chat_handler::handle_edit_message(req, ctx, state).await,
            ClientBefehl::DeleteMessage(req) => {
                chat_handler::handle_delete_message(req, ctx, state).await
            }
            ClientBefehl::Typing(req) => chat_handler::handle_typing(req, ctx, state).await,
            ClientBefehl::MarkSeen(req) => chat_handler::handle_mark_seen(req, ctx, state).await,
            ClientBefehl::AddReaction(req) => {
                chat_handler::handle_reaction(req, true, ctx, state).await
            }
            ClientBefehl::RemoveReaction(req) => {
                chat_handler::handle_reaction(req, false, ctx, state).await
            }

            // -------------------------------------------------------------------
            // Moderation
            // -------------------------------------------------------------------
            ClientBefehl::KickUser(req) => moderation_handler::handle_kick(req, ctx, state).await,
            ClientBefehl::PromoteUser(req) => {
                moderation_handler::handle_promote(req, ctx, state).await
            }
            ClientBefehl::MuteUser(req) => moderation_handler::handle_mute(req, ctx, state).await,
            ClientBefehl::UpdateRoomSettings(req) => {
                moderation_handler::handle_room_settings(req, ctx, state).await
            }

            // -------------------------------------------------------------------
            // WebRTC-Relay
            // -------------------------------------------------------------------
            ClientBefehl::WebrtcOffer(req) => {
                relay_handler::handle_relay(relay_handler::RelayArt::Offer, req, ctx, state)
            }
            ClientBefehl::WebrtcAnswer(req) => {
                relay_handler::handle_relay(relay_handler::RelayArt::Answer, req, ctx, state)
            }
            ClientBefehl::IceCandidate(req) => {
                relay_handler::handle_relay(relay_handler::RelayArt::IceCandidate, req, ctx, state)
            }

            // -------------------------------------------------------------------
            // Anrufe
            // -------------------------------------------------------------------
            ClientBefehl::StartCall(req) => call_handler::handle_start_call(req, ctx, state).await,
            ClientBefehl::CallLeft => call_handler::handle_call_left(ctx, state).await,
            ClientBefehl::EndCall => call_handler::handle_end_call(ctx, state).await,
            ClientBefehl::CallToggleAudio(req) => {
                call_handler::handle_media_toggle(MedienTyp::Audio, req, ctx, state).await
            }
            ClientBefehl::CallToggleVideo(req) => {
                call_handler::handle_media_toggle(MedienTyp::Video, req, ctx, state).await
            }
            ClientBefehl::CallToggleScreen(req) => {
                call_handler::handle_media_toggle(MedienTyp::Screen, req, ctx, state).await
            }

            // Wird bereits beim Dekodieren aussortiert
            ClientBefehl::Unbekannt => Ok(()),
        };

        state
            .metriken
            .befehl_erfassen(typ, start.elapsed().as_secs_f64());

        if let Err(e) = ergebnis {
            self.fehler_melden(typ, e, ctx);
        }
    }

    fn fehler_melden(&self, typ: &str, fehler: HubError, ctx: &VerbindungsKontext) {
        match &fehler {
            HubError::Speicher(_) | HubError::Intern(_) => tracing::warn!(
                connection_id = %ctx.connection_id,
                user_id = %ctx.user_id,
                room_id = %ctx.room_id,
                typ,
                fehler = %fehler.detail(),
                "Befehl fehlgeschlagen"
            ),
            _ => tracing::debug!(
                connection_id = %ctx.connection_id,
                user_id = %ctx.user_id,
                typ,
                grund = %fehler,
                "Befehl abgelehnt"
            ),
        }

        self.state.metriken.befehl_abgelehnt(fehler.grund());
        self.state
            .registry
            .an_verbindung_senden(&ctx.connection_id, &ServerEvent::fehler(fehler.to_string()));
    }
}
