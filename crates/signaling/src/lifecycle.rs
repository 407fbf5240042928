//! Verbindungs-Lebenszyklus
//!
//! ```text
//! Connecting -> Authenticated -> Joined -> Closed
//! ```
//!
//! `Connecting -> Authenticated` passiert vor dem WebSocket-Upgrade
//! (siehe `ws`). Hier liegen die beiden anderen Uebergaenge plus die
//! Verarbeitung eingehender Frames einer beigetretenen Verbindung.
//! Die Funktionen sind transportunabhaengig und werden in Tests direkt
//! aufgerufen.

use roomhub_auth::Identitaet;
use roomhub_core::{ConnectionId, MitgliedRolle, RoomId, UserId};
use roomhub_db::RoomStore;
use roomhub_protocol::{frame_dekodieren, Eingang, ServerEvent};
use std::sync::Arc;

use crate::dispatcher::MessageDispatcher;
use crate::error::{HubError, HubResult};
use crate::handlers::call_handler;
use crate::presence::PresenceEintrag;
use crate::registry::VerbindungsEmpfang;
use crate::server_state::HubState;

/// Informationen ueber eine beigetretene Verbindung
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerbindungsKontext {
    pub connection_id: ConnectionId,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub username: String,
}

/// Ergebnis eines erfolgreichen Beitritts
#[derive(Debug)]
pub struct Beitritt {
    pub kontext: VerbindungsKontext,
    pub empfang: VerbindungsEmpfang,
}

/// Sendet den aktuellen Presence-Snapshot an den Raum
pub(crate) async fn presence_senden<D: RoomStore>(state: &HubState<D>, room_id: RoomId) -> HubResult<()> {
    if state.registry.verbindungen_im_raum(&room_id) == 0 {
        return Ok(());
    }
    let users = state
        .presence
        .auflisten(room_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    state
        .registry
        .an_raum_senden(&room_id, &ServerEvent::PresenceUpdate { users });
    Ok(())
}

fn raum_gauge_aktualisieren<D: RoomStore>(state: &HubState<D>) {
    state
        .metriken
        .raeume_aktiv
        .set(state.registry.raum_anzahl() as i64);
}

/// `Authenticated -> Joined`
///
/// Registriert die Verbindung in Raum- und Benutzergruppe, traegt den
/// Benutzer mit seiner aktuellen Rolle (Standard `member`) in die Presence
/// ein und sendet den Snapshot an den Raum.
pub async fn beitreten<D: RoomStore>(
    state: &Arc<HubState<D>>,
    identitaet: Identitaet,
    room_id: RoomId,
) -> HubResult<Beitritt> {
    if state.store.get_room(room_id).await?.is_none() {
        return Err(HubError::nicht_gefunden("Room not found"));
    }

    let role = state
        .berechtigungen
        .rolle(room_id, identitaet.user_id)
        .await?
        .unwrap_or(MitgliedRolle::Member);

    let sperre = state.presence_sperren.holen(room_id);
    let _guard = sperre.lock().await;

    let (handle, empfang) = state.registry.registrieren(identitaet.user_id, room_id);

    let eintrag = PresenceEintrag {
        user_id: identitaet.user_id,
        username: identitaet.username.clone(),
        role,
    };
    if let Err(e) = state.presence.eintragen(room_id, eintrag).await {
        // Kein halber Beitritt: Registrierung zuruecknehmen
        state.registry.entfernen(&handle.connection_id);
        return Err(e);
    }

    state.metriken.verbindungen_aktiv.inc();
    raum_gauge_aktualisieren(state);

    tracing::info!(
        connection_id = %handle.connection_id,
        user_id = %identitaet.user_id,
        room_id = %room_id,
        rolle = %role,
        "Verbindung dem Raum beigetreten"
    );

    if let Err(e) = presence_senden(state, room_id).await {
        tracing::warn!(room_id = %room_id, fehler = %e.detail(), "Presence-Snapshot fehlgeschlagen");
    }

    Ok(Beitritt {
        kontext: VerbindungsKontext {
            connection_id: handle.connection_id,
            room_id,
            user_id: identitaet.user_id,
            username: identitaet.username,
        },
        empfang,
    })
}

/// `Joined -> Closed`
///
/// Wird genau einmal pro Verbindung aufgerufen, auch wenn die Verbindung
/// bereits durch einen Kick aus der Registry entfernt wurde.
pub async fn trennen<D: RoomStore>(state: &Arc<HubState<D>>, ctx: &VerbindungsKontext) {
    state.metriken.verbindungen_aktiv.dec();

    let letzte_verbindung = {
        let sperre = state.presence_sperren.holen(ctx.room_id);
        let _guard = sperre.lock().await;

        if state.registry.entfernen(&ctx.connection_id).is_none() {
            raum_gauge_aktualisieren(state);
            tracing::debug!(connection_id = %ctx.connection_id, "Verbindung war bereits entfernt");
            return;
        }
        raum_gauge_aktualisieren(state);

        let letzte = !state.registry.user_im_raum(&ctx.room_id, &ctx.user_id);
        if letzte {
            if let Err(e) = state.presence.austragen(ctx.room_id, ctx.user_id).await {
                tracing::warn!(room_id = %ctx.room_id, user_id = %ctx.user_id, fehler = %e.detail(), "Presence-Austrag fehlgeschlagen");
            }
            if let Err(e) = presence_senden(state, ctx.room_id).await {
                tracing::warn!(room_id = %ctx.room_id, fehler = %e.detail(), "Presence-Snapshot fehlgeschlagen");
            }
        }
        letzte
    };

    tracing::info!(
        connection_id = %ctx.connection_id,
        user_id = %ctx.user_id,
        room_id = %ctx.room_id,
        "Verbindung getrennt"
    );

    if letzte_verbindung {
        if let Err(e) =
            call_handler::teilnehmer_entfernen(state, ctx.room_id, ctx.user_id, &ctx.username).await
        {
            tracing::warn!(user_id = %ctx.user_id, fehler = %e.detail(), "Impliziter Anruf-Austritt fehlgeschlagen");
        }
    }
}

/// Verarbeitet einen eingehenden Text-Frame einer beigetretenen Verbindung
pub async fn frame_verarbeiten<D: RoomStore>(state: &Arc<HubState<D>>, ctx: &VerbindungsKontext, text: &str) {
    match frame_dekodieren(text) {
        Eingang::Befehl(befehl) => {
            MessageDispatcher::neu(Arc::clone(state))
                .dispatch(befehl, ctx)
                .await
        }
        Eingang::Ignoriert { typ } => {
            tracing::debug!(connection_id = %ctx.connection_id, typ = %typ, "Unbekannter Ereignistyp ignoriert");
        }
        Eingang::Ungueltig(meldung) => {
            tracing::debug!(connection_id = %ctx.connection_id, grund = %meldung, "Ungueltiger Frame");
            state.metriken.befehl_abgelehnt("validierung");
            state
                .registry
                .an_verbindung_senden(&ctx.connection_id, &ServerEvent::fehler(meldung));
        }
    }
}
