//! Anruf-Handler – hoechstens ein aktiver Anruf pro Raum
//!
//! ```text
//! NoCall --start_call--> Active --letzter Austritt--> Ended (all_participants_left)
//!                          |
//!                          +------end_call---------> Ended (ended_by_host)
//! ```
//!
//! Start, Austritt und Beenden laufen pro Raum unter `anruf_sperren`.
//! Ein `start_call` waehrend eines aktiven Anrufs ist ein Beitritt.

use roomhub_core::{CallTyp, MedienTyp, RoomId, UserId};
use roomhub_db::models::{AnrufRecord, TeilnehmerRecord};
use roomhub_db::RoomStore;
use roomhub_protocol::command::{MediaToggleRequest, StartCallRequest};
use roomhub_protocol::{AnrufEndeGrund, ServerEvent};
use std::sync::Arc;

use super::pflicht;
use crate::error::{HubError, HubResult};
use crate::lifecycle::VerbindungsKontext;
use crate::server_state::HubState;

const KEIN_ANRUF: &str = "No active call in this room";

/// Anruf starten oder dem laufenden Anruf beitreten
///
/// `call_started` geht erst raus, wenn der Initiator als Teilnehmer
/// eingetragen ist. Scheitert der Beitritt, wird ein eben angelegter
/// Anruf wieder beendet.
pub async fn handle_start_call<D: RoomStore>(
    req: StartCallRequest,
    ctx: &VerbindungsKontext,
    state: &Arc<HubState<D>>,
) -> HubResult<()> {
    let sperre = state.anruf_sperren.holen(ctx.room_id);
    let _guard = sperre.lock().await;

    let (anruf, angelegt) = match state.store.active_call(ctx.room_id).await? {
        Some(anruf) => (anruf, false),
        None => anruf_anlegen(state, ctx, req.call_type.unwrap_or_default()).await?,
    };

    let (teilnehmer, participant_count) = match teilnehmer_eintragen(state, ctx, &anruf).await {
        Ok(ergebnis) => ergebnis,
        Err(e) => {
            if angelegt {
                anruf_verwerfen(state, &anruf).await;
            }
            return Err(e);
        }
    };

    if angelegt {
        state.metriken.anrufe_aktiv.inc();
        tracing::info!(
            call_id = %anruf.id,
            room_id = %ctx.room_id,
            initiator = %ctx.user_id,
            call_type = %anruf.call_type.als_str(),
            "Anruf gestartet"
        );
        state.registry.an_raum_senden(
            &ctx.room_id,
            &ServerEvent::CallStarted {
                call_id: anruf.id,
                call_type: anruf.call_type,
                initiated_by: ctx.username.clone(),
                initiated_by_id: ctx.user_id,
            },
        );
    }

    tracing::debug!(
        call_id = %anruf.id,
        user_id = %ctx.user_id,
        participant_count,
        "Anruf beigetreten"
    );

    state.registry.an_raum_senden(
        &ctx.room_id,
        &ServerEvent::CallParticipantJoined {
            call_id: anruf.id,
            user_id: ctx.user_id,
            username: ctx.username.clone(),
            is_audio_enabled: teilnehmer.is_audio_enabled,
            is_video_enabled: teilnehmer.is_video_enabled,
            participant_count,
        },
    );
    Ok(())
}

/// Legt einen Anruf an; `true` nur, wenn dieser Aufruf ihn erzeugt hat
async fn anruf_anlegen<D: RoomStore>(
    state: &HubState<D>,
    ctx: &VerbindungsKontext,
    call_type: CallTyp,
) -> HubResult<(AnrufRecord, bool)> {
    match state
        .store
        .create_call(ctx.room_id, ctx.user_id, call_type)
        .await
    {
        Ok(anruf) => Ok((anruf, true)),
        // Ein anderer Prozess war schneller; dessen Anruf uebernehmen
        Err(e) if e.ist_eindeutigkeit() => state
            .store
            .active_call(ctx.room_id)
            .await?
            .map(|anruf| (anruf, false))
            .ok_or_else(|| HubError::intern("Aktiver Anruf nach Eindeutigkeitsfehler nicht auffindbar")),
        Err(e) => Err(e.into()),
    }
}

async fn teilnehmer_eintragen<D: RoomStore>(
    state: &HubState<D>,
    ctx: &VerbindungsKontext,
    anruf: &AnrufRecord,
) -> HubResult<(TeilnehmerRecord, usize)> {
    let teilnehmer = state
        .store
        .join_call(
            anruf.id,
            ctx.user_id,
            true,
            anruf.call_type == CallTyp::Video,
        )
        .await?;
    let participant_count = state.store.active_participants(anruf.id).await?.len();
    Ok((teilnehmer, participant_count))
}

/// Beendet einen Anruf, dessen Start gescheitert ist; niemand hat ihn gesehen
async fn anruf_verwerfen<D: RoomStore>(state: &HubState<D>, anruf: &AnrufRecord) {
    if let Err(e) = state.store.leave_all(anruf.id).await {
        tracing::warn!(call_id = %anruf.id, fehler = %e, "Teilnehmer des verworfenen Anrufs nicht ausgetragen");
    }
    match state.store.end_call(anruf.id).await {
        Ok(_) => tracing::warn!(call_id = %anruf.id, "Anruf nach gescheitertem Beitritt verworfen"),
        Err(e) => tracing::error!(call_id = %anruf.id, fehler = %e, "Verworfener Anruf bleibt aktiv"),
    }
}

/// Anruf verlassen; ohne aktiven Anruf oder Teilnahme ein stiller No-op
pub async fn handle_call_left<D: RoomStore>(
    ctx: &VerbindungsKontext,
    state: &Arc<HubState<D>>,
) -> HubResult<()> {
    teilnehmer_entfernen(state, ctx.room_id, ctx.user_id, &ctx.username).await
}

/// Entfernt einen Teilnehmer und beendet den Anruf, wenn niemand mehr uebrig ist
///
/// Auch fuer den impliziten Austritt beim Trennen der letzten Verbindung und
/// beim Kick verwendet.
pub async fn teilnehmer_entfernen<D: RoomStore>(
    state: &HubState<D>,
    room_id: RoomId,
    user_id: UserId,
    username: &str,
) -> HubResult<()> {
    let sperre = state.anruf_sperren.holen(room_id);
    let _guard = sperre.lock().await;

    let Some(anruf) = state.store.active_call(room_id).await? else {
        return Ok(());
    };
    if !state.store.leave_call(anruf.id, user_id).await? {
        return Ok(());
    }

    let participant_count = state.store.active_participants(anruf.id).await?.len();
    tracing::debug!(call_id = %anruf.id, user_id = %user_id, participant_count, "Anruf verlassen");

    state.registry.an_raum_senden(
        &room_id,
        &ServerEvent::CallParticipantLeft {
            call_id: anruf.id,
            user_id,
            username: username.to_string(),
            participant_count,
        },
    );

    if participant_count == 0 {
        anruf_beenden(state, room_id, &anruf, AnrufEndeGrund::AllParticipantsLeft, None).await?;
    }
    Ok(())
}

/// Anruf fuer alle beenden (Besitzer, Moderatoren/Admins, Initiator)
pub async fn handle_end_call<D: RoomStore>(
    ctx: &VerbindungsKontext,
    state: &Arc<HubState<D>>,
) -> HubResult<()> {
    let sperre = state.anruf_sperren.holen(ctx.room_id);
    let _guard = sperre.lock().await;

    let anruf = state
        .store
        .active_call(ctx.room_id)
        .await?
        .ok_or_else(|| HubError::nicht_gefunden(KEIN_ANRUF))?;

    state
        .berechtigungen
        .anruf_beenden_erfordern(ctx.room_id, ctx.user_id, anruf.initiator_id)
        .await?;

    anruf_beenden(
        state,
        ctx.room_id,
        &anruf,
        AnrufEndeGrund::EndedByHost,
        Some(ctx.username.clone()),
    )
    .await
}

async fn anruf_beenden<D: RoomStore>(
    state: &HubState<D>,
    room_id: RoomId,
    anruf: &AnrufRecord,
    reason: AnrufEndeGrund,
    ended_by: Option<String>,
) -> HubResult<()> {
    state.store.leave_all(anruf.id).await?;
    if state.store.end_call(anruf.id).await? {
        state.metriken.anrufe_aktiv.dec();
    }

    tracing::info!(call_id = %anruf.id, room_id = %room_id, grund = ?reason, "Anruf beendet");

    state.registry.an_raum_senden(
        &room_id,
        &ServerEvent::CallEnded {
            call_id: anruf.id,
            reason,
            ended_by,
        },
    );
    Ok(())
}

/// Audio/Video/Bildschirmfreigabe eines Teilnehmers umschalten
pub async fn handle_media_toggle<D: RoomStore>(
    medium: MedienTyp,
    req: MediaToggleRequest,
    ctx: &VerbindungsKontext,
    state: &Arc<HubState<D>>,
) -> HubResult<()> {
    let enabled = pflicht(req.enabled, "enabled")?;

    let anruf = state
        .store
        .active_call(ctx.room_id)
        .await?
        .ok_or_else(|| HubError::nicht_gefunden(KEIN_ANRUF))?;

    if !state
        .store
        .set_media(anruf.id, ctx.user_id, medium, enabled)
        .await?
    {
        return Err(HubError::nicht_gefunden("You are not a participant in this call"));
    }

    state.registry.an_raum_senden(
        &ctx.room_id,
        &ServerEvent::CallMediaToggle {
            user_id: ctx.user_id,
            username: ctx.username.clone(),
            media_type: medium,
            enabled,
        },
    );
    Ok(())
}
