//! Moderations-Handler – Kick, Rollen, Stummschaltung, Raumeinstellungen
//!
//! Berechtigungen kommen aus dem `PermissionService`. Eine Ablehnung geht
//! als privates Fehler-Ereignis an den Akteur und aendert nichts.

use chrono::{Duration, Utc};
use roomhub_core::{MitgliedRolle, RoomId};
use roomhub_db::models::{RaumRecord, RaumUpdate, KAPAZITAET_MAX, KAPAZITAET_MIN};
use roomhub_db::RoomStore;
use roomhub_protocol::command::{MuteRequest, PromoteRequest, RoomSettingsRequest, UserRef};
use roomhub_protocol::{RoomInfo, ServerEvent};
use std::sync::Arc;

use super::{benutzername, call_handler, pflicht};
use crate::error::{HubError, HubResult};
use crate::lifecycle::{presence_senden, VerbindungsKontext};
use crate::presence::PresenceEintrag;
use crate::registry::CLOSE_GEKICKT;
use crate::server_state::HubState;

const NICHT_MITGLIED: &str = "User is not a member of this room";

/// Benutzer aus dem Raum werfen
///
/// Reihenfolge: Mitgliedschaft loeschen, Presence entfernen, Verbindungen
/// aus der Registry nehmen, Hinweis an die private Gruppe, Verbindungen
/// schliessen, Raum informieren.
pub async fn handle_kick<D: RoomStore>(
    req: UserRef,
    ctx: &VerbindungsKontext,
    state: &Arc<HubState<D>>,
) -> HubResult<()> {
    let ziel = pflicht(req.user_id, "user_id")?;
    state
        .berechtigungen
        .kick_erfordern(ctx.room_id, ctx.user_id, ziel)
        .await?;

    let ziel_name = benutzername(state, ziel).await?;
    let mitgliedschaft_geloescht = state.store.delete_membership(ctx.room_id, ziel).await?;
    if !mitgliedschaft_geloescht
        && state
            .registry
            .verbindungen_des_users_im_raum(&ctx.room_id, &ziel)
            .is_empty()
    {
        return Err(HubError::nicht_gefunden(NICHT_MITGLIED));
    }

    let hinweis = ServerEvent::RemovedFromRoom {
        room_id: ctx.room_id,
        message: "You have been removed from this room".into(),
    };

    {
        let sperre = state.presence_sperren.holen(ctx.room_id);
        let _guard = sperre.lock().await;

        if let Err(e) = state.presence.austragen(ctx.room_id, ziel).await {
            tracing::warn!(room_id = %ctx.room_id, user_id = %ziel, fehler = %e.detail(), "Presence-Austrag beim Kick fehlgeschlagen");
        }

        let entfernt: Vec<_> = state
            .registry
            .verbindungen_des_users_im_raum(&ctx.room_id, &ziel)
            .into_iter()
            .filter_map(|h| state.registry.entfernen(&h.connection_id))
            .collect();

        // Hinweis zuerst an die entfernten Verbindungen, dann an die restliche private Gruppe
        if let Ok(frame) = hinweis.als_json() {
            state
                .registry
                .frame_zustellen(&entfernt, &Arc::from(frame));
        }
        state.registry.an_user_senden(&ziel, &hinweis);

        for handle in &entfernt {
            handle.schliessen(CLOSE_GEKICKT, "Removed from room");
        }
        state
            .metriken
            .raeume_aktiv
            .set(state.registry.raum_anzahl() as i64);

        tracing::info!(
            room_id = %ctx.room_id,
            actor = %ctx.user_id,
            ziel = %ziel,
            verbindungen = entfernt.len(),
            "Benutzer aus Raum entfernt"
        );

        state.registry.an_raum_senden(
            &ctx.room_id,
            &ServerEvent::UserKicked {
                user_id: ziel,
                username: ziel_name.clone(),
            },
        );
        // Kick ist vollzogen; Cache-Fehler nur protokollieren
        if let Err(e) = presence_senden(state, ctx.room_id).await {
            tracing::warn!(room_id = %ctx.room_id, fehler = %e.detail(), "Presence-Snapshot nach Kick fehlgeschlagen");
        }
    }

    call_handler::teilnehmer_entfernen(
        state,
        ctx.room_id,
        ziel,
        ziel_name.as_deref().unwrap_or_default(),
    )
    .await
}

/// Rolle eines Mitglieds aendern (nur Admins und Besitzer)
pub async fn handle_promote<D: RoomStore>(
    req: PromoteRequest,
    ctx: &VerbindungsKontext,
    state: &Arc<HubState<D>>,
) -> HubResult<()> {
    let ziel = pflicht(req.user_id, "user_id")?;
    let role: MitgliedRolle = pflicht(req.role, "role")?
        .parse()
        .map_err(|_| HubError::validierung("Invalid role"))?;

    state
        .berechtigungen
        .befoerdern_erfordern(ctx.room_id, ctx.user_id)
        .await?;

    if !state.store.set_role(ctx.room_id, ziel, role).await? {
        return Err(HubError::nicht_gefunden(NICHT_MITGLIED));
    }
    let ziel_name = benutzername(state, ziel).await?;

    tracing::info!(room_id = %ctx.room_id, actor = %ctx.user_id, ziel = %ziel, rolle = %role, "Rolle geaendert");

    state.registry.an_raum_senden(
        &ctx.room_id,
        &ServerEvent::RoleUpdated {
            user_id: ziel,
            username: ziel_name.clone(),
            role,
        },
    );

    // Presence-Rolle nachziehen, falls der Benutzer online ist
    let sperre = state.presence_sperren.holen(ctx.room_id);
    let _guard = sperre.lock().await;
    if state.registry.user_im_raum(&ctx.room_id, &ziel) {
        if let Some(username) = ziel_name {
            state
                .presence
                .eintragen(
                    ctx.room_id,
                    PresenceEintrag {
                        user_id: ziel,
                        username,
                        role,
                    },
                )
                .await?;
            presence_senden(state, ctx.room_id).await?;
        }
    }
    Ok(())
}

/// Mitglied fuer eine Dauer in Minuten stummschalten
pub async fn handle_mute<D: RoomStore>(
    req: MuteRequest,
    ctx: &VerbindungsKontext,
    state: &Arc<HubState<D>>,
) -> HubResult<()> {
    let ziel = pflicht(req.user_id, "user_id")?;
    let minuten = req.duration.unwrap_or(state.config.mute_standard_minuten);
    if minuten <= 0 {
        return Err(HubError::validierung("Mute duration must be positive"));
    }
    // Obergrenze: ein Jahr
    let minuten = minuten.min(525_600);

    state
        .berechtigungen
        .stummschalten_erfordern(ctx.room_id, ctx.user_id)
        .await?;

    let bis = Utc::now() + Duration::minutes(minuten);
    if !state.store.set_muted_until(ctx.room_id, ziel, Some(bis)).await? {
        return Err(HubError::nicht_gefunden(NICHT_MITGLIED));
    }
    let ziel_name = benutzername(state, ziel).await?;

    tracing::info!(room_id = %ctx.room_id, actor = %ctx.user_id, ziel = %ziel, minuten, "Benutzer stummgeschaltet");

    state.registry.an_user_senden(
        &ziel,
        &ServerEvent::YouWereMuted {
            room_id: ctx.room_id,
            muted_until: bis,
            duration_minutes: minuten,
        },
    );
    state.registry.an_raum_senden(
        &ctx.room_id,
        &ServerEvent::UserMuted {
            user_id: ziel,
            username: ziel_name,
            muted_until: bis,
        },
    );
    Ok(())
}

/// Baut das Update aus den erlaubten Feldern und validiert es
pub(crate) fn einstellungen_pruefen(req: RoomSettingsRequest) -> HubResult<RaumUpdate> {
    let s = req.settings;

    let name = match s.name {
        Some(name) => {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(HubError::validierung("Room name cannot be empty"));
            }
            Some(name)
        }
        None => None,
    };

    let capacity = match s.capacity {
        Some(c) if c < KAPAZITAET_MIN as i64 || c > KAPAZITAET_MAX as i64 => {
            return Err(HubError::validierung(format!(
                "Capacity must be between {KAPAZITAET_MIN} and {KAPAZITAET_MAX}"
            )))
        }
        Some(c) => Some(c as u32),
        None => None,
    };

    let update = RaumUpdate {
        name,
        description: s.description,
        topic: s.topic,
        capacity,
        is_private: s.is_private,
    };
    if update.ist_leer() {
        return Err(HubError::validierung("No room settings provided"));
    }
    Ok(update)
}

fn raum_info(raum: RaumRecord) -> RoomInfo {
    RoomInfo {
        id: raum.id,
        name: raum.name,
        description: raum.description,
        topic: raum.topic,
        capacity: raum.capacity,
        is_private: raum.is_private,
        owner_id: raum.owner_id,
    }
}

/// Raumeinstellungen aendern (nur der Besitzer)
pub async fn handle_room_settings<D: RoomStore>(
    req: RoomSettingsRequest,
    ctx: &VerbindungsKontext,
    state: &Arc<HubState<D>>,
) -> HubResult<()> {
    state
        .berechtigungen
        .einstellungen_erfordern(ctx.room_id, ctx.user_id)
        .await?;
    let update = einstellungen_pruefen(req)?;

    let raum = state.store.update_room(ctx.room_id, update).await?;
    tracing::info!(room_id = %ctx.room_id, actor = %ctx.user_id, "Raumeinstellungen geaendert");

    raum_senden(state, ctx.room_id, raum);
    Ok(())
}

fn raum_senden<D: RoomStore>(state: &HubState<D>, room_id: RoomId, raum: RaumRecord) {
    state.registry.an_raum_senden(
        &room_id,
        &ServerEvent::RoomSettingsUpdated {
            room: raum_info(raum),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomhub_protocol::command::RoomSettings;

    fn req(settings: RoomSettings) -> RoomSettingsRequest {
        RoomSettingsRequest { settings }
    }

    #[test]
    fn kapazitaet_grenzen() {
        for c in [0, 51, -3] {
            let e = einstellungen_pruefen(req(RoomSettings {
                capacity: Some(c),
                ..Default::default()
            }))
            .unwrap_err();
            assert!(matches!(e, HubError::Validierung(_)));
        }
        let update = einstellungen_pruefen(req(RoomSettings {
            capacity: Some(50),
            ..Default::default()
        }))
        .unwrap();
        assert_eq!(update.capacity, Some(50));
    }

    #[test]
    fn name_wird_getrimmt_und_darf_nicht_leer_sein() {
        let e = einstellungen_pruefen(req(RoomSettings {
            name: Some("   ".into()),
            ..Default::default()
        }))
        .unwrap_err();
        assert_eq!(e.to_string(), "Room name cannot be empty");

        let update = einstellungen_pruefen(req(RoomSettings {
            name: Some("  Lounge ".into()),
            ..Default::default()
        }))
        .unwrap();
        assert_eq!(update.name.as_deref(), Some("Lounge"));
    }

    #[test]
    fn leeres_update_ist_ungueltig() {
        assert!(einstellungen_pruefen(req(RoomSettings::default())).is_err());
    }
}
