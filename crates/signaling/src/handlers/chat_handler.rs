//! Chat-Handler – Nachrichten, Tippen, Lesebestaetigungen, Reaktionen

use roomhub_db::RoomStore;
use roomhub_protocol::command::{
    ChatMessageRequest, EditMessageRequest, MessageRef, ReactionRequest, TypingRequest,
};
use roomhub_protocol::ServerEvent;
use std::sync::Arc;

use super::{chat_event, pflicht};
use crate::error::{HubError, HubResult};
use crate::lifecycle::VerbindungsKontext;
use crate::server_state::HubState;

/// Nachricht senden; Stummschaltung wird vor allem anderen geprueft
pub async fn handle_chat_message<D: RoomStore>(
    req: ChatMessageRequest,
    ctx: &VerbindungsKontext,
    state: &Arc<HubState<D>>,
) -> HubResult<()> {
    state
        .chat
        .stummschaltung_pruefen(ctx.room_id, ctx.user_id)
        .await?;
    let content = req
        .content
        .ok_or_else(|| HubError::validierung("Message content cannot be empty"))?;

    let nachricht = state
        .chat
        .nachricht_senden(ctx.room_id, ctx.user_id, &ctx.username, &content, req.reply_to)
        .await?;

    tracing::debug!(
        user_id = %ctx.user_id,
        room_id = %ctx.room_id,
        message_id = %nachricht.id,
        "Chat-Nachricht gesendet"
    );
    state
        .registry
        .an_raum_senden(&ctx.room_id, &chat_event(nachricht));
    Ok(())
}

/// Eigene Nachricht editieren
pub async fn handle_edit_message<D: RoomStore>(
    req: EditMessageRequest,
    ctx: &VerbindungsKontext,
    state: &Arc<HubState<D>>,
) -> HubResult<()> {
    let message_id = pflicht(req.message_id, "message_id")?;
    let content = pflicht(req.content, "content")?;

    let nachricht = state
        .chat
        .nachricht_editieren(ctx.room_id, message_id, ctx.user_id, &content)
        .await?;

    state.registry.an_raum_senden(
        &ctx.room_id,
        &ServerEvent::MessageUpdate {
            id: nachricht.id,
            message: nachricht.message,
            is_edited: true,
        },
    );
    Ok(())
}

/// Eigene Nachricht loeschen
pub async fn handle_delete_message<D: RoomStore>(
    req: MessageRef,
    ctx: &VerbindungsKontext,
    state: &Arc<HubState<D>>,
) -> HubResult<()> {
    let message_id = pflicht(req.message_id, "message_id")?;
    state
        .chat
        .nachricht_loeschen(ctx.room_id, message_id, ctx.user_id)
        .await?;

    state
        .registry
        .an_raum_senden(&ctx.room_id, &ServerEvent::MessageDelete { id: message_id });
    Ok(())
}

/// Tipp-Indikator; fluechtig, geht an alle ausser den eigenen Verbindungen
pub async fn handle_typing<D: RoomStore>(
    req: TypingRequest,
    ctx: &VerbindungsKontext,
    state: &Arc<HubState<D>>,
) -> HubResult<()> {
    state.registry.an_raum_ausser_user_senden(
        &ctx.room_id,
        &ctx.user_id,
        &ServerEvent::UserTyping {
            user_id: ctx.user_id,
            username: ctx.username.clone(),
            is_typing: req.is_typing,
        },
    );
    Ok(())
}

/// Lesebestaetigung: Zaehler privat, Quittung nur bei neuer Zeile an den Raum
pub async fn handle_mark_seen<D: RoomStore>(
    req: MessageRef,
    ctx: &VerbindungsKontext,
    state: &Arc<HubState<D>>,
) -> HubResult<()> {
    let message_id = pflicht(req.message_id, "message_id")?;
    let ergebnis = state
        .chat
        .als_gesehen_markieren(ctx.room_id, message_id, ctx.user_id)
        .await?;

    state.registry.an_user_senden(
        &ctx.user_id,
        &ServerEvent::UnreadCountUpdate {
            unread_count: ergebnis.ungelesen,
        },
    );

    if ergebnis.neu {
        state.registry.an_raum_senden(
            &ctx.room_id,
            &ServerEvent::MessageSeenUpdate {
                message_id,
                user_id: ctx.user_id,
                username: ctx.username.clone(),
            },
        );
    }
    Ok(())
}

/// Reaktion hinzufuegen (`hinzufuegen = true`) oder entfernen
pub async fn handle_reaction<D: RoomStore>(
    req: ReactionRequest,
    hinzufuegen: bool,
    ctx: &VerbindungsKontext,
    state: &Arc<HubState<D>>,
) -> HubResult<()> {
    let message_id = pflicht(req.message_id, "message_id")?;
    let emoji = req.emoji.unwrap_or_default();

    let reactions = if hinzufuegen {
        state
            .chat
            .reaktion_hinzufuegen(ctx.room_id, message_id, ctx.user_id, &emoji)
            .await?
    } else {
        state
            .chat
            .reaktion_entfernen(ctx.room_id, message_id, ctx.user_id, &emoji)
            .await?
    };

    state.registry.an_raum_senden(
        &ctx.room_id,
        &ServerEvent::ReactionUpdate {
            message_id,
            reactions,
        },
    );
    Ok(())
}
