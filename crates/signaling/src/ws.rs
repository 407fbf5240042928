//! WebSocket-Endpunkt `GET /ws/room/{room_id}/`
//!
//! Der Handshake (`Connecting -> Authenticated`) passiert vor dem Upgrade:
//! - kein oder unbekanntes Credential -> 401
//! - Resolver- oder Speicherfehler -> 500
//! - unbekannter Raum -> 404
//!
//! Das Credential kommt als Query-Parameter `token` oder als
//! `Authorization: Bearer <token>`.

use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use roomhub_auth::Identitaet;
use roomhub_core::RoomId;
use roomhub_db::RoomStore;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::watch;

use crate::connection::ClientConnection;
use crate::server_state::HubState;

/// Query-Parameter des Handshakes
#[derive(Debug, Default, Deserialize)]
pub struct WsParameter {
    pub token: Option<String>,
}

struct WsZustand<D: RoomStore> {
    hub: Arc<HubState<D>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl<D: RoomStore> Clone for WsZustand<D> {
    fn clone(&self) -> Self {
        Self {
            hub: Arc::clone(&self.hub),
            shutdown_rx: self.shutdown_rx.clone(),
        }
    }
}

/// Router mit dem WebSocket-Endpunkt des Hubs
pub fn ws_router<D: RoomStore + 'static>(state: Arc<HubState<D>>, shutdown_rx: watch::Receiver<bool>) -> Router {
    Router::new()
        .route("/ws/room/:room_id/", get(ws_handler::<D>))
        .with_state(WsZustand {
            hub: state,
            shutdown_rx,
        })
}

/// Liest das Credential aus Query oder Authorization-Header
pub fn credential_extrahieren(params: &WsParameter, headers: &HeaderMap) -> Option<String> {
    if let Some(token) = params.token.as_deref().filter(|t| !t.is_empty()) {
        return Some(token.to_string());
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|wert| wert.to_str().ok())
        .and_then(|wert| wert.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Prueft Credential und Raum, ohne den Socket anzufassen
pub async fn handshake_pruefen<D: RoomStore>(
    state: &HubState<D>,
    credential: Option<&str>,
    room: &str,
) -> Result<(Identitaet, RoomId), StatusCode> {
    let Some(credential) = credential else {
        tracing::debug!("WebSocket-Handshake ohne Credential");
        return Err(StatusCode::UNAUTHORIZED);
    };

    let identitaet = match state.identitaet.aufloesen(credential).await {
        Ok(Some(identitaet)) => identitaet,
        Ok(None) => {
            tracing::debug!("WebSocket-Handshake mit ungueltigem Credential");
            return Err(StatusCode::UNAUTHORIZED);
        }
        Err(e) => {
            tracing::error!(fehler = %e, "Identitaetsaufloesung fehlgeschlagen");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let room_id: RoomId = room.parse().map_err(|_| StatusCode::NOT_FOUND)?;
    match state.store.get_room(room_id).await {
        Ok(Some(_)) => Ok((identitaet, room_id)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!(room_id = %room_id, fehler = %e, "Raum-Lookup fehlgeschlagen");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn ws_handler<D: RoomStore + 'static>(
    State(zustand): State<WsZustand<D>>,
    Path(room): Path<String>,
    Query(params): Query<WsParameter>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let credential = credential_extrahieren(&params, &headers);

    match handshake_pruefen(&zustand.hub, credential.as_deref(), &room).await {
        Ok((identitaet, room_id)) => {
            tracing::info!(
                user_id = %identitaet.user_id,
                room_id = %room_id,
                "WebSocket-Handshake erfolgreich"
            );
            let verbindung = ClientConnection::neu(Arc::clone(&zustand.hub), identitaet, room_id);
            let shutdown_rx = zustand.shutdown_rx.clone();
            ws.on_upgrade(move |socket| verbindung.verarbeiten(socket, shutdown_rx))
        }
        Err(status) => {
            tracing::warn!(raum = %room, status = %status, "WebSocket-Handshake abgelehnt");
            status.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn credential_aus_query_hat_vorrang() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer aus-header"));
        let params = WsParameter {
            token: Some("aus-query".into()),
        };
        assert_eq!(credential_extrahieren(&params, &headers).as_deref(), Some("aus-query"));
    }

    #[test]
    fn credential_aus_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(
            credential_extrahieren(&WsParameter::default(), &headers).as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn kein_credential() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        let params = WsParameter {
            token: Some(String::new()),
        };
        assert_eq!(credential_extrahieren(&params, &headers), None);
    }
}
