//! Client-Connection – Verwaltet eine einzelne WebSocket-Verbindung
//!
//! Jede Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task. Authentifizierung und Raumpruefung sind vor dem Upgrade
//! erledigt (siehe `ws`), der Task startet also direkt mit dem Beitritt.
//!
//! ## Zustaende
//! ```text
//! Connecting -> Authenticated -> Joined -> Closed
//! ```
//!
//! ## Keepalive
//! - Server sendet alle `keepalive_sek` einen Ping
//! - Kommt innerhalb von `verbindungs_timeout_sek` kein Frame, wird getrennt
//!
//! ## Schliessen
//! Ein Kick setzt das Schliess-Signal des Handles. Der Task stellt zuerst
//! alle bereits eingereihten Frames zu und schickt dann den Close-Frame
//! mit Code und Grund.

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use roomhub_auth::Identitaet;
use roomhub_core::RoomId;
use roomhub_db::RoomStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::lifecycle::{self, Beitritt};
use crate::registry::Schliessung;
use crate::server_state::HubState;

/// Close-Code beim Herunterfahren des Servers ("going away")
const CLOSE_SHUTDOWN: u16 = 1001;

/// Verarbeitet eine einzelne WebSocket-Verbindung
pub struct ClientConnection<D: RoomStore> {
    state: Arc<HubState<D>>,
    identitaet: Identitaet,
    room_id: RoomId,
}

impl<D: RoomStore> ClientConnection<D> {
    /// Erstellt eine neue ClientConnection fuer eine bereits authentifizierte Identitaet
    pub fn neu(state: Arc<HubState<D>>, identitaet: Identitaet, room_id: RoomId) -> Self {
        Self {
            state,
            identitaet,
            room_id,
        }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis der Client trennt, die Verbindung per Kick geschlossen
    /// wird, der Timeout greift oder ein Shutdown-Signal eingeht.
    pub async fn verarbeiten(self, socket: WebSocket, mut shutdown_rx: watch::Receiver<bool>) {
        let state = self.state;
        let keepalive_intervall = Duration::from_secs(state.config.keepalive_sek.max(1));
        let timeout_dauer = Duration::from_secs(state.config.verbindungs_timeout_sek.max(1));

        let (mut sender, mut receiver) = socket.split();

        let Beitritt { kontext: ctx, mut empfang } =
            match lifecycle::beitreten(&state, self.identitaet, self.room_id).await {
                Ok(beitritt) => beitritt,
                Err(e) => {
                    // Raum kann zwischen Handshake und Upgrade verschwunden sein
                    tracing::warn!(room_id = %self.room_id, fehler = %e.detail(), "Beitritt fehlgeschlagen");
                    let _ = sender
                        .send(Message::Close(Some(CloseFrame {
                            code: 1011,
                            reason: e.to_string().into(),
                        })))
                        .await;
                    return;
                }
            };

        let mut letzter_empfang = Instant::now();
        let mut naechster_ping = Instant::now() + keepalive_intervall;

        loop {
            let jetzt = Instant::now();

            if jetzt.duration_since(letzter_empfang) > timeout_dauer {
                tracing::warn!(connection_id = %ctx.connection_id, "Verbindungs-Timeout");
                break;
            }

            let ping_verzoegerung = if jetzt < naechster_ping {
                naechster_ping.duration_since(jetzt)
            } else {
                Duration::from_millis(1)
            };

            tokio::select! {
                // Eingehender Frame vom Client
                frame = receiver.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            letzter_empfang = Instant::now();
                            lifecycle::frame_verarbeiten(&state, &ctx, &text).await;
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::info!(connection_id = %ctx.connection_id, "Verbindung vom Client getrennt");
                            break;
                        }
                        Some(Ok(_)) => {
                            // Ping/Pong/Binary zaehlen nur als Lebenszeichen
                            letzter_empfang = Instant::now();
                        }
                        Some(Err(e)) => {
                            tracing::warn!(connection_id = %ctx.connection_id, fehler = %e, "Frame-Lesefehler");
                            break;
                        }
                    }
                }

                // Ausgehendes Ereignis aus der Registry
                Some(ausgehend) = empfang.rx.recv() => {
                    if let Err(e) = sender.send(Message::Text(ausgehend.to_string())).await {
                        tracing::warn!(connection_id = %ctx.connection_id, fehler = %e, "Senden fehlgeschlagen");
                        break;
                    }
                }

                // Keepalive-Ping
                _ = tokio::time::sleep(ping_verzoegerung) => {
                    if Instant::now() >= naechster_ping {
                        if let Err(e) = sender.send(Message::Ping(Vec::new())).await {
                            tracing::warn!(connection_id = %ctx.connection_id, fehler = %e, "Ping-Senden fehlgeschlagen");
                            break;
                        }
                        naechster_ping = Instant::now() + keepalive_intervall;
                    }
                }

                // Schliess-Signal (Kick)
                Ok(()) = empfang.schliessen_rx.changed() => {
                    let schliessung = empfang.schliessen_rx.borrow_and_update().clone();
                    if let Some(schliessung) = schliessung {
                        while let Ok(rest) = empfang.rx.try_recv() {
                            if sender.send(Message::Text(rest.to_string())).await.is_err() {
                                break;
                            }
                        }
                        tracing::info!(
                            connection_id = %ctx.connection_id,
                            code = schliessung.code,
                            grund = %schliessung.grund,
                            "Verbindung wird serverseitig geschlossen"
                        );
                        schliessen(&mut sender, schliessung).await;
                        break;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(connection_id = %ctx.connection_id, "Shutdown-Signal – Verbindung wird getrennt");
                        schliessen(
                            &mut sender,
                            Schliessung {
                                code: CLOSE_SHUTDOWN,
                                grund: "Server shutting down".to_string(),
                            },
                        )
                        .await;
                        break;
                    }
                }
            }
        }

        lifecycle::trennen(&state, &ctx).await;
        tracing::debug!(connection_id = %ctx.connection_id, "Verbindungs-Task beendet");
    }
}

async fn schliessen(sender: &mut SplitSink<WebSocket, Message>, schliessung: Schliessung) {
    let _ = sender
        .send(Message::Close(Some(CloseFrame {
            code: schliessung.code,
            reason: schliessung.grund.into(),
        })))
        .await;
}
