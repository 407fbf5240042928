//! Session-Registry – Welche Verbindung gehoert zu welchem Raum und Benutzer
//!
//! Prozessweite Zuordnung:
//! - `ConnectionId -> VerbindungsHandle` (Send-Queue + Schliess-Signal)
//! - `RoomId -> {ConnectionId}` (Raum-Gruppe)
//! - `UserId -> {ConnectionId}` (private Gruppe des Benutzers)
//!
//! ## Zustellung
//! Ereignisse werden pro Broadcast genau einmal serialisiert und als
//! `Arc<str>` in die Queues eingereiht. Eingereiht wird nicht-blockierend:
//! ist die Queue eines langsamen Clients voll, wird fuer diesen Client
//! verworfen, die anderen Empfaenger bleiben unberuehrt.

use dashmap::DashMap;
use roomhub_core::{ConnectionId, RoomId, UserId};
use roomhub_observability::HubMetriken;
use roomhub_protocol::ServerEvent;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Close-Code fuer einen Kick aus dem Raum
pub const CLOSE_GEKICKT: u16 = 4001;

// ---------------------------------------------------------------------------
// VerbindungsHandle
// ---------------------------------------------------------------------------

/// Aufforderung an den Verbindungs-Task, den Socket zu schliessen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schliessung {
    pub code: u16,
    pub grund: String,
}

/// Handle auf eine registrierte Verbindung
#[derive(Clone, Debug)]
pub struct VerbindungsHandle {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    pub room_id: RoomId,
    tx: mpsc::Sender<Arc<str>>,
    schliessen_tx: Arc<watch::Sender<Option<Schliessung>>>,
}

impl VerbindungsHandle {
    /// Reiht einen serialisierten Frame nicht-blockierend ein
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    fn senden(&self, frame: Arc<str>, metriken: &HubMetriken) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    connection_id = %self.connection_id,
                    user_id = %self.user_id,
                    "Send-Queue voll – Ereignis verworfen"
                );
                metriken.zustellung_verworfen();
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(
                    connection_id = %self.connection_id,
                    "Send-Queue geschlossen (Client getrennt)"
                );
                false
            }
        }
    }

    /// Signalisiert dem Verbindungs-Task das Schliessen
    pub fn schliessen(&self, code: u16, grund: impl Into<String>) {
        let _ = self.schliessen_tx.send(Some(Schliessung {
            code,
            grund: grund.into(),
        }));
    }
}

/// Empfangsseite einer registrierten Verbindung (gehoert dem Verbindungs-Task)
#[derive(Debug)]
pub struct VerbindungsEmpfang {
    pub rx: mpsc::Receiver<Arc<str>>,
    pub schliessen_rx: watch::Receiver<Option<Schliessung>>,
}

// ---------------------------------------------------------------------------
// SessionRegistry
// ---------------------------------------------------------------------------

/// Zentrale Registry aller Live-Verbindungen
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<SessionRegistryInner>,
}

struct SessionRegistryInner {
    verbindungen: DashMap<ConnectionId, VerbindungsHandle>,
    raeume: DashMap<RoomId, HashSet<ConnectionId>>,
    benutzer: DashMap<UserId, HashSet<ConnectionId>>,
    queue_groesse: usize,
    metriken: HubMetriken,
}

impl SessionRegistry {
    pub fn neu(queue_groesse: usize, metriken: HubMetriken) -> Self {
        Self {
            inner: Arc::new(SessionRegistryInner {
                verbindungen: DashMap::new(),
                raeume: DashMap::new(),
                benutzer: DashMap::new(),
                queue_groesse: queue_groesse.max(1),
                metriken,
            }),
        }
    }

    /// Registriert eine neue Verbindung in Raum- und Benutzergruppe
    pub fn registrieren(&self, user_id: UserId, room_id: RoomId) -> (VerbindungsHandle, VerbindungsEmpfang) {
        let (tx, rx) = mpsc::channel(self.inner.queue_groesse);
        let (schliessen_tx, schliessen_rx) = watch::channel(None);
        let handle = VerbindungsHandle {
            connection_id: ConnectionId::new(),
            user_id,
            room_id,
            tx,
            schliessen_tx: Arc::new(schliessen_tx),
        };

        self.inner
            .verbindungen
            .insert(handle.connection_id, handle.clone());
        self.inner
            .raeume
            .entry(room_id)
            .or_default()
            .insert(handle.connection_id);
        self.inner
            .benutzer
            .entry(user_id)
            .or_default()
            .insert(handle.connection_id);

        tracing::debug!(
            connection_id = %handle.connection_id,
            user_id = %user_id,
            room_id = %room_id,
            "Verbindung registriert"
        );
        (handle, VerbindungsEmpfang { rx, schliessen_rx })
    }

    /// Entfernt eine Verbindung aus allen Gruppen
    ///
    /// Gibt `None` zurueck wenn sie bereits entfernt war (z.B. nach einem Kick).
    pub fn entfernen(&self, connection_id: &ConnectionId) -> Option<VerbindungsHandle> {
        let (_, handle) = self.inner.verbindungen.remove(connection_id)?;

        if let Some(mut ids) = self.inner.raeume.get_mut(&handle.room_id) {
            ids.remove(connection_id);
        }
        self.inner
            .raeume
            .remove_if(&handle.room_id, |_, ids| ids.is_empty());

        if let Some(mut ids) = self.inner.benutzer.get_mut(&handle.user_id) {
            ids.remove(connection_id);
        }
        self.inner
            .benutzer
            .remove_if(&handle.user_id, |_, ids| ids.is_empty());

        tracing::debug!(connection_id = %connection_id, "Verbindung aus Registry entfernt");
        Some(handle)
    }

    fn handles(&self, ids: Vec<ConnectionId>) -> Vec<VerbindungsHandle> {
        ids.iter()
            .filter_map(|id| self.inner.verbindungen.get(id).map(|h| h.clone()))
            .collect()
    }

    fn raum_ids(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        self.inner
            .raeume
            .get(room_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    fn user_ids(&self, user_id: &UserId) -> Vec<ConnectionId> {
        self.inner
            .benutzer
            .get(user_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    fn serialisieren(event: &ServerEvent) -> Option<Arc<str>> {
        match event.als_json() {
            Ok(text) => Some(Arc::from(text)),
            Err(e) => {
                tracing::error!(typ = event.typ_name(), fehler = %e, "Ereignis nicht serialisierbar");
                None
            }
        }
    }

    /// Reiht einen bereits serialisierten Frame bei allen Handles ein
    pub fn frame_zustellen(&self, handles: &[VerbindungsHandle], frame: &Arc<str>) -> usize {
        handles
            .iter()
            .filter(|h| h.senden(Arc::clone(frame), &self.inner.metriken))
            .count()
    }

    fn zustellen(&self, handles: &[VerbindungsHandle], event: &ServerEvent) -> usize {
        match Self::serialisieren(event) {
            Some(frame) => self.frame_zustellen(handles, &frame),
            None => 0,
        }
    }

    /// Sendet an alle Verbindungen eines Raums
    ///
    /// Gibt die Anzahl der erfolgreichen Zustellungen zurueck.
    pub fn an_raum_senden(&self, room_id: &RoomId, event: &ServerEvent) -> usize {
        let handles = self.handles(self.raum_ids(room_id));
        if handles.is_empty() {
            return 0;
        }
        self.zustellen(&handles, event)
    }

    /// Sendet an alle Verbindungen eines Raums ausser denen eines Benutzers
    pub fn an_raum_ausser_user_senden(
        &self,
        room_id: &RoomId,
        ausgeschlossen: &UserId,
        event: &ServerEvent,
    ) -> usize {
        let handles: Vec<_> = self
            .handles(self.raum_ids(room_id))
            .into_iter()
            .filter(|h| &h.user_id != ausgeschlossen)
            .collect();
        if handles.is_empty() {
            return 0;
        }
        self.zustellen(&handles, event)
    }

    /// Sendet an die private Gruppe eines Benutzers (alle seine Verbindungen)
    pub fn an_user_senden(&self, user_id: &UserId, event: &ServerEvent) -> usize {
        let handles = self.handles(self.user_ids(user_id));
        if handles.is_empty() {
            tracing::debug!(user_id = %user_id, "Senden an Benutzer ohne Verbindung");
            return 0;
        }
        self.zustellen(&handles, event)
    }

    /// Sendet an genau eine Verbindung
    pub fn an_verbindung_senden(&self, connection_id: &ConnectionId, event: &ServerEvent) -> bool {
        let handle = match self.inner.verbindungen.get(connection_id) {
            Some(h) => h.clone(),
            None => return false,
        };
        self.zustellen(&[handle], event) == 1
    }

    /// Verbindungen eines Benutzers in einem Raum
    pub fn verbindungen_des_users_im_raum(&self, room_id: &RoomId, user_id: &UserId) -> Vec<VerbindungsHandle> {
        self.handles(self.user_ids(user_id))
            .into_iter()
            .filter(|h| &h.room_id == room_id)
            .collect()
    }

    /// Prueft ob ein Benutzer noch mindestens eine Verbindung im Raum hat
    pub fn user_im_raum(&self, room_id: &RoomId, user_id: &UserId) -> bool {
        !self.verbindungen_des_users_im_raum(room_id, user_id).is_empty()
    }

    /// Distinkte Benutzer mit Verbindung im Raum
    pub fn user_ids_im_raum(&self, room_id: &RoomId) -> HashSet<UserId> {
        self.handles(self.raum_ids(room_id))
            .into_iter()
            .map(|h| h.user_id)
            .collect()
    }

    pub fn verbindungen_im_raum(&self, room_id: &RoomId) -> usize {
        self.inner
            .raeume
            .get(room_id)
            .map(|ids| ids.len())
            .unwrap_or(0)
    }

    /// Anzahl aller registrierten Verbindungen
    pub fn anzahl(&self) -> usize {
        self.inner.verbindungen.len()
    }

    /// Anzahl Raeume mit mindestens einer Verbindung
    pub fn raum_anzahl(&self) -> usize {
        self.inner.raeume.len()
    }

    pub fn ist_registriert(&self, connection_id: &ConnectionId) -> bool {
        self.inner.verbindungen.contains_key(connection_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(queue: usize) -> SessionRegistry {
        SessionRegistry::neu(queue, HubMetriken::neu().unwrap())
    }

    fn fehler(msg: &str) -> ServerEvent {
        ServerEvent::fehler(msg)
    }

    #[tokio::test]
    async fn registrieren_und_an_raum_senden() {
        let reg = registry(8);
        let raum = RoomId::new();
        let anderer_raum = RoomId::new();

        let (_, mut e1) = reg.registrieren(UserId::new(), raum);
        let (_, mut e2) = reg.registrieren(UserId::new(), raum);
        let (_, mut e3) = reg.registrieren(UserId::new(), anderer_raum);

        assert_eq!(reg.an_raum_senden(&raum, &fehler("x")), 2);
        assert!(e1.rx.try_recv().is_ok());
        assert!(e2.rx.try_recv().is_ok());
        assert!(e3.rx.try_recv().is_err(), "anderer Raum darf nichts empfangen");
    }

    #[tokio::test]
    async fn broadcast_wird_einmal_serialisiert() {
        let reg = registry(8);
        let raum = RoomId::new();
        let (_, mut e1) = reg.registrieren(UserId::new(), raum);
        let (_, mut e2) = reg.registrieren(UserId::new(), raum);

        reg.an_raum_senden(&raum, &fehler("geteilt"));
        let a = e1.rx.try_recv().unwrap();
        let b = e2.rx.try_recv().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn ausser_user_schliesst_alle_verbindungen_des_users_aus() {
        let reg = registry(8);
        let raum = RoomId::new();
        let anna = UserId::new();

        let (_, mut tab1) = reg.registrieren(anna, raum);
        let (_, mut tab2) = reg.registrieren(anna, raum);
        let (_, mut ben) = reg.registrieren(UserId::new(), raum);

        assert_eq!(reg.an_raum_ausser_user_senden(&raum, &anna, &fehler("tippt")), 1);
        assert!(tab1.rx.try_recv().is_err());
        assert!(tab2.rx.try_recv().is_err());
        assert!(ben.rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn private_gruppe_umfasst_alle_verbindungen() {
        let reg = registry(8);
        let anna = UserId::new();
        let (_, mut a1) = reg.registrieren(anna, RoomId::new());
        let (_, mut a2) = reg.registrieren(anna, RoomId::new());

        assert_eq!(reg.an_user_senden(&anna, &fehler("privat")), 2);
        assert!(a1.rx.try_recv().is_ok());
        assert!(a2.rx.try_recv().is_ok());
        assert_eq!(reg.an_user_senden(&UserId::new(), &fehler("niemand")), 0);
    }

    #[tokio::test]
    async fn volle_queue_verwirft_nur_fuer_langsamen_client() {
        let reg = registry(1);
        let raum = RoomId::new();
        let (_, mut langsam) = reg.registrieren(UserId::new(), raum);
        let (_, mut schnell) = reg.registrieren(UserId::new(), raum);

        assert_eq!(reg.an_raum_senden(&raum, &fehler("1")), 2);
        schnell.rx.try_recv().unwrap();

        // langsam hat noch nicht gelesen -> zweites Ereignis wird fuer ihn verworfen
        assert_eq!(reg.an_raum_senden(&raum, &fehler("2")), 1);
        assert!(schnell.rx.try_recv().is_ok());
        assert!(langsam.rx.try_recv().is_ok());
        assert!(langsam.rx.try_recv().is_err());
        assert_eq!(reg.inner.metriken.zustellungen_verworfen_gesamt.get(), 1);
    }

    #[test]
    fn entfernen_bereinigt_gruppen() {
        let reg = registry(8);
        let raum = RoomId::new();
        let anna = UserId::new();

        let (handle, _e) = reg.registrieren(anna, raum);
        assert!(reg.user_im_raum(&raum, &anna));
        assert_eq!(reg.raum_anzahl(), 1);

        assert!(reg.entfernen(&handle.connection_id).is_some());
        assert!(reg.entfernen(&handle.connection_id).is_none());
        assert!(!reg.user_im_raum(&raum, &anna));
        assert_eq!(reg.anzahl(), 0);
        assert_eq!(reg.raum_anzahl(), 0);
    }

    #[test]
    fn zweite_verbindung_haelt_user_im_raum() {
        let reg = registry(8);
        let raum = RoomId::new();
        let anna = UserId::new();

        let (h1, _e1) = reg.registrieren(anna, raum);
        let (_h2, _e2) = reg.registrieren(anna, raum);
        reg.entfernen(&h1.connection_id);

        assert!(reg.user_im_raum(&raum, &anna));
        assert_eq!(reg.user_ids_im_raum(&raum).len(), 1);
    }

    #[test]
    fn schliessen_signalisiert_code() {
        let reg = registry(8);
        let (handle, empfang) = reg.registrieren(UserId::new(), RoomId::new());
        handle.schliessen(CLOSE_GEKICKT, "Removed from room");

        let schliessung = empfang.schliessen_rx.borrow().clone();
        assert_eq!(
            schliessung,
            Some(Schliessung {
                code: CLOSE_GEKICKT,
                grund: "Removed from room".into()
            })
        );
    }
}
