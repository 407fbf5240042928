//! Gemeinsamer Hub-Zustand
//!
//! Haelt alle geteilten Services und Zustands-Manager als Arc-Referenzen,
//! die sicher zwischen tokio-Tasks geteilt werden koennen.

use dashmap::DashMap;
use roomhub_auth::{IdentityResolver, PermissionService};
use roomhub_chat::ChatService;
use roomhub_core::RoomId;
use roomhub_crypto::NachrichtenCipher;
use roomhub_db::RoomStore;
use roomhub_observability::HubMetriken;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use crate::presence::PresenceCache;
use crate::registry::SessionRegistry;

/// Konfiguration fuer den Hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Keepalive-Intervall in Sekunden
    pub keepalive_sek: u64,
    /// Timeout fuer inaktive Verbindungen in Sekunden
    pub verbindungs_timeout_sek: u64,
    /// Groesse der Send-Queue pro Verbindung
    pub send_queue_groesse: usize,
    /// Standarddauer einer Stummschaltung in Minuten
    pub mute_standard_minuten: i64,
    /// Maximale Nachrichtenlaenge in Zeichen
    pub max_nachrichten_laenge: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            keepalive_sek: 30,
            verbindungs_timeout_sek: 90,
            send_queue_groesse: 64,
            mute_standard_minuten: 10,
            max_nachrichten_laenge: 4096,
        }
    }
}

/// Ein Mutex pro Raum, bei Bedarf angelegt
#[derive(Default)]
pub struct RaumSperren {
    sperren: DashMap<RoomId, Arc<Mutex<()>>>,
}

impl RaumSperren {
    pub fn holen(&self, room_id: RoomId) -> Arc<Mutex<()>> {
        Arc::clone(&self.sperren.entry(room_id).or_default())
    }
}

/// Gemeinsamer Hub-Zustand (thread-safe, Arc-geteilt)
pub struct HubState<D: RoomStore> {
    pub config: HubConfig,
    /// Speicher-Kollaborator
    pub store: Arc<D>,
    pub chat: Arc<ChatService<D>>,
    pub berechtigungen: PermissionService<D>,
    /// Loest Bearer-Credentials beim Handshake auf
    pub identitaet: Arc<dyn IdentityResolver>,
    pub presence: Arc<dyn PresenceCache>,
    pub registry: SessionRegistry,
    pub metriken: HubMetriken,
    /// Serialisiert Join/Leave (Registry + Presence) pro Raum
    pub presence_sperren: RaumSperren,
    /// Serialisiert Start/Verlassen/Beenden von Anrufen pro Raum
    pub anruf_sperren: RaumSperren,
    pub start_time: Instant,
}

impl<D: RoomStore> HubState<D> {
    /// Erstellt einen neuen HubState
    pub fn neu(
        config: HubConfig,
        store: Arc<D>,
        cipher: Arc<NachrichtenCipher>,
        identitaet: Arc<dyn IdentityResolver>,
        presence: Arc<dyn PresenceCache>,
        metriken: HubMetriken,
    ) -> Arc<Self> {
        let chat = ChatService::neu(Arc::clone(&store), cipher, config.max_nachrichten_laenge);
        let berechtigungen = PermissionService::neu(Arc::clone(&store));
        let registry = SessionRegistry::neu(config.send_queue_groesse, metriken.clone());

        Arc::new(Self {
            config,
            store,
            chat,
            berechtigungen,
            identitaet,
            presence,
            registry,
            metriken,
            presence_sperren: RaumSperren::default(),
            anruf_sperren: RaumSperren::default(),
            start_time: Instant::now(),
        })
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
