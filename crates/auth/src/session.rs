//! Session-Management fuer roomhub
//!
//! Opake Session-Tokens fuer lokale Deployments und Tests, in denen kein
//! JWT-Aussteller vorhanden ist. Sessions werden im Speicher gehalten
//! (HashMap mit TTL); ein optionaler Hintergrund-Task raeumt ab.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::RngCore;
use roomhub_core::UserId;
use tokio::sync::RwLock;

use crate::error::{AuthError, AuthResult};
use crate::identity::{Identitaet, IdentityResolver};

/// Standard-Session-Lebensdauer: 24 Stunden
const SESSION_TTL_SEKUNDEN: i64 = 24 * 60 * 60;

/// Intervall fuer den automatischen Cleanup-Task: 15 Minuten
const CLEANUP_INTERVALL: Duration = Duration::from_secs(15 * 60);

/// Ein aktives Session-Token
#[derive(Debug, Clone)]
pub struct Session {
    /// Der Token-String (URL-sicheres Base64)
    pub token: String,
    pub user_id: UserId,
    pub username: String,
    pub erstellt_am: DateTime<Utc>,
    pub laeuft_ab_am: DateTime<Utc>,
}

impl Session {
    /// Gibt `true` zurueck wenn die Session noch gueltig ist
    pub fn ist_gueltig(&self) -> bool {
        Utc::now() < self.laeuft_ab_am
    }
}

/// In-Memory Session-Store mit TTL-Unterstuetzung
#[derive(Debug)]
pub struct SessionStore {
    /// token -> Session
    sessions: RwLock<HashMap<String, Session>>,
    ttl_sek: i64,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl_sek: SESSION_TTL_SEKUNDEN,
        }
    }
}

impl SessionStore {
    /// Erstellt einen neuen leeren Session-Store
    pub fn neu() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Erstellt einen Session-Store mit eigener Lebensdauer
    pub fn mit_ttl(ttl_sek: i64) -> Arc<Self> {
        Arc::new(Self {
            ttl_sek,
            ..Self::default()
        })
    }

    /// Startet den periodischen Cleanup-Task
    pub fn cleanup_starten(store: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store_klon = Arc::clone(store);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(CLEANUP_INTERVALL).await;
                let entfernt = store_klon.cleanup_abgelaufene().await;
                if entfernt > 0 {
                    tracing::debug!(anzahl = entfernt, "Abgelaufene Sessions bereinigt");
                }
            }
        })
    }

    /// Erstellt eine neue Session fuer den angegebenen Benutzer
    pub async fn erstellen(&self, user_id: UserId, username: &str) -> Session {
        let token = token_generieren();
        let jetzt = Utc::now();
        let session = Session {
            token: token.clone(),
            user_id,
            username: username.to_string(),
            erstellt_am: jetzt,
            laeuft_ab_am: jetzt + chrono::Duration::seconds(self.ttl_sek),
        };

        self.sessions.write().await.insert(token, session.clone());
        tracing::debug!(user_id = %user_id, "Neue Session erstellt");
        session
    }

    /// Validiert einen Session-Token und gibt die Session zurueck
    pub async fn validieren(&self, token: &str) -> AuthResult<Session> {
        let sessions = self.sessions.read().await;
        match sessions.get(token) {
            None => Err(AuthError::SessionUngueltig),
            Some(session) if !session.ist_gueltig() => Err(AuthError::SessionAbgelaufen),
            Some(session) => Ok(session.clone()),
        }
    }

    /// Invalidiert (loescht) eine Session anhand des Tokens
    pub async fn invalidieren(&self, token: &str) {
        self.sessions.write().await.remove(token);
        tracing::debug!("Session invalidiert");
    }

    /// Bereinigt abgelaufene Sessions und gibt die Anzahl der entfernten Sessions zurueck
    pub async fn cleanup_abgelaufene(&self) -> usize {
        let jetzt = Utc::now();
        let mut sessions = self.sessions.write().await;
        let vorher = sessions.len();
        sessions.retain(|_, s| s.laeuft_ab_am > jetzt);
        vorher - sessions.len()
    }

    /// Gibt die Anzahl der aktiven (nicht abgelaufenen) Sessions zurueck
    pub async fn anzahl_aktive(&self) -> usize {
        let jetzt = Utc::now();
        let sessions = self.sessions.read().await;
        sessions.values().filter(|s| s.laeuft_ab_am > jetzt).count()
    }
}

#[async_trait]
impl IdentityResolver for SessionStore {
    async fn aufloesen(&self, credential: &str) -> AuthResult<Option<Identitaet>> {
        match self.validieren(credential).await {
            Ok(session) => Ok(Some(Identitaet {
                user_id: session.user_id,
                username: session.username,
            })),
            Err(AuthError::SessionUngueltig | AuthError::SessionAbgelaufen) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Generiert einen kryptografisch sicheren Session-Token (URL-sicheres Base64)
fn token_generieren() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}
