//! Identitaetsaufloesung
//!
//! Der Hub akzeptiert nur Verbindungen mit aufgeloester Identitaet. Wie das
//! Credential aussieht (JWT, Session-Token) entscheidet der Resolver.

use std::sync::Arc;

use async_trait::async_trait;
use roomhub_core::UserId;
use serde::{Deserialize, Serialize};

use crate::error::AuthResult;

/// Verifizierte Identitaet eines Clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identitaet {
    pub user_id: UserId,
    pub username: String,
}

/// Loest ein Bearer-Credential in eine Identitaet auf
///
/// `Ok(None)` bedeutet: Credential unbekannt oder ungueltig. `Err` ist fuer
/// Infrastrukturfehler (z.B. Datenbank nicht erreichbar) reserviert.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn aufloesen(&self, credential: &str) -> AuthResult<Option<Identitaet>>;
}

/// Probiert mehrere Resolver der Reihe nach
#[derive(Default, Clone)]
pub struct ResolverKette {
    resolver: Vec<Arc<dyn IdentityResolver>>,
}

impl ResolverKette {
    pub fn neu() -> Self {
        Self::default()
    }

    pub fn mit(mut self, resolver: Arc<dyn IdentityResolver>) -> Self {
        self.resolver.push(resolver);
        self
    }

    pub fn ist_leer(&self) -> bool {
        self.resolver.is_empty()
    }
}

#[async_trait]
impl IdentityResolver for ResolverKette {
    async fn aufloesen(&self, credential: &str) -> AuthResult<Option<Identitaet>> {
        for resolver in &self.resolver {
            if let Some(identitaet) = resolver.aufloesen(credential).await? {
                return Ok(Some(identitaet));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fest(&'static str, Identitaet);

    #[async_trait]
    impl IdentityResolver for Fest {
        async fn aufloesen(&self, credential: &str) -> AuthResult<Option<Identitaet>> {
            Ok((credential == self.0).then(|| self.1.clone()))
        }
    }

    #[tokio::test]
    async fn kette_nimmt_ersten_treffer() {
        let anna = Identitaet {
            user_id: UserId::new(),
            username: "anna".into(),
        };
        let ben = Identitaet {
            user_id: UserId::new(),
            username: "ben".into(),
        };
        let kette = ResolverKette::neu()
            .mit(Arc::new(Fest("a", anna.clone())))
            .mit(Arc::new(Fest("b", ben.clone())));

        assert_eq!(kette.aufloesen("a").await.unwrap(), Some(anna));
        assert_eq!(kette.aufloesen("b").await.unwrap(), Some(ben));
        assert_eq!(kette.aufloesen("c").await.unwrap(), None);
    }
}
