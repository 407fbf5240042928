//! JWT-basierte Identitaetsaufloesung
//!
//! Erwartet HS256-signierte Tokens mit dem Claim `user_id` (UUID) und `exp`.
//! Der Benutzername wird aus dem Benutzerspeicher gelesen; Tokens fuer
//! unbekannte Benutzer gelten als ungueltig.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use roomhub_core::UserId;
use roomhub_db::UserRepository;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use crate::identity::{Identitaet, IdentityResolver};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub user_id: Uuid,
    pub exp: u64,
}

pub struct JwtResolver<U: UserRepository> {
    users: Arc<U>,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl<U: UserRepository> JwtResolver<U> {
    pub fn neu(users: Arc<U>, secret: &[u8]) -> Self {
        Self {
            users,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Stellt ein Token aus (Dev-Tooling und Tests)
    pub fn token_ausstellen(&self, user_id: UserId, gueltig_sek: i64) -> AuthResult<String> {
        let exp = (Utc::now().timestamp() + gueltig_sek).max(0) as u64;
        let claims = JwtClaims {
            user_id: user_id.inner(),
            exp,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::intern(format!("JWT konnte nicht signiert werden: {e}")))
    }

    fn claims_pruefen(&self, token: &str) -> AuthResult<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding, &self.validation)
            .map(|daten| daten.claims)
            .map_err(|e| AuthError::TokenUngueltig(e.to_string()))
    }
}

#[async_trait]
impl<U: UserRepository + 'static> IdentityResolver for JwtResolver<U> {
    async fn aufloesen(&self, credential: &str) -> AuthResult<Option<Identitaet>> {
        let claims = match self.claims_pruefen(credential) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(fehler = %e, "JWT abgelehnt");
                return Ok(None);
            }
        };

        let user_id = UserId(claims.user_id);
        let Some(benutzer) = self.users.get_user(user_id).await? else {
            tracing::debug!(user_id = %user_id, "JWT fuer unbekannten Benutzer");
            return Ok(None);
        };

        Ok(Some(Identitaet {
            user_id,
            username: benutzer.username,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomhub_db::SqliteDb;

    async fn resolver() -> (JwtResolver<SqliteDb>, Arc<SqliteDb>) {
        let db = Arc::new(SqliteDb::in_memory().await.unwrap());
        (JwtResolver::neu(Arc::clone(&db), b"test-secret"), db)
    }

    #[tokio::test]
    async fn gueltiges_token_loest_auf() {
        let (resolver, db) = resolver().await;
        let anna = db.create_user("anna").await.unwrap();

        let token = resolver.token_ausstellen(anna.id, 3600).unwrap();
        let identitaet = resolver.aufloesen(&token).await.unwrap().unwrap();
        assert_eq!(identitaet.user_id, anna.id);
        assert_eq!(identitaet.username, "anna");
    }

    #[tokio::test]
    async fn abgelaufenes_token_abgelehnt() {
        let (resolver, db) = resolver().await;
        let anna = db.create_user("anna").await.unwrap();

        let token = resolver.token_ausstellen(anna.id, -3600).unwrap();
        assert_eq!(resolver.aufloesen(&token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn falsche_signatur_und_unbekannter_benutzer() {
        let (resolver, db) = resolver().await;
        let anna = db.create_user("anna").await.unwrap();

        let fremd = JwtResolver::neu(Arc::clone(&db), b"anderes-secret");
        let token = fremd.token_ausstellen(anna.id, 3600).unwrap();
        assert_eq!(resolver.aufloesen(&token).await.unwrap(), None);

        let token = resolver.token_ausstellen(UserId::new(), 3600).unwrap();
        assert_eq!(resolver.aufloesen(&token).await.unwrap(), None);

        assert_eq!(resolver.aufloesen("kein.jwt.token").await.unwrap(), None);
    }
}
