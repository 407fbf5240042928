//! roomhub-auth – Identitaet und Berechtigungen
//!
//! Dieses Crate implementiert:
//! - `IdentityResolver`: Bearer-Credential -> (user_id, username)
//! - JWT-Aufloesung (HS256, Claim `user_id`)
//! - Session-Management (in-memory mit TTL)
//! - Permission-Evaluator: reine Rollenentscheidung plus Moderationsregeln

pub mod error;
pub mod identity;
pub mod jwt;
pub mod permission;
pub mod session;

// Bequeme Re-Exporte
pub use error::{AuthError, AuthResult};
pub use identity::{Identitaet, IdentityResolver, ResolverKette};
pub use jwt::{JwtClaims, JwtResolver};
pub use permission::{erlaubt, PermissionService, MODERATION_ROLLEN};
pub use session::{Session, SessionStore};
