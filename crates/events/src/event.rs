use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hrgate_core::Identity;

/// Kind of authentication event emitted by the identity provider.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserDeleted,
}

/// Authentication event as delivered by the identity collaborator.
///
/// Every kind may carry an identity or none; sign-out and deletion never
/// need one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub identity: Option<Identity>,
    pub occurred_at: DateTime<Utc>,
}

impl AuthEvent {
    pub fn signed_in(identity: Identity) -> Self {
        Self::new(AuthEventKind::SignedIn, Some(identity))
    }

    pub fn signed_out() -> Self {
        Self::new(AuthEventKind::SignedOut, None)
    }

    pub fn token_refreshed(identity: Option<Identity>) -> Self {
        Self::new(AuthEventKind::TokenRefreshed, identity)
    }

    pub fn user_deleted() -> Self {
        Self::new(AuthEventKind::UserDeleted, None)
    }

    fn new(kind: AuthEventKind, identity: Option<Identity>) -> Self {
        Self {
            kind,
            identity,
            occurred_at: Utc::now(),
        }
    }
}
