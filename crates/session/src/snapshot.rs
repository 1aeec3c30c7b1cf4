//! Read-only view of the session published by the manager.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use hrgate_auth::{AuthorizationContext, EmployeeProfile};
use hrgate_core::Identity;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Unauthenticated,
    Resolving,
    Authorized,
    /// Signed in, but only a restrictive stand-in context is available.
    FallbackIdentity,
}

/// User-facing condition attached to a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionNotice {
    /// The role may not use the web application; the session was ended.
    WebAccessDenied { role: String },
    DirectoryUnavailable { message: String },
    ProfileNotFound,
    ProfileInactive,
}

impl SessionNotice {
    pub fn message(&self) -> String {
        match self {
            SessionNotice::WebAccessDenied { role } => {
                format!("The role '{role}' does not have access to the web application.")
            }
            SessionNotice::DirectoryUnavailable { .. } => {
                "Your permissions could not be loaded. Access is limited until you retry.".to_string()
            }
            SessionNotice::ProfileNotFound => {
                "No employee profile is linked to this account. Contact HR.".to_string()
            }
            SessionNotice::ProfileInactive => "Your employee profile is inactive. Contact HR.".to_string(),
        }
    }
}

/// Immutable snapshot of the session.
///
/// Readers hold `Arc`s of these; the manager replaces the whole snapshot on
/// every transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub generation: u64,
    pub identity: Option<Identity>,
    pub profile: Option<EmployeeProfile>,
    pub context: Option<Arc<AuthorizationContext>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub notice: Option<SessionNotice>,
}

impl SessionSnapshot {
    pub fn unauthenticated(generation: u64, notice: Option<SessionNotice>) -> Self {
        Self {
            status: SessionStatus::Unauthenticated,
            generation,
            identity: None,
            profile: None,
            context: None,
            resolved_at: None,
            notice,
        }
    }

    /// Resolving `identity`. A re-resolution of the same identity keeps the
    /// previous profile and context visible until the new one is published.
    pub fn resolving(&self, generation: u64, identity: Identity) -> Self {
        let same_identity = self.identity.as_ref() == Some(&identity);
        Self {
            status: SessionStatus::Resolving,
            generation,
            profile: if same_identity { self.profile.clone() } else { None },
            context: if same_identity { self.context.clone() } else { None },
            resolved_at: if same_identity { self.resolved_at } else { None },
            identity: Some(identity),
            notice: None,
        }
    }

    pub fn context(&self) -> Option<&AuthorizationContext> {
        self.context.as_deref()
    }
}
