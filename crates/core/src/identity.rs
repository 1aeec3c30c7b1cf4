//! Externally authenticated principal.

use serde::{Deserialize, Serialize};

use crate::id::IdentityId;

/// Identity issued by the external identity provider (id + email).
///
/// Immutable once issued. Directory records are linked to it by email, so
/// `email` is stored trimmed and lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    id: IdentityId,
    email: String,
}

impl Identity {
    pub fn new(id: IdentityId, email: impl AsRef<str>) -> Self {
        Self {
            id,
            email: email.as_ref().trim().to_lowercase(),
        }
    }

    pub fn id(&self) -> IdentityId {
        self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Display name derived from the local part of the email
    /// (`maria.lopez@corp.pe` → `Maria Lopez`).
    pub fn email_display_name(&self) -> String {
        let local = self.email.split('@').next().unwrap_or_default();
        local
            .split(['.', '_', '-'])
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
