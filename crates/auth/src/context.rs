//! The resolved authorization context of a session.

use serde::{Deserialize, Serialize};

use crate::{Action, CanonicalArea, ModuleKey, ModulePermissions, RoleName};

/// Record-visibility restriction of a context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    /// No restriction.
    Global,
    /// Records of one functional area, across every location and unit.
    AreaRestricted { area: CanonicalArea },
    /// Records of one location (and unit, when set). Normalized values; a
    /// missing location matches no record.
    LocationRestricted {
        location: Option<String>,
        business_unit: Option<String>,
    },
}

impl Scope {
    /// The most restrictive scope: no record is visible.
    pub fn nothing() -> Self {
        Scope::LocationRestricted {
            location: None,
            business_unit: None,
        }
    }
}

/// Where a context's data came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextSource {
    /// Built from the holder's directory records.
    Directory,
    /// Minimal stand-in (no profile found, or the directory failed). Never
    /// authoritative.
    Fallback,
}

/// Everything other components may know about what a session can do.
///
/// Immutable: a re-resolution produces a new context that replaces the old
/// one wholesale. The constructors keep the invariants:
/// - a global admin has `Scope::Global` and every module fully granted;
/// - area and location restrictions are exclusive by construction of [`Scope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationContext {
    role_name: Option<RoleName>,
    display_name: String,
    permissions: ModulePermissions,
    scope: Scope,
    is_global_admin: bool,
    source: ContextSource,
    override_rule: Option<String>,
}

impl AuthorizationContext {
    /// Full grant conferred by an exception rule.
    pub fn global_admin(
        role_name: Option<RoleName>,
        display_name: impl Into<String>,
        override_rule: impl Into<String>,
    ) -> Self {
        Self {
            role_name,
            display_name: display_name.into(),
            permissions: ModulePermissions::full(),
            scope: Scope::Global,
            is_global_admin: true,
            source: ContextSource::Directory,
            override_rule: Some(override_rule.into()),
        }
    }

    /// Regular context built from the permission table and scope resolution.
    pub fn scoped(
        role_name: Option<RoleName>,
        display_name: impl Into<String>,
        permissions: ModulePermissions,
        scope: Scope,
    ) -> Self {
        Self {
            role_name,
            display_name: display_name.into(),
            permissions,
            scope,
            is_global_admin: false,
            source: ContextSource::Directory,
            override_rule: None,
        }
    }

    /// No module readable, no record visible.
    pub fn restricted(display_name: impl Into<String>, source: ContextSource) -> Self {
        Self {
            role_name: None,
            display_name: display_name.into(),
            permissions: ModulePermissions::none(),
            scope: Scope::nothing(),
            is_global_admin: false,
            source,
            override_rule: None,
        }
    }

    pub fn role_name(&self) -> Option<&RoleName> {
        self.role_name.as_ref()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn permissions(&self) -> &ModulePermissions {
        &self.permissions
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn is_global_admin(&self) -> bool {
        self.is_global_admin
    }

    pub fn source(&self) -> ContextSource {
        self.source
    }

    pub fn is_authoritative(&self) -> bool {
        self.source == ContextSource::Directory
    }

    /// Id of the exception rule that granted global admin, if any.
    pub fn override_rule(&self) -> Option<&str> {
        self.override_rule.as_deref()
    }

    pub fn allows(&self, module: &ModuleKey, action: Action) -> bool {
        self.is_global_admin || self.permissions.allows(module, action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_admin_is_global_and_fully_granted() {
        let ctx = AuthorizationContext::global_admin(Some(RoleName::new("ADMIN")), "Ana", "system-administrators");
        assert_eq!(ctx.scope(), &Scope::Global);
        for module in ModuleKey::ALL {
            for action in Action::ALL {
                assert!(ctx.permissions().allows(&module, action));
            }
        }
        assert_eq!(ctx.override_rule(), Some("system-administrators"));
    }

    #[test]
    fn restricted_context_grants_nothing() {
        let ctx = AuthorizationContext::restricted("maria", ContextSource::Fallback);
        assert!(!ctx.is_authoritative());
        assert_eq!(ctx.scope(), &Scope::nothing());
        assert!(ModuleKey::ALL.iter().all(|m| !ctx.allows(m, Action::Read)));
    }

    #[test]
    fn scope_serializes_tagged() {
        let scope = Scope::AreaRestricted {
            area: CanonicalArea::Operaciones,
        };
        assert_eq!(
            serde_json::to_value(&scope).unwrap(),
            serde_json::json!({"kind": "area_restricted", "area": "OPERACIONES"})
        );
    }
}
