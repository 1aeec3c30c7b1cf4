use serde::Serialize;
use thiserror::Error;

use crate::{Action, AuthorizationContext, ContextSource, ModuleGrant, ModuleKey, Scope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    /// No session context at all.
    NotAuthenticated,
    /// The context is a non-authoritative stand-in (profile missing or
    /// directory unavailable).
    NonAuthoritativeContext,
    MissingPermission,
}

impl core::fmt::Display for DenialKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            DenialKind::NotAuthenticated => "not authenticated",
            DenialKind::NonAuthoritativeContext => "profile not resolved",
            DenialKind::MissingPermission => "missing permission",
        })
    }
}

/// A view-level denial, specific enough to render an explanation.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[error("access denied: cannot {action} in module '{module}' ({kind})")]
pub struct AccessDenied {
    pub module: ModuleKey,
    pub action: Action,
    pub kind: DenialKind,
}

impl AccessDenied {
    pub fn not_authenticated(module: &ModuleKey, action: Action) -> Self {
        Self {
            module: module.clone(),
            action,
            kind: DenialKind::NotAuthenticated,
        }
    }

    /// Message for the denial screen.
    pub fn user_message(&self) -> String {
        match self.kind {
            DenialKind::NotAuthenticated => "Sign in to continue.".to_string(),
            DenialKind::NonAuthoritativeContext => format!(
                "Your employee profile could not be loaded, so '{}' is unavailable. \
                 Ask HR to link your account or try again later.",
                self.module
            ),
            DenialKind::MissingPermission => format!(
                "Your role does not allow you to {} in '{}'. Ask an administrator for access.",
                self.action, self.module
            ),
        }
    }
}

/// Gate a view or operation.
///
/// - No IO
/// - No panics
/// - Global admins pass unconditionally; everyone else needs the action flag
///   in their resolved permissions (explicit module entry, else wildcard).
pub fn authorize(ctx: &AuthorizationContext, module: &ModuleKey, action: Action) -> Result<(), AccessDenied> {
    if ctx.allows(module, action) {
        return Ok(());
    }

    let kind = match ctx.source() {
        ContextSource::Fallback => DenialKind::NonAuthoritativeContext,
        ContextSource::Directory => DenialKind::MissingPermission,
    };
    tracing::debug!(%module, %action, ?kind, "access denied");

    Err(AccessDenied {
        module: module.clone(),
        action,
        kind,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub module: ModuleKey,
    pub action: Action,
    pub granted: bool,

    /// Human-readable reason for the decision.
    pub reason: String,

    pub role: Option<String>,
    pub is_global_admin: bool,
    pub override_rule: Option<String>,

    /// The grant that applied to the module (explicit entry or wildcard).
    pub effective_grant: ModuleGrant,
    pub via_wildcard: bool,
    pub scope: Scope,

    /// If denied, this explains what was missing.
    pub denial: Option<DenialReason>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

/// Explain why [`authorize`] allows or denies `(module, action)`.
pub fn explain_authorization(
    ctx: &AuthorizationContext,
    module: &ModuleKey,
    action: Action,
) -> AuthorizationExplanation {
    let permissions = ctx.permissions();
    let explicit = permissions.iter().any(|(key, _)| key == module);
    let effective_grant = permissions.grant_for(module);
    let via_wildcard = !explicit && permissions.wildcard().is_some();
    let role = ctx.role_name().map(|r| r.as_str().to_string());

    let decision = authorize(ctx, module, action);
    let granted = decision.is_ok();

    let reason = if ctx.is_global_admin() {
        format!(
            "Global administrator via exception rule '{}'",
            ctx.override_rule().unwrap_or("unknown")
        )
    } else if ctx.source() == ContextSource::Fallback {
        "Employee profile could not be resolved; access is restricted until it is".to_string()
    } else if granted && via_wildcard {
        format!("Role grants '{action}' on every module through the wildcard entry")
    } else if granted {
        format!("Role grants '{action}' on module '{module}'")
    } else if explicit {
        format!("Role has an entry for '{module}' but it does not include '{action}'")
    } else if via_wildcard {
        format!("Role's wildcard entry does not include '{action}'")
    } else {
        format!("Role has no entry for '{module}' and no wildcard entry")
    };

    let denial = decision.err().map(|denied| {
        let mut suggestions = Vec::new();
        match denied.kind {
            DenialKind::NotAuthenticated => suggestions.push("Sign in again".to_string()),
            DenialKind::NonAuthoritativeContext => {
                suggestions.push("Check that an employee profile exists for this email".to_string());
                suggestions.push("Retry once the directory is reachable".to_string());
            }
            DenialKind::MissingPermission => {
                let role = role.as_deref().unwrap_or("(no role)");
                suggestions.push(format!(
                    "Add a '{module}' permission row with can_{action} for role '{role}'"
                ));
                suggestions.push(format!("Or grant '{action}' on the '*' entry for role '{role}'"));
            }
        }
        DenialReason {
            kind: denied.kind,
            message: denied.user_message(),
            suggestions,
        }
    });

    AuthorizationExplanation {
        module: module.clone(),
        action,
        granted,
        reason,
        role,
        is_global_admin: ctx.is_global_admin(),
        override_rule: ctx.override_rule().map(str::to_string),
        effective_grant,
        via_wildcard,
        scope: ctx.scope().clone(),
        denial,
    }
}
