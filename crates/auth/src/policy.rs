//! Composition of the exception engine, the permission matrix and area
//! scoping into one [`AuthorizationContext`].

use std::sync::Arc;

use crate::matrix::is_supervisory;
use crate::text::non_blank;
use crate::{
    AreaScopeResolver, AuthorizationContext, EmployeeProfile, ExceptionOverrideEngine, OverrideMatch,
    PermissionMatrix, RecordFilter, RoleName, Scope,
};

/// The fixed resolution policy of the application.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationPolicy {
    overrides: ExceptionOverrideEngine,
    areas: Arc<AreaScopeResolver>,
}

impl AuthorizationPolicy {
    pub fn new(overrides: ExceptionOverrideEngine, areas: AreaScopeResolver) -> Self {
        Self {
            overrides,
            areas: Arc::new(areas),
        }
    }

    pub fn overrides(&self) -> &ExceptionOverrideEngine {
        &self.overrides
    }

    pub fn areas(&self) -> &AreaScopeResolver {
        &self.areas
    }

    /// Filter sharing this policy's area resolution.
    pub fn record_filter(&self) -> RecordFilter {
        RecordFilter::new(Arc::clone(&self.areas))
    }

    pub fn exception_override(&self, profile: &EmployeeProfile, role: Option<&RoleName>) -> Option<OverrideMatch> {
        self.overrides.resolve(profile, role)
    }

    /// Scope of a holder without an exception grant.
    ///
    /// Supervisory staff (analyst, head, manager, coordinator) with a
    /// resolvable area see that area across locations. Everyone else, HR
    /// included, sees their own location (and unit, when set).
    pub fn scope_for(&self, profile: &EmployeeProfile, role: Option<&RoleName>) -> Scope {
        if is_supervisory(role, Some(&profile.position)) {
            if let Some(area) = self.areas.resolve(&profile.position, &profile.business_unit) {
                return Scope::AreaRestricted { area };
            }
        }

        Scope::LocationRestricted {
            location: non_blank(Some(&profile.location)),
            business_unit: non_blank(Some(&profile.business_unit)),
        }
    }

    /// Context for a holder known to have no exception grant.
    pub fn scoped_context(
        &self,
        profile: &EmployeeProfile,
        role: Option<&RoleName>,
        matrix: &PermissionMatrix,
    ) -> AuthorizationContext {
        let permissions = matrix.permissions_for(role, Some(&profile.position));
        let scope = self.scope_for(profile, role);
        AuthorizationContext::scoped(role.cloned(), profile.full_name.clone(), permissions, scope)
    }

    /// Full resolution: exception rules first, then the permission matrix.
    pub fn resolve(
        &self,
        profile: &EmployeeProfile,
        role: Option<&RoleName>,
        matrix: &PermissionMatrix,
    ) -> AuthorizationContext {
        match self.exception_override(profile, role) {
            Some(hit) => AuthorizationContext::global_admin(role.cloned(), profile.full_name.clone(), hit.rule_id),
            None => self.scoped_context(profile, role, matrix),
        }
    }
}
