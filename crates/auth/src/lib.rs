//! `hrgate-auth`: authorization and data-scoping engine (pure, no IO).
//!
//! Resolves what an employee may do (module permissions) and which
//! organizational records they may see (scope).

pub mod area;
pub mod authorize;
pub mod context;
pub mod filter;
pub mod matrix;
pub mod overrides;
pub mod permissions;
pub mod policy;
pub mod profile;
pub mod records;
pub mod roles;
pub mod text;

pub use area::{AreaAssignment, AreaScopeResolver, CanonicalArea, PositionAreaTable};
pub use authorize::{AccessDenied, AuthorizationExplanation, DenialKind, authorize, explain_authorization};
pub use context::{AuthorizationContext, ContextSource, Scope};
pub use filter::RecordFilter;
pub use matrix::PermissionMatrix;
pub use overrides::{ExceptionOverrideEngine, ExceptionRule, ExceptionRuleSet, OverrideMatch, Predicate};
pub use permissions::{Action, ModuleGrant, ModuleKey, ModulePermissions};
pub use policy::AuthorizationPolicy;
pub use profile::{EmployeeProfile, ModulePermissionRow, RoleRecord};
pub use records::{AttendanceRecord, EmployeeRecord, Placement, RequestRecord, ScopedRecord};
pub use roles::RoleName;
