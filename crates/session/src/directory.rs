//! Collaborators the session manager reads from.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use hrgate_auth::{EmployeeProfile, ModulePermissionRow, RoleName, RoleRecord};
use hrgate_core::RoleId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// Transport failure or non-success response.
    #[error("directory unavailable: {0}")]
    Unavailable(String),

    /// The directory answered with data that could not be decoded.
    #[error("malformed directory response: {0}")]
    Malformed(String),
}

/// Directory queries against the remote data store.
///
/// Implementations must not cache across calls; the session manager decides
/// when to re-fetch.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Employee profile linked to `email` (already lower-cased).
    async fn profile_by_email(&self, email: &str) -> Result<Option<EmployeeProfile>, DirectoryError>;

    async fn role_by_id(&self, id: RoleId) -> Result<Option<RoleRecord>, DirectoryError>;

    /// Permission rows of a role. No rows is a valid answer.
    async fn permissions_for_role(&self, role: &RoleName) -> Result<Vec<ModulePermissionRow>, DirectoryError>;
}

/// Side effects on the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// End the provider session (forced sign-out).
    async fn sign_out(&self) -> Result<(), DirectoryError>;
}

#[async_trait]
impl<D> Directory for Arc<D>
where
    D: Directory + ?Sized,
{
    async fn profile_by_email(&self, email: &str) -> Result<Option<EmployeeProfile>, DirectoryError> {
        (**self).profile_by_email(email).await
    }

    async fn role_by_id(&self, id: RoleId) -> Result<Option<RoleRecord>, DirectoryError> {
        (**self).role_by_id(id).await
    }

    async fn permissions_for_role(&self, role: &RoleName) -> Result<Vec<ModulePermissionRow>, DirectoryError> {
        (**self).permissions_for_role(role).await
    }
}

#[async_trait]
impl<P> IdentityProvider for Arc<P>
where
    P: IdentityProvider + ?Sized,
{
    async fn sign_out(&self) -> Result<(), DirectoryError> {
        (**self).sign_out().await
    }
}
