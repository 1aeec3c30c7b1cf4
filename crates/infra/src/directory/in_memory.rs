use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use hrgate_auth::{EmployeeProfile, ModulePermissionRow, RoleName, RoleRecord};
use hrgate_core::RoleId;
use hrgate_events::{AuthEvent, EventBus, InMemoryEventBus};
use hrgate_session::{Directory, DirectoryError, IdentityProvider};

use crate::ConfigError;

/// Directory contents as stored in a fixture file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryFixture {
    #[serde(default)]
    pub profiles: Vec<EmployeeProfile>,
    #[serde(default)]
    pub roles: Vec<RoleRecord>,
    #[serde(default)]
    pub permissions: Vec<ModulePermissionRow>,
}

/// Number of queries served, per query kind.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct DirectoryCalls {
    pub profiles: usize,
    pub roles: usize,
    pub permissions: usize,
}

impl DirectoryCalls {
    pub fn total(&self) -> usize {
        self.profiles + self.roles + self.permissions
    }
}

/// In-memory directory for tests and local runs.
///
/// Counts every query and can be switched into a failing mode to simulate an
/// unreachable data store.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    data: RwLock<DirectoryFixture>,
    unavailable: AtomicBool,
    profile_calls: AtomicUsize,
    role_calls: AtomicUsize,
    permission_calls: AtomicUsize,
}

impl InMemoryDirectory {
    pub fn new(fixture: DirectoryFixture) -> Self {
        Self {
            data: RwLock::new(fixture),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json).map(Self::new)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let directory = Self::from_json(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded directory fixture");
        Ok(directory)
    }

    /// Insert or replace the profile with the same email.
    pub fn upsert_profile(&self, profile: EmployeeProfile) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.profiles.retain(|p| !p.email.eq_ignore_ascii_case(&profile.email));
        data.profiles.push(profile);
    }

    /// Insert or replace the role with the same id.
    pub fn upsert_role(&self, role: RoleRecord) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.roles.retain(|r| r.id != role.id);
        data.roles.push(role);
    }

    /// Replace every permission row of `role`.
    pub fn set_permissions(&self, role: &RoleName, rows: Vec<ModulePermissionRow>) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.permissions.retain(|row| &row.role_name != role);
        data.permissions.extend(rows);
    }

    /// Make every subsequent query fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn calls(&self) -> DirectoryCalls {
        DirectoryCalls {
            profiles: self.profile_calls.load(Ordering::SeqCst),
            roles: self.role_calls.load(Ordering::SeqCst),
            permissions: self.permission_calls.load(Ordering::SeqCst),
        }
    }

    fn check_available(&self) -> Result<(), DirectoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(DirectoryError::Unavailable("in-memory directory is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn profile_by_email(&self, email: &str) -> Result<Option<EmployeeProfile>, DirectoryError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        let email = email.trim();
        Ok(data
            .profiles
            .iter()
            .find(|p| p.email.trim().eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn role_by_id(&self, id: RoleId) -> Result<Option<RoleRecord>, DirectoryError> {
        self.role_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        Ok(data.roles.iter().find(|r| r.id == id).cloned())
    }

    async fn permissions_for_role(&self, role: &RoleName) -> Result<Vec<ModulePermissionRow>, DirectoryError> {
        self.permission_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        Ok(data
            .permissions
            .iter()
            .filter(|row| &row.role_name == role)
            .cloned()
            .collect())
    }
}

/// Identity provider stand-in. A sign-out is counted and, when a bus is
/// attached, announced as `SIGNED_OUT` the way the hosted provider does.
#[derive(Debug, Default)]
pub struct InMemoryIdentityProvider {
    bus: Option<Arc<InMemoryEventBus<AuthEvent>>>,
    sign_outs: AtomicUsize,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bus(bus: Arc<InMemoryEventBus<AuthEvent>>) -> Self {
        Self {
            bus: Some(bus),
            sign_outs: AtomicUsize::new(0),
        }
    }

    pub fn sign_outs(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn sign_out(&self) -> Result<(), DirectoryError> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        if let Some(bus) = &self.bus {
            bus.publish(AuthEvent::signed_out())
                .map_err(|e| DirectoryError::Unavailable(format!("event bus: {e:?}")))?;
        }
        Ok(())
    }
}
