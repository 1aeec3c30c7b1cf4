//! Directory records consumed by the authorization engine.

use serde::{Deserialize, Serialize};

use hrgate_core::{EmployeeId, RoleId};

use crate::{ModuleGrant, ModuleKey, RoleName};

/// Internal directory record of an employee, linked to an identity by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeProfile {
    pub id: EmployeeId,
    pub full_name: String,
    pub email: String,
    /// Position title as typed by HR (free text).
    #[serde(default)]
    pub position: String,
    /// Work location ("sede").
    #[serde(default, alias = "sede")]
    pub location: String,
    #[serde(default)]
    pub business_unit: String,
    #[serde(default)]
    pub role_id: Option<RoleId>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Role record.
///
/// `web_access = false` means the identity must not hold a web session at
/// all, whatever else the role grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub id: RoleId,
    pub name: RoleName,
    #[serde(default = "default_true")]
    pub web_access: bool,
}

/// One row of the role→module permission table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulePermissionRow {
    pub role_name: RoleName,
    pub module_key: ModuleKey,
    #[serde(default)]
    pub can_read: bool,
    #[serde(default)]
    pub can_write: bool,
    #[serde(default)]
    pub can_delete: bool,
}

impl ModulePermissionRow {
    pub fn new(role_name: impl Into<RoleName>, module_key: impl Into<ModuleKey>, grant: ModuleGrant) -> Self {
        Self {
            role_name: role_name.into(),
            module_key: module_key.into(),
            can_read: grant.read,
            can_write: grant.write,
            can_delete: grant.delete,
        }
    }

    pub fn grant(&self) -> ModuleGrant {
        ModuleGrant {
            read: self.can_read,
            write: self.can_write,
            delete: self.can_delete,
        }
    }
}
