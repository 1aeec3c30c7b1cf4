use std::borrow::Cow;
use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application module identifier.
///
/// Module keys are opaque lower-case strings (e.g. `"vacations"`). The
/// wildcard key `"*"` applies to every module without a more specific entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct ModuleKey(Cow<'static, str>);

impl ModuleKey {
    pub const WILDCARD: ModuleKey = ModuleKey(Cow::Borrowed("*"));
    pub const DASHBOARD: ModuleKey = ModuleKey(Cow::Borrowed("dashboard"));
    pub const EMPLOYEES: ModuleKey = ModuleKey(Cow::Borrowed("employees"));
    pub const ATTENDANCE: ModuleKey = ModuleKey(Cow::Borrowed("attendance"));
    pub const VACATIONS: ModuleKey = ModuleKey(Cow::Borrowed("vacations"));
    pub const REQUESTS: ModuleKey = ModuleKey(Cow::Borrowed("requests"));
    pub const DOCUMENTS: ModuleKey = ModuleKey(Cow::Borrowed("documents"));
    pub const REPORTS: ModuleKey = ModuleKey(Cow::Borrowed("reports"));
    pub const IMPORTS: ModuleKey = ModuleKey(Cow::Borrowed("imports"));
    pub const USERS: ModuleKey = ModuleKey(Cow::Borrowed("users"));
    pub const SETTINGS: ModuleKey = ModuleKey(Cow::Borrowed("settings"));

    /// Every module the application gates.
    pub const ALL: [ModuleKey; 10] = [
        Self::DASHBOARD,
        Self::EMPLOYEES,
        Self::ATTENDANCE,
        Self::VACATIONS,
        Self::REQUESTS,
        Self::DOCUMENTS,
        Self::REPORTS,
        Self::IMPORTS,
        Self::USERS,
        Self::SETTINGS,
    ];

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        let name = name.into();
        if name.trim() == name && !name.chars().any(char::is_uppercase) {
            Self(name)
        } else {
            Self(Cow::Owned(name.trim().to_lowercase()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl From<String> for ModuleKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&'static str> for ModuleKey {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl core::fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operation attempted on a module.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Write,
    Delete,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Read, Action::Write, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
            Action::Delete => "delete",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown action '{0}' (expected read, write or delete)")]
pub struct UnknownAction(String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "read" => Ok(Action::Read),
            "write" => Ok(Action::Write),
            "delete" => Ok(Action::Delete),
            _ => Err(UnknownAction(s.to_string())),
        }
    }
}

/// Read/write/delete flags for one module.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ModuleGrant {
    pub read: bool,
    pub write: bool,
    pub delete: bool,
}

impl ModuleGrant {
    pub const NONE: ModuleGrant = ModuleGrant {
        read: false,
        write: false,
        delete: false,
    };

    pub const FULL: ModuleGrant = ModuleGrant {
        read: true,
        write: true,
        delete: true,
    };

    pub const READ_WRITE: ModuleGrant = ModuleGrant {
        read: true,
        write: true,
        delete: false,
    };

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::Read => self.read,
            Action::Write => self.write,
            Action::Delete => self.delete,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }

    /// Union of two grants.
    pub fn merge(self, other: ModuleGrant) -> ModuleGrant {
        ModuleGrant {
            read: self.read || other.read,
            write: self.write || other.write,
            delete: self.delete || other.delete,
        }
    }
}

/// Normalized per-module grants of one context.
///
/// Built once when a context is resolved: explicit module entries plus an
/// optional wildcard entry. Lookups never re-run role defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModulePermissions(BTreeMap<ModuleKey, ModuleGrant>);

impl ModulePermissions {
    /// No module readable.
    pub fn none() -> Self {
        Self::default()
    }

    /// Everything allowed through the wildcard entry.
    pub fn full() -> Self {
        let mut permissions = Self::none();
        permissions.insert(ModuleKey::WILDCARD, ModuleGrant::FULL);
        permissions
    }

    pub fn insert(&mut self, module: ModuleKey, grant: ModuleGrant) {
        self.0.insert(module, grant);
    }

    /// Explicit entry, else wildcard entry, else nothing.
    pub fn grant_for(&self, module: &ModuleKey) -> ModuleGrant {
        self.0
            .get(module)
            .or_else(|| self.0.get(&ModuleKey::WILDCARD))
            .copied()
            .unwrap_or(ModuleGrant::NONE)
    }

    pub fn allows(&self, module: &ModuleKey, action: Action) -> bool {
        self.grant_for(module).allows(action)
    }

    pub fn wildcard(&self) -> Option<ModuleGrant> {
        self.0.get(&ModuleKey::WILDCARD).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModuleKey, &ModuleGrant)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(ModuleGrant::is_empty)
    }
}
