//! Role→module permission matrix.

use std::collections::{BTreeMap, HashMap};

use crate::text::{contains_any, normalize};
use crate::{Action, ModuleGrant, ModuleKey, ModulePermissionRow, ModulePermissions, RoleName};

/// Keywords in a role or position denoting supervisory or analyst standing.
pub const SUPERVISORY_KEYWORDS: &[&str] = &["ANALISTA", "JEFE", "GERENTE", "COORDINADOR"];

/// Modules granted to supervisory staff when the table says nothing about them.
pub const SUPERVISORY_DEFAULT_MODULES: [ModuleKey; 2] = [ModuleKey::VACATIONS, ModuleKey::DASHBOARD];

/// Grant applied to [`SUPERVISORY_DEFAULT_MODULES`].
pub const SUPERVISORY_DEFAULT_GRANT: ModuleGrant = ModuleGrant::READ_WRITE;

/// Whether the role name or position title contains a supervisory/analyst
/// keyword, as a whole word or inside one (`SUBGERENTE`, `COJEFE`).
pub fn is_supervisory(role: Option<&RoleName>, position: Option<&str>) -> bool {
    let role_hit = role.is_some_and(|r| contains_any(r.as_str(), SUPERVISORY_KEYWORDS));
    let position_hit = position.is_some_and(|p| contains_any(&normalize(p), SUPERVISORY_KEYWORDS));
    role_hit || position_hit
}

/// Loaded permission table, keyed by role.
///
/// Resolution for `(role, module, action)`, first match wins:
/// 1. explicit `(role, module)` entry
/// 2. wildcard `(role, "*")` entry
/// 3. supervisory default for `vacations`/`dashboard`
/// 4. deny
///
/// Pure lookup: no IO once the rows are loaded.
#[derive(Debug, Clone, Default)]
pub struct PermissionMatrix {
    entries: HashMap<RoleName, BTreeMap<ModuleKey, ModuleGrant>>,
}

impl PermissionMatrix {
    /// Build from directory rows. Duplicate `(role, module)` rows are merged
    /// so row order never changes the outcome.
    pub fn from_rows(rows: impl IntoIterator<Item = ModulePermissionRow>) -> Self {
        let mut entries: HashMap<RoleName, BTreeMap<ModuleKey, ModuleGrant>> = HashMap::new();
        for row in rows {
            let grant = row.grant();
            entries
                .entry(row.role_name)
                .or_default()
                .entry(row.module_key)
                .and_modify(|existing| *existing = existing.merge(grant))
                .or_insert(grant);
        }
        Self { entries }
    }

    /// Resolve without position information.
    pub fn resolve(&self, role: &RoleName, module: &ModuleKey, action: Action) -> bool {
        self.grant_for(Some(role), None, module).allows(action)
    }

    /// Resolve with the holder's position title, which can unlock the
    /// supervisory defaults.
    pub fn resolve_for(
        &self,
        role: Option<&RoleName>,
        position: Option<&str>,
        module: &ModuleKey,
        action: Action,
    ) -> bool {
        self.grant_for(role, position, module).allows(action)
    }

    pub fn grant_for(&self, role: Option<&RoleName>, position: Option<&str>, module: &ModuleKey) -> ModuleGrant {
        let entries = role.and_then(|r| self.entries.get(r));

        if let Some(grant) = entries.and_then(|e| e.get(module)) {
            return *grant;
        }
        if let Some(grant) = entries.and_then(|e| e.get(&ModuleKey::WILDCARD)) {
            return *grant;
        }
        if SUPERVISORY_DEFAULT_MODULES.contains(module) && is_supervisory(role, position) {
            return SUPERVISORY_DEFAULT_GRANT;
        }
        ModuleGrant::NONE
    }

    /// Normalize the matrix for one holder into a per-module map.
    ///
    /// The result answers every lookup exactly as [`grant_for`](Self::grant_for)
    /// would, without needing the role defaults at read time.
    pub fn permissions_for(&self, role: Option<&RoleName>, position: Option<&str>) -> ModulePermissions {
        let mut permissions = ModulePermissions::none();
        let entries = role.and_then(|r| self.entries.get(r));

        if let Some(entries) = entries {
            for (module, grant) in entries {
                permissions.insert(module.clone(), *grant);
            }
        }

        if permissions.wildcard().is_none() && is_supervisory(role, position) {
            for module in SUPERVISORY_DEFAULT_MODULES {
                if !entries.is_some_and(|e| e.contains_key(&module)) {
                    permissions.insert(module, SUPERVISORY_DEFAULT_GRANT);
                }
            }
        }

        permissions
    }
}
