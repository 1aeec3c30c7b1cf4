use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::text::normalize;

/// Role name used for permission lookups.
///
/// Role names come from the directory as free text, so they are stored in
/// normalized form: `"Super Admin"` and `"SUPER ADMIN"` are the same role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct RoleName(Cow<'static, str>);

impl RoleName {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        let name = name.into();
        let normalized = normalize(&name);
        if normalized == name {
            Self(name)
        } else {
            Self(Cow::Owned(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for RoleName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&'static str> for RoleName {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl core::fmt::Display for RoleName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
