//! Policy and directory configuration.
//!
//! Every policy section is optional; an absent section keeps the built-in
//! default. A policy file looks like:
//!
//! ```json
//! {
//!   "admin_roles": ["ADMIN", "SUPER ADMIN", "GERENTE GENERAL"],
//!   "position_areas": { "Analista de Nóminas": null, "Jefe de Planta": "OPERACIONES" },
//!   "exception_rules": { "version": 2, "rules": [] }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use hrgate_auth::{
    AreaScopeResolver, AuthorizationPolicy, ExceptionOverrideEngine, ExceptionRule, ExceptionRuleSet,
    PositionAreaTable, Predicate,
};

pub const POLICY_PATH_ENV: &str = "HRGATE_POLICY_PATH";
pub const DIRECTORY_URL_ENV: &str = "HRGATE_DIRECTORY_URL";
pub const DIRECTORY_KEY_ENV: &str = "HRGATE_DIRECTORY_KEY";
pub const DIRECTORY_TIMEOUT_ENV: &str = "HRGATE_DIRECTORY_TIMEOUT_SECS";

/// Upper bound on a single directory request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Id of the built-in rule that `admin_roles` rewrites.
pub const ADMIN_RULE_ID: &str = "system-administrators";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid directory url '{0}': expected http:// or https://")]
    InvalidUrl(String),

    #[error("invalid directory timeout '{0}': expected a positive number of seconds")]
    InvalidTimeout(String),

    #[error("failed to build directory client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Authorization policy tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    #[serde(default)]
    pub exception_rules: Option<ExceptionRuleSet>,
    #[serde(default)]
    pub position_areas: Option<PositionAreaTable>,
    /// Role names granted global administration.
    #[serde(default)]
    pub admin_roles: Option<Vec<String>>,
}

impl PolicyConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "loaded policy configuration");
        Ok(config)
    }

    /// Load from `HRGATE_POLICY_PATH`, or the built-in defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(POLICY_PATH_ENV) {
            Some(path) if !path.is_empty() => Self::load(PathBuf::from(path)),
            _ => Ok(Self::default()),
        }
    }

    /// Effective exception table: the configured (or built-in) rules with the
    /// administrator rule rewritten to `admin_roles` when that is set.
    pub fn rule_set(&self) -> ExceptionRuleSet {
        let mut rules = self.exception_rules.clone().unwrap_or_default();

        if let Some(roles) = &self.admin_roles {
            let when = Predicate::RoleIs(roles.clone());
            match rules.rules.iter_mut().find(|rule| rule.id == ADMIN_RULE_ID) {
                Some(rule) => rule.when = when,
                None => rules.rules.insert(
                    0,
                    ExceptionRule {
                        id: ADMIN_RULE_ID.to_string(),
                        description: Some("Platform administrators".to_string()),
                        when,
                    },
                ),
            }
        }

        rules
    }

    pub fn into_policy(self) -> AuthorizationPolicy {
        let rules = self.rule_set();
        let areas = match self.position_areas {
            Some(table) => AreaScopeResolver::with_table(table),
            None => AreaScopeResolver::new(),
        };
        AuthorizationPolicy::new(ExceptionOverrideEngine::new(rules), areas)
    }
}

/// Connection settings for [`crate::RestDirectory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryConfig {
    /// Base URL without trailing slash.
    pub base_url: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
}

impl DirectoryConfig {
    pub fn new(base_url: impl AsRef<str>, api_key: Option<String>) -> Result<Self, ConfigError> {
        let trimmed = base_url.as_ref().trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(base_url.as_ref().to_string()));
        }
        Ok(Self {
            base_url: trimmed.to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Settings from `HRGATE_DIRECTORY_URL`, `HRGATE_DIRECTORY_KEY` and
    /// `HRGATE_DIRECTORY_TIMEOUT_SECS`. `None` when no URL is configured.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let url = match std::env::var(DIRECTORY_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => url,
            _ => return Ok(None),
        };
        let mut config = Self::new(url, std::env::var(DIRECTORY_KEY_ENV).ok())?;
        if let Ok(raw) = std::env::var(DIRECTORY_TIMEOUT_ENV) {
            config.request_timeout = parse_timeout(&raw)?;
        }
        Ok(Some(config))
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout(raw.to_string())),
    }
}
