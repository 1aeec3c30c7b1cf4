//! Directory client for the hosted data store's REST interface.
//!
//! Tables are queried with `column=op.value` filters and authenticated with
//! the project API key (plus the signed-in user's access token when one is
//! set, so row-level security applies). Emails and role names are typed by
//! people, so both are matched case-insensitively with `ilike`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use hrgate_auth::{EmployeeProfile, ModulePermissionRow, RoleName, RoleRecord};
use hrgate_core::RoleId;
use hrgate_session::{Directory, DirectoryError};

use crate::{ConfigError, DirectoryConfig};

const PROFILES_TABLE: &str = "employees";
const ROLES_TABLE: &str = "roles";
const PERMISSIONS_TABLE: &str = "role_module_permissions";

#[derive(Debug, Clone)]
pub struct RestDirectory {
    client: Client,
    config: DirectoryConfig,
    access_token: Option<String>,
}

impl RestDirectory {
    pub fn new(config: DirectoryConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(ConfigError::HttpClient)?;
        Ok(Self {
            client,
            config,
            access_token: None,
        })
    }

    /// Query as the signed-in user rather than with the bare API key.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.base_url, table)
    }

    fn authorize(&self, mut req: RequestBuilder) -> RequestBuilder {
        if let Some(key) = &self.config.api_key {
            req = req.header("apikey", key);
        }
        match self.access_token.as_ref().or(self.config.api_key.as_ref()) {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn query(&self, table: &str, filters: &[(&str, String)]) -> RequestBuilder {
        let req = self
            .client
            .get(self.table_url(table))
            .query(&[("select", "*")])
            .query(filters)
            .header("Accept", "application/json");
        self.authorize(req)
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, filters: &[(&str, String)]) -> Result<Vec<T>, DirectoryError> {
        let resp = self
            .query(table, filters)
            .send()
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(table, status = status.as_u16(), "directory query rejected");
            return Err(match status {
                StatusCode::BAD_REQUEST => DirectoryError::Malformed(body),
                _ => DirectoryError::Unavailable(format!("{status}: {body}")),
            });
        }

        resp.json::<Vec<T>>()
            .await
            .map_err(|e| DirectoryError::Malformed(e.to_string()))
    }
}

fn eq(value: impl core::fmt::Display) -> String {
    format!("eq.{value}")
}

/// Case-insensitive exact match. `%` and `_` would otherwise act as wildcards.
fn ilike(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 6);
    pattern.push_str("ilike.");
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern
}

fn profile_filters(email: &str) -> [(&'static str, String); 2] {
    [("email", ilike(email.trim())), ("limit", "1".to_string())]
}

fn permission_filters(role: &RoleName) -> [(&'static str, String); 1] {
    [("role_name", ilike(role.as_str()))]
}

#[async_trait]
impl Directory for RestDirectory {
    async fn profile_by_email(&self, email: &str) -> Result<Option<EmployeeProfile>, DirectoryError> {
        let rows: Vec<EmployeeProfile> = self
            .select(PROFILES_TABLE, &profile_filters(email))
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn role_by_id(&self, id: RoleId) -> Result<Option<RoleRecord>, DirectoryError> {
        let rows: Vec<RoleRecord> = self
            .select(ROLES_TABLE, &[("id", eq(id)), ("limit", "1".to_string())])
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Rows stored under a spelling that differs beyond case (accents,
    /// spacing) are found by scanning the table on the normalized name.
    async fn permissions_for_role(&self, role: &RoleName) -> Result<Vec<ModulePermissionRow>, DirectoryError> {
        let rows: Vec<ModulePermissionRow> = self.select(PERMISSIONS_TABLE, &permission_filters(role)).await?;
        if !rows.is_empty() {
            return Ok(rows);
        }

        tracing::debug!(%role, "no rows under the role's spelling; scanning permission table");
        let all: Vec<ModulePermissionRow> = self.select(PERMISSIONS_TABLE, &[]).await?;
        Ok(all.into_iter().filter(|row| &row.role_name == role).collect())
    }
}
