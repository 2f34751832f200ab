//! Configuration of an access-level rule.

use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::AccessLevelError;
use crate::key::KeyDataType;

/// Describes the user table, the guarded resource table and how ownership is recorded.
///
/// Immutable once the rule is built from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessLevelRuleConfig {
    pub user_table: String,

    #[serde(default = "default_key_column")]
    pub user_key_column: String,

    #[serde(default)]
    pub user_key_data_type: KeyDataType,

    pub resource_table: String,

    #[serde(default = "default_key_column")]
    pub resource_key_column: String,

    #[serde(default)]
    pub resource_key_data_type: KeyDataType,

    /// Column of the resource table holding the owning user's key.
    pub resource_owner_column: String,

    /// Level implicitly held by the owner of a resource, usually the highest level in use.
    pub owner_access_level: i32,
}

fn default_key_column() -> String {
    "id".to_owned()
}

impl AccessLevelRuleConfig {
    /// Config with `id` integer keys on both tables.
    #[must_use]
    pub fn new(
        user_table: impl Into<String>,
        resource_table: impl Into<String>,
        resource_owner_column: impl Into<String>,
        owner_access_level: i32,
    ) -> Self {
        Self {
            user_table: user_table.into(),
            user_key_column: default_key_column(),
            user_key_data_type: KeyDataType::default(),
            resource_table: resource_table.into(),
            resource_key_column: default_key_column(),
            resource_key_data_type: KeyDataType::default(),
            resource_owner_column: resource_owner_column.into(),
            owner_access_level,
        }
    }

    #[must_use]
    pub fn with_user_key(mut self, column: impl Into<String>, data_type: KeyDataType) -> Self {
        self.user_key_column = column.into();
        self.user_key_data_type = data_type;
        self
    }

    #[must_use]
    pub fn with_resource_key(mut self, column: impl Into<String>, data_type: KeyDataType) -> Self {
        self.resource_key_column = column.into();
        self.resource_key_data_type = data_type;
        self
    }

    /// Extract the config from a figment (YAML file, environment, ...).
    ///
    /// # Errors
    /// Returns `AccessLevelError::Config` if extraction fails or the result is invalid.
    pub fn from_figment(figment: &Figment) -> Result<Self, AccessLevelError> {
        let cfg: Self = figment.extract()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    /// Returns `AccessLevelError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<(), AccessLevelError> {
        let idents = [
            ("user_table", &self.user_table),
            ("user_key_column", &self.user_key_column),
            ("resource_table", &self.resource_table),
            ("resource_key_column", &self.resource_key_column),
            ("resource_owner_column", &self.resource_owner_column),
        ];
        if let Some((field, _)) = idents.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(AccessLevelError::Config(format!("{field} must not be empty")));
        }
        if self.owner_access_level <= 0 {
            return Err(AccessLevelError::Config(format!(
                "owner_access_level must be positive, got {}",
                self.owner_access_level
            )));
        }
        Ok(())
    }

    /// Name of the grants table: `{resource_table}_access_levels`.
    #[must_use]
    pub fn grants_table_name(&self) -> String {
        format!("{}_access_levels", self.resource_table)
    }
}
