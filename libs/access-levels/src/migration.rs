//! `sea-orm-migration` step creating the grants table of a rule.
//!
//! ```ignore
//! impl MigratorTrait for Migrator {
//!     fn migrations() -> Vec<Box<dyn MigrationTrait>> {
//!         vec![
//!             Box::new(m001_create_posts::Migration),
//!             Box::new(AccessLevelMigration::new(posts_rule())),
//!         ]
//!     }
//! }
//! ```
//!
//! The migration must run after the user and resource tables exist, since
//! the grants table references both.

use sea_orm_migration::prelude::{DbErr, MigrationName, MigrationTrait, SchemaManager};

use crate::error::AccessLevelError;
use crate::key::AccessKey;
use crate::rule::AccessLevelRule;

pub struct AccessLevelMigration<U, R> {
    rule: AccessLevelRule<U, R>,
    name: String,
}

impl<U: AccessKey, R: AccessKey> AccessLevelMigration<U, R> {
    /// Migration named `m_create_{grants table}`.
    #[must_use]
    pub fn new(rule: AccessLevelRule<U, R>) -> Self {
        let name = format!("m_create_{}", rule.table_name());
        Self { rule, name }
    }

    /// Use an explicit name, e.g. to keep the migrator's ordering convention.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<U, R> MigrationName for AccessLevelMigration<U, R> {
    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait::async_trait]
impl<U: AccessKey, R: AccessKey> MigrationTrait for AccessLevelMigration<U, R> {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.rule
            .create(manager.get_connection())
            .await
            .map_err(into_db_err)
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.rule
            .drop_if_exists(manager.get_connection())
            .await
            .map_err(into_db_err)
    }
}

/// Engine errors pass through unchanged; anything else becomes a migration error.
fn into_db_err(err: AccessLevelError) -> DbErr {
    match err {
        AccessLevelError::Db(e) => e,
        other => DbErr::Migration(other.to_string()),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::config::AccessLevelRuleConfig;

    #[test]
    fn engine_errors_are_not_rewrapped() {
        let err = into_db_err(AccessLevelError::Db(DbErr::RecordNotInserted));
        assert!(matches!(err, DbErr::RecordNotInserted), "got {err:?}");

        let err = into_db_err(AccessLevelError::Invalid("bad"));
        assert!(matches!(err, DbErr::Migration(ref m) if m.contains("bad")), "got {err:?}");
    }

    #[test]
    fn name_derives_from_grants_table() {
        let rule = AccessLevelRule::<i32, i32>::new(AccessLevelRuleConfig::new(
            "users", "posts", "owner_id", 2,
        ))
        .unwrap();
        let migration = AccessLevelMigration::new(rule);
        assert_eq!(migration.name(), "m_create_posts_access_levels");
        assert_eq!(
            migration.with_name("m20240101_000002_posts_acl").name(),
            "m20240101_000002_posts_acl"
        );
    }
}
