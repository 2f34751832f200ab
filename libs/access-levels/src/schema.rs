//! DDL for the grants table.
//!
//! The grants table of a resource table `T` is `T_access_levels`:
//!
//! | column        | type                       | constraint                                   |
//! |---------------|----------------------------|----------------------------------------------|
//! | `userKey`     | user key data type         | FK -> user table key, `ON DELETE CASCADE`     |
//! | `resourceKey` | resource key data type     | FK -> `T` key, `ON DELETE CASCADE`            |
//! | `accessLevel` | integer                    | indexed                                      |
//!
//! plus a unique constraint on (`userKey`, `resourceKey`).

use sea_orm::sea_query::{
    Alias, ColumnDef, ForeignKey, ForeignKeyAction, Index, IndexCreateStatement, Table,
    TableCreateStatement, TableDropStatement,
};

use crate::config::AccessLevelRuleConfig;

pub const USER_KEY_COLUMN: &str = "userKey";
pub const RESOURCE_KEY_COLUMN: &str = "resourceKey";
pub const ACCESS_LEVEL_COLUMN: &str = "accessLevel";

pub(crate) fn create_table(cfg: &AccessLevelRuleConfig) -> TableCreateStatement {
    let table = cfg.grants_table_name();

    let mut user_key = ColumnDef::new(Alias::new(USER_KEY_COLUMN));
    cfg.user_key_data_type.apply(&mut user_key).not_null();

    let mut resource_key = ColumnDef::new(Alias::new(RESOURCE_KEY_COLUMN));
    cfg.resource_key_data_type
        .apply(&mut resource_key)
        .not_null();

    Table::create()
        .table(Alias::new(&table))
        .col(&mut user_key)
        .col(&mut resource_key)
        .col(
            ColumnDef::new(Alias::new(ACCESS_LEVEL_COLUMN))
                .integer()
                .not_null(),
        )
        .foreign_key(
            ForeignKey::create()
                .name(format!("fk_{table}_{USER_KEY_COLUMN}"))
                .from(Alias::new(&table), Alias::new(USER_KEY_COLUMN))
                .to(
                    Alias::new(&cfg.user_table),
                    Alias::new(&cfg.user_key_column),
                )
                .on_delete(ForeignKeyAction::Cascade),
        )
        .foreign_key(
            ForeignKey::create()
                .name(format!("fk_{table}_{RESOURCE_KEY_COLUMN}"))
                .from(Alias::new(&table), Alias::new(RESOURCE_KEY_COLUMN))
                .to(
                    Alias::new(&cfg.resource_table),
                    Alias::new(&cfg.resource_key_column),
                )
                .on_delete(ForeignKeyAction::Cascade),
        )
        .index(
            Index::create()
                .unique()
                .name(unique_index_name(&table))
                .col(Alias::new(USER_KEY_COLUMN))
                .col(Alias::new(RESOURCE_KEY_COLUMN)),
        )
        .to_owned()
}

pub(crate) fn create_access_level_index(cfg: &AccessLevelRuleConfig) -> IndexCreateStatement {
    let table = cfg.grants_table_name();
    Index::create()
        .name(format!("idx_{table}_{ACCESS_LEVEL_COLUMN}"))
        .table(Alias::new(&table))
        .col(Alias::new(ACCESS_LEVEL_COLUMN))
        .to_owned()
}

pub(crate) fn drop_table(cfg: &AccessLevelRuleConfig, if_exists: bool) -> TableDropStatement {
    let mut stmt = Table::drop();
    stmt.table(Alias::new(cfg.grants_table_name()));
    if if_exists {
        stmt.if_exists();
    }
    stmt
}

fn unique_index_name(table: &str) -> String {
    format!("uq_{table}_{USER_KEY_COLUMN}_{RESOURCE_KEY_COLUMN}")
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::key::KeyDataType;
    use sea_orm::sea_query::{PostgresQueryBuilder, SqliteQueryBuilder};

    fn posts_cfg() -> AccessLevelRuleConfig {
        AccessLevelRuleConfig::new("users", "posts", "owner_id", 2)
    }

    #[test]
    fn grants_table_has_cascading_foreign_keys() {
        let sql = create_table(&posts_cfg()).to_string(SqliteQueryBuilder);
        assert!(sql.starts_with(r#"CREATE TABLE "posts_access_levels""#), "{sql}");
        assert!(
            sql.contains(
                r#"FOREIGN KEY ("userKey") REFERENCES "users" ("id") ON DELETE CASCADE"#
            ),
            "{sql}"
        );
        assert!(
            sql.contains(
                r#"FOREIGN KEY ("resourceKey") REFERENCES "posts" ("id") ON DELETE CASCADE"#
            ),
            "{sql}"
        );
        assert!(sql.contains(r#"UNIQUE ("userKey", "resourceKey")"#), "{sql}");
    }

    #[test]
    fn key_columns_follow_configured_types() {
        let cfg = posts_cfg()
            .with_user_key("uid", KeyDataType::Uuid)
            .with_resource_key("slug", KeyDataType::Text);
        let sql = create_table(&cfg).to_string(PostgresQueryBuilder);
        assert!(sql.contains(r#""userKey" uuid NOT NULL"#), "{sql}");
        assert!(sql.contains(r#""resourceKey" text NOT NULL"#), "{sql}");
        assert!(sql.contains(r#"REFERENCES "users" ("uid")"#), "{sql}");
        assert!(sql.contains(r#"REFERENCES "posts" ("slug")"#), "{sql}");
    }

    #[test]
    fn big_integer_keys_get_a_64_bit_column() {
        let cfg = posts_cfg()
            .with_user_key("id", KeyDataType::BigInteger)
            .with_resource_key("id", KeyDataType::BigInteger);
        let sql = create_table(&cfg).to_string(PostgresQueryBuilder);
        assert!(sql.contains(r#""userKey" bigint NOT NULL"#), "{sql}");
        assert!(sql.contains(r#""resourceKey" bigint NOT NULL"#), "{sql}");
    }

    #[test]
    fn access_level_index_targets_grants_table() {
        let sql = create_access_level_index(&posts_cfg()).to_string(SqliteQueryBuilder);
        assert!(
            sql.starts_with(r#"CREATE INDEX "idx_posts_access_levels_accessLevel""#),
            "{sql}"
        );
        assert!(sql.contains(r#"ON "posts_access_levels""#), "{sql}");
        assert!(sql.contains(r#""accessLevel""#), "{sql}");
    }

    #[test]
    fn drop_optionally_tolerates_missing_table() {
        let cfg = posts_cfg();
        assert_eq!(
            drop_table(&cfg, false).to_string(SqliteQueryBuilder),
            r#"DROP TABLE "posts_access_levels""#
        );
        assert_eq!(
            drop_table(&cfg, true).to_string(SqliteQueryBuilder),
            r#"DROP TABLE IF EXISTS "posts_access_levels""#
        );
    }
}
