//! Access-level rule: owns the grants table of one resource table.

use std::marker::PhantomData;

use sea_orm::sea_query::{
    Alias, ColumnRef, ConditionalStatement, DynIden, Expr, IntoIden, OnConflict, Order,
    OrderedStatement, Query, SimpleExpr,
};
use sea_orm::{ConnectionTrait, QueryResult, Value};
use tracing::instrument;

use crate::config::AccessLevelRuleConfig;
use crate::error::AccessLevelError;
use crate::key::AccessKey;
use crate::schema::{self, ACCESS_LEVEL_COLUMN, RESOURCE_KEY_COLUMN, USER_KEY_COLUMN};

/// Access level revoking any grant.
pub const NO_ACCESS: i32 = 0;

/// A grant held by some user, seen from the user's side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGrant<R> {
    pub resource_key: R,
    pub access_level: i32,
}

/// A grant on some resource, seen from the resource's side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserGrant<U> {
    pub user_key: U,
    pub access_level: i32,
}

/// Per-user, per-resource access levels on one resource table.
///
/// `U` is the user key type, `R` the resource key type. Both are checked
/// against the configured [`KeyDataType`](crate::KeyDataType)s in [`new`](Self::new),
/// so every later call is statically bound to the right key types.
///
/// The owner of a resource (per `resource_owner_column`) implicitly holds
/// `owner_access_level` without any grant row. Everyone else needs a row in
/// the grants table (see [`table_name`](Self::table_name)).
#[derive(Debug, Clone)]
pub struct AccessLevelRule<U, R> {
    config: AccessLevelRuleConfig,
    grants_table: String,
    _keys: PhantomData<fn() -> (U, R)>,
}

impl<U: AccessKey, R: AccessKey> AccessLevelRule<U, R> {
    /// # Errors
    /// - `AccessLevelError::Config` if the configuration is invalid.
    /// - `AccessLevelError::KeyTypeMismatch` if `U` or `R` disagree with the configured key data types.
    pub fn new(config: AccessLevelRuleConfig) -> Result<Self, AccessLevelError> {
        config.validate()?;
        if U::DATA_TYPE != config.user_key_data_type {
            return Err(AccessLevelError::KeyTypeMismatch {
                role: "user",
                declared: config.user_key_data_type,
                supplied: U::DATA_TYPE,
            });
        }
        if R::DATA_TYPE != config.resource_key_data_type {
            return Err(AccessLevelError::KeyTypeMismatch {
                role: "resource",
                declared: config.resource_key_data_type,
                supplied: R::DATA_TYPE,
            });
        }
        let grants_table = config.grants_table_name();
        Ok(Self {
            config,
            grants_table,
            _keys: PhantomData,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AccessLevelRuleConfig {
        &self.config
    }

    /// Name of the grants table, for callers querying it directly.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.grants_table
    }

    #[must_use]
    pub fn owner_access_level(&self) -> i32 {
        self.config.owner_access_level
    }

    pub(crate) fn grants_iden(&self) -> DynIden {
        Alias::new(&self.grants_table).into_iden()
    }

    pub(crate) fn resource_iden(&self) -> DynIden {
        Alias::new(&self.config.resource_table).into_iden()
    }

    pub(crate) fn grants_col(&self, column: &'static str) -> ColumnRef {
        ColumnRef::TableColumn(self.grants_iden(), Alias::new(column).into_iden())
    }

    pub(crate) fn resource_key_col(&self) -> ColumnRef {
        ColumnRef::TableColumn(
            self.resource_iden(),
            Alias::new(&self.config.resource_key_column).into_iden(),
        )
    }

    pub(crate) fn owner_col(&self) -> ColumnRef {
        ColumnRef::TableColumn(
            self.resource_iden(),
            Alias::new(&self.config.resource_owner_column).into_iden(),
        )
    }

    /// Create the grants table and its `accessLevel` index.
    ///
    /// Not idempotent: creating an existing table fails with the engine's error.
    ///
    /// # Errors
    /// Returns `AccessLevelError::Db` if the engine rejects the DDL.
    #[instrument(skip_all, fields(table = %self.grants_table))]
    pub async fn create<C: ConnectionTrait>(&self, conn: &C) -> Result<(), AccessLevelError> {
        let backend = conn.get_database_backend();
        conn.execute(backend.build(&schema::create_table(&self.config)))
            .await?;
        conn.execute(backend.build(&schema::create_access_level_index(&self.config)))
            .await?;
        tracing::info!("Created access level table");
        Ok(())
    }

    /// Drop the grants table.
    ///
    /// # Errors
    /// Returns `AccessLevelError::Db` if the table does not exist.
    #[instrument(skip_all, fields(table = %self.grants_table))]
    pub async fn drop<C: ConnectionTrait>(&self, conn: &C) -> Result<(), AccessLevelError> {
        let backend = conn.get_database_backend();
        conn.execute(backend.build(&schema::drop_table(&self.config, false)))
            .await?;
        tracing::info!("Dropped access level table");
        Ok(())
    }

    /// Drop the grants table if it exists.
    ///
    /// # Errors
    /// Returns `AccessLevelError::Db` if the engine rejects the statement.
    #[instrument(skip_all, fields(table = %self.grants_table))]
    pub async fn drop_if_exists<C: ConnectionTrait>(
        &self,
        conn: &C,
    ) -> Result<(), AccessLevelError> {
        let backend = conn.get_database_backend();
        conn.execute(backend.build(&schema::drop_table(&self.config, true)))
            .await?;
        tracing::debug!("Dropped access level table (if exists)");
        Ok(())
    }

    /// Store `access_level` for the (user, resource) pair.
    ///
    /// Level [`NO_ACCESS`] deletes the grant (a no-op when there is none). Any
    /// other value is upserted as-is: it is neither clamped nor compared with
    /// the owner level, and a grant held by the owner is simply shadowed by
    /// ownership.
    ///
    /// # Errors
    /// Returns `AccessLevelError::Db` if the statement fails.
    #[instrument(skip_all, fields(table = %self.grants_table, access_level = access_level))]
    pub async fn set_access_level<C: ConnectionTrait>(
        &self,
        conn: &C,
        user: &U,
        resource: &R,
        access_level: i32,
    ) -> Result<(), AccessLevelError> {
        let backend = conn.get_database_backend();
        let user_val = key_value(user);
        let resource_val = key_value(resource);

        if access_level == NO_ACCESS {
            let stmt = Query::delete()
                .from_table(self.grants_iden())
                .and_where(Expr::col(self.grants_col(USER_KEY_COLUMN)).eq(user_val))
                .and_where(Expr::col(self.grants_col(RESOURCE_KEY_COLUMN)).eq(resource_val))
                .to_owned();
            let res = conn.execute(backend.build(&stmt)).await?;
            tracing::debug!(removed = res.rows_affected(), "Revoked access level");
            return Ok(());
        }

        let stmt = Query::insert()
            .into_table(self.grants_iden())
            .columns([
                Alias::new(USER_KEY_COLUMN),
                Alias::new(RESOURCE_KEY_COLUMN),
                Alias::new(ACCESS_LEVEL_COLUMN),
            ])
            .values([
                SimpleExpr::Value(user_val),
                SimpleExpr::Value(resource_val),
                SimpleExpr::Value(access_level.into()),
            ])?
            .on_conflict(
                OnConflict::columns([Alias::new(USER_KEY_COLUMN), Alias::new(RESOURCE_KEY_COLUMN)])
                    .update_column(Alias::new(ACCESS_LEVEL_COLUMN))
                    .to_owned(),
            )
            .to_owned();
        conn.execute(backend.build(&stmt)).await?;
        tracing::debug!("Stored access level");
        Ok(())
    }

    /// The stored grant for the pair, ignoring ownership.
    ///
    /// # Errors
    /// Returns `AccessLevelError::Db` if the query fails.
    pub async fn grant<C: ConnectionTrait>(
        &self,
        conn: &C,
        user: &U,
        resource: &R,
    ) -> Result<Option<i32>, AccessLevelError> {
        let stmt = Query::select()
            .column(self.grants_col(ACCESS_LEVEL_COLUMN))
            .from(self.grants_iden())
            .and_where(Expr::col(self.grants_col(USER_KEY_COLUMN)).eq(key_value(user)))
            .and_where(Expr::col(self.grants_col(RESOURCE_KEY_COLUMN)).eq(key_value(resource)))
            .to_owned();
        let row = conn
            .query_one(conn.get_database_backend().build(&stmt))
            .await?;
        row.as_ref()
            .map(access_level_of)
            .transpose()
            .map_err(Into::into)
    }

    /// All grants held by `user`, ordered by resource key.
    ///
    /// # Errors
    /// Returns `AccessLevelError::Db` if the query fails.
    pub async fn grants_for_user<C: ConnectionTrait>(
        &self,
        conn: &C,
        user: &U,
    ) -> Result<Vec<ResourceGrant<R>>, AccessLevelError> {
        let stmt = Query::select()
            .columns([
                self.grants_col(RESOURCE_KEY_COLUMN),
                self.grants_col(ACCESS_LEVEL_COLUMN),
            ])
            .from(self.grants_iden())
            .and_where(Expr::col(self.grants_col(USER_KEY_COLUMN)).eq(key_value(user)))
            .order_by(self.grants_col(RESOURCE_KEY_COLUMN), Order::Asc)
            .to_owned();
        let rows = conn
            .query_all(conn.get_database_backend().build(&stmt))
            .await?;
        rows.iter()
            .map(|row| -> Result<ResourceGrant<R>, AccessLevelError> {
                Ok(ResourceGrant {
                    resource_key: row.try_get::<R>("", RESOURCE_KEY_COLUMN)?,
                    access_level: access_level_of(row)?,
                })
            })
            .collect()
    }

    /// All grants on `resource`, ordered by user key. The owner is not listed
    /// unless they also hold a grant row.
    ///
    /// # Errors
    /// Returns `AccessLevelError::Db` if the query fails.
    pub async fn grants_for_resource<C: ConnectionTrait>(
        &self,
        conn: &C,
        resource: &R,
    ) -> Result<Vec<UserGrant<U>>, AccessLevelError> {
        let stmt = Query::select()
            .columns([
                self.grants_col(USER_KEY_COLUMN),
                self.grants_col(ACCESS_LEVEL_COLUMN),
            ])
            .from(self.grants_iden())
            .and_where(Expr::col(self.grants_col(RESOURCE_KEY_COLUMN)).eq(key_value(resource)))
            .order_by(self.grants_col(USER_KEY_COLUMN), Order::Asc)
            .to_owned();
        let rows = conn
            .query_all(conn.get_database_backend().build(&stmt))
            .await?;
        rows.iter()
            .map(|row| -> Result<UserGrant<U>, AccessLevelError> {
                Ok(UserGrant {
                    user_key: row.try_get::<U>("", USER_KEY_COLUMN)?,
                    access_level: access_level_of(row)?,
                })
            })
            .collect()
    }

    /// Level `user` holds on `resource`: the owner level for the owner, the
    /// grant level otherwise, `None` without access or when the resource does
    /// not exist.
    ///
    /// # Errors
    /// Returns `AccessLevelError::Db` if the query fails.
    pub async fn effective_access_level<C: ConnectionTrait>(
        &self,
        conn: &C,
        user: &U,
        resource: &R,
    ) -> Result<Option<i32>, AccessLevelError> {
        let base = Query::select()
            .column(self.resource_key_col())
            .from(self.resource_iden())
            .and_where(Expr::col(self.resource_key_col()).eq(key_value(resource)))
            .to_owned();
        let stmt = self
            .guard_selecting_access_level(NO_ACCESS, user, base)
            .limit(1)
            .into_statement();
        let row = conn
            .query_one(conn.get_database_backend().build(&stmt))
            .await?;
        row.as_ref()
            .map(access_level_of)
            .transpose()
            .map_err(Into::into)
    }
}

pub(crate) fn key_value<K: AccessKey>(key: &K) -> Value {
    key.clone().into()
}

fn access_level_of(row: &QueryResult) -> Result<i32, sea_orm::DbErr> {
    row.try_get::<i32>("", ACCESS_LEVEL_COLUMN)
}
