//! Query guarding.
//!
//! A user may access a resource row when
//!
//! 1. the row's owner column equals the user (owner bypass, no grant needed), or
//! 2. the row is not owned by the user and the grants table holds a row for
//!    (user, resource) with `accessLevel >= minimum`.
//!
//! The two branches are disjoint, so combining them with `UNION ALL` never
//! yields a resource twice, and the cheap ownership predicate is evaluated
//! without touching the grants table.
//!
//! # Example
//!
//! ```ignore
//! use access_levels::{AccessLevelRule, ResourceLink};
//! use sea_orm::{EntityTrait, QueryTrait};
//!
//! // Rows of `posts` user 4 may read, each tagged with its access level.
//! let rows = rule
//!     .guard_selecting_access_level(READ, &4, post::Entity::find().into_query())
//!     .order_by(post::Column::Id, Order::Asc)
//!     .all::<post::Model, _>(&db)
//!     .await?;
//!
//! // Delete comments on posts user 4 may write.
//! let res = rule
//!     .guard_query(
//!         WRITE,
//!         &4,
//!         &ResourceLink::column((comment::Entity, comment::Column::PostId)),
//!         comment::Entity::delete_many(),
//!     )
//!     .exec(&db)
//!     .await?;
//! ```

use sea_orm::sea_query::{
    Alias, ColumnRef, ConditionalStatement, Expr, Iden, IntoColumnRef, IntoIden, OrderedStatement,
    Query, SelectStatement, SimpleExpr, UnionType,
};
use sea_orm::{ActiveModelTrait, ActiveValue, Condition, EntityTrait, Iterable, QueryFilter, Value};

use crate::error::AccessLevelError;
use crate::insert::GuardedInsert;
use crate::key::AccessKey;
use crate::rule::{AccessLevelRule, key_value};
use crate::schema::{ACCESS_LEVEL_COLUMN, RESOURCE_KEY_COLUMN, USER_KEY_COLUMN};
use crate::select::GuardedSelect;

/// How the rows of a guarded query relate to the resource table.
#[derive(Clone, Debug)]
pub enum ResourceLink {
    /// The query targets the resource table itself.
    Direct,
    /// The query targets another table whose column holds the resource key.
    Column(ColumnRef),
}

impl ResourceLink {
    /// Link through a referencing column, e.g. `(comment::Entity, comment::Column::PostId)`.
    #[must_use]
    pub fn column<C: IntoColumnRef>(col: C) -> Self {
        Self::Column(col.into_column_ref())
    }
}

impl<U: AccessKey, R: AccessKey> AccessLevelRule<U, R> {
    fn owned_by(&self, user: &Value) -> Condition {
        Condition::all().add(Expr::col(self.owner_col()).eq(user.clone()))
    }

    /// Resources without an owner count as not owned by anyone.
    fn not_owned_by(&self, user: &Value) -> Condition {
        Condition::any()
            .add(Expr::col(self.owner_col()).ne(user.clone()))
            .add(Expr::col(self.owner_col()).is_null())
    }

    fn grant_join(&self, user: &Value) -> Condition {
        Condition::all()
            .add(Expr::col(self.grants_col(RESOURCE_KEY_COLUMN)).equals(self.resource_key_col()))
            .add(Expr::col(self.grants_col(USER_KEY_COLUMN)).eq(user.clone()))
    }

    fn level_at_least(&self, minimum: i32) -> Condition {
        Condition::all().add(Expr::col(self.grants_col(ACCESS_LEVEL_COLUMN)).gte(minimum))
    }

    fn granted_not_owned(&self, minimum: i32, user: &Value) -> Condition {
        Condition::all()
            .add(self.not_owned_by(user))
            .add(Expr::col(self.resource_key_col()).in_subquery(self.granted_keys(minimum, user)))
    }

    /// `SELECT resourceKey FROM grants WHERE userKey = user AND accessLevel >= minimum`.
    fn granted_keys(&self, minimum: i32, user: &Value) -> SelectStatement {
        let mut keys = Query::select();
        keys.column(self.grants_col(RESOURCE_KEY_COLUMN))
            .from(self.grants_iden())
            .and_where(Expr::col(self.grants_col(USER_KEY_COLUMN)).eq(user.clone()))
            .cond_where(self.level_at_least(minimum));
        keys
    }

    /// The user's grant level on the current resource row, as a scalar sub-query.
    /// At most one row matches thanks to the (userKey, resourceKey) unique index.
    fn granted_level(&self, user: &Value) -> SimpleExpr {
        let mut level = Query::select();
        level
            .column(self.grants_col(ACCESS_LEVEL_COLUMN))
            .from(self.grants_iden())
            .cond_where(self.grant_join(user));
        SimpleExpr::SubQuery(None, Box::new(level.into_sub_query_statement()))
    }

    /// Keys of resources the user may access, as a disjoint `UNION ALL`.
    fn accessible_keys(&self, minimum: i32, user: &Value) -> SelectStatement {
        let mut granted = Query::select();
        granted
            .column(self.resource_key_col())
            .from(self.resource_iden())
            .inner_join(self.grants_iden(), self.grant_join(user))
            .cond_where(self.not_owned_by(user))
            .cond_where(self.level_at_least(minimum));

        let mut owned = Query::select();
        owned
            .column(self.resource_key_col())
            .from(self.resource_iden())
            .cond_where(self.owned_by(user))
            .union(UnionType::All, granted);
        owned
    }

    /// `WHERE` condition admitting only rows linked to a resource `user` may access
    /// at `minimum` or above.
    #[must_use]
    pub fn eligibility(&self, minimum: i32, user: &U, link: &ResourceLink) -> Condition {
        let user = key_value(user);
        match link {
            ResourceLink::Direct => Condition::any()
                .add(self.owned_by(&user))
                .add(self.granted_not_owned(minimum, &user)),
            ResourceLink::Column(col) => Condition::all().add(
                Expr::col(col.clone()).in_subquery(self.accessible_keys(minimum, &user)),
            ),
        }
    }

    /// Restrict `base` (a select on the resource table) to rows `user` may
    /// access at `minimum` or above, adding an `accessLevel` column.
    ///
    /// `base` must reference the resource table by its name. Its `ORDER BY`,
    /// `LIMIT` and `OFFSET` are dropped; apply them to the returned query.
    pub fn guard_selecting_access_level(
        &self,
        minimum: i32,
        user: &U,
        mut base: SelectStatement,
    ) -> GuardedSelect {
        let user = key_value(user);
        base.clear_order_by().reset_limit().reset_offset();

        // No join here: the base projection (possibly `*`) must expand to the
        // same columns in both branches.
        let mut granted = base.clone();
        granted
            .expr_as(self.granted_level(&user), Alias::new(ACCESS_LEVEL_COLUMN))
            .cond_where(self.granted_not_owned(minimum, &user));

        let mut owned = base;
        owned
            .expr_as(
                Expr::val(self.owner_access_level()),
                Alias::new(ACCESS_LEVEL_COLUMN),
            )
            .cond_where(self.owned_by(&user))
            .union(UnionType::All, granted);

        GuardedSelect::new(owned)
    }

    /// Restrict a `SeaORM` select, update or delete to rows linked to resources
    /// `user` may access at `minimum` or above. No column is added.
    #[must_use]
    pub fn guard_query<Q: QueryFilter>(
        &self,
        minimum: i32,
        user: &U,
        link: &ResourceLink,
        query: Q,
    ) -> Q {
        query.filter(self.eligibility(minimum, user, link))
    }

    /// [`guard_query`](Self::guard_query) for raw `SeaQuery` statements.
    #[must_use]
    pub fn guard_statement<Q: ConditionalStatement>(
        &self,
        minimum: i32,
        user: &U,
        link: &ResourceLink,
        mut statement: Q,
    ) -> Q {
        statement.cond_where(self.eligibility(minimum, user, link));
        statement
    }

    /// Insert `values` into `table` only if `user` may access the resource
    /// referenced by `resource_key_column` at `minimum` or above. Otherwise
    /// the insert affects no rows.
    ///
    /// # Errors
    /// - `AccessLevelError::Invalid` if `values` is empty or lacks `resource_key_column`.
    /// - `AccessLevelError::Query` if the statement cannot be assembled.
    pub fn guard_insert<T, C, V, I, K>(
        &self,
        minimum: i32,
        user: &U,
        table: T,
        values: I,
        resource_key_column: K,
    ) -> Result<GuardedInsert, AccessLevelError>
    where
        T: IntoIden,
        C: IntoIden,
        V: Into<Value>,
        I: IntoIterator<Item = (C, V)>,
        K: IntoIden,
    {
        let fk = resource_key_column.into_iden().to_string();
        let (columns, values): (Vec<_>, Vec<Value>) = values
            .into_iter()
            .map(|(c, v)| (c.into_iden(), v.into()))
            .unzip();
        if columns.is_empty() {
            return Err(AccessLevelError::Invalid("insert requires at least one value"));
        }
        let resource_key = columns
            .iter()
            .zip(&values)
            .find_map(|(c, v)| (c.to_string() == fk).then(|| v.clone()))
            .ok_or(AccessLevelError::Invalid(
                "insert values must include the resource key column",
            ))?;

        let mut source = Query::select();
        source
            .exprs(values.into_iter().map(Expr::val))
            .from(self.resource_iden())
            .and_where(Expr::col(self.resource_key_col()).eq(resource_key))
            .cond_where(self.eligibility(minimum, user, &ResourceLink::Direct));

        let mut insert = Query::insert();
        insert
            .into_table(table.into_iden())
            .columns(columns)
            .select_from(source)?;
        Ok(GuardedInsert::new(insert))
    }

    /// [`guard_insert`](Self::guard_insert) taking the set fields of an `ActiveModel`.
    ///
    /// # Errors
    /// Same as [`guard_insert`](Self::guard_insert).
    pub fn guard_insert_model<A>(
        &self,
        minimum: i32,
        user: &U,
        model: &A,
        resource_key_column: <A::Entity as EntityTrait>::Column,
    ) -> Result<GuardedInsert, AccessLevelError>
    where
        A: ActiveModelTrait,
    {
        let values = <A::Entity as EntityTrait>::Column::iter().filter_map(|col| {
            match model.get(col) {
                ActiveValue::Set(v) | ActiveValue::Unchanged(v) => Some((col, v)),
                ActiveValue::NotSet => None,
            }
        });
        self.guard_insert(
            minimum,
            user,
            A::Entity::default(),
            values,
            resource_key_column,
        )
    }
}
