use sea_orm::sea_query::{
    Alias, Asterisk, IntoColumnRef, Order, OrderedStatement, Query, SelectStatement,
};
use sea_orm::{ConnectionTrait, DbErr, FromQueryResult, QueryResult};

use crate::error::AccessLevelError;
use crate::schema::ACCESS_LEVEL_COLUMN;

const GUARDED_ALIAS: &str = "guarded";

/// A guarded select: the owner and grant branches combined, wrapped as
/// `SELECT * FROM (...) AS "guarded"`.
///
/// Ordering and limits apply to the combined rows. Columns passed to
/// [`order_by`](Self::order_by) must be unqualified (e.g. `post::Column::Id`,
/// not `(post::Entity, post::Column::Id)`) since the outer query only sees
/// the `guarded` alias.
#[must_use]
#[derive(Clone, Debug)]
pub struct GuardedSelect {
    outer: SelectStatement,
}

impl GuardedSelect {
    pub(crate) fn new(union: SelectStatement) -> Self {
        let mut outer = Query::select();
        outer
            .column(Asterisk)
            .from_subquery(union, Alias::new(GUARDED_ALIAS));
        Self { outer }
    }

    pub fn order_by<C: IntoColumnRef>(mut self, col: C, order: Order) -> Self {
        self.outer.order_by(col, order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.outer.limit(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.outer.offset(offset);
        self
    }

    #[must_use]
    pub fn statement(&self) -> &SelectStatement {
        &self.outer
    }

    #[must_use]
    pub fn into_statement(self) -> SelectStatement {
        self.outer
    }

    /// Execute and decode every row as `M` plus its access level.
    ///
    /// # Errors
    /// Returns `AccessLevelError::Db` if the query fails or a row cannot be decoded.
    pub async fn all<M, C>(self, conn: &C) -> Result<Vec<WithAccessLevel<M>>, AccessLevelError>
    where
        M: FromQueryResult,
        C: ConnectionTrait,
    {
        let stmt = conn.get_database_backend().build(&self.outer);
        let rows = WithAccessLevel::<M>::find_by_statement(stmt).all(conn).await?;
        tracing::debug!(rows = rows.len(), "Guarded select");
        Ok(rows)
    }

    /// Execute with `LIMIT 1`.
    ///
    /// # Errors
    /// Returns `AccessLevelError::Db` if the query fails or the row cannot be decoded.
    pub async fn one<M, C>(self, conn: &C) -> Result<Option<WithAccessLevel<M>>, AccessLevelError>
    where
        M: FromQueryResult,
        C: ConnectionTrait,
    {
        let outer = self.limit(1).outer;
        let stmt = conn.get_database_backend().build(&outer);
        Ok(WithAccessLevel::<M>::find_by_statement(stmt).one(conn).await?)
    }
}

/// A row of a guarded select together with the level the user holds on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithAccessLevel<M> {
    pub model: M,
    pub access_level: i32,
}

impl<M: FromQueryResult> FromQueryResult for WithAccessLevel<M> {
    fn from_query_result(res: &QueryResult, pre: &str) -> Result<Self, DbErr> {
        Ok(Self {
            model: M::from_query_result(res, pre)?,
            access_level: res.try_get(pre, ACCESS_LEVEL_COLUMN)?,
        })
    }
}
