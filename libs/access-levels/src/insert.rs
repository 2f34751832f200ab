use sea_orm::sea_query::{Alias, InsertStatement, Query};
use sea_orm::{ConnectionTrait, DbBackend, FromQueryResult};

use crate::error::AccessLevelError;

/// Columns returned by a guarded insert executed with
/// [`one`](GuardedInsert::one) or [`all`](GuardedInsert::all).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ReturningColumns {
    #[default]
    None,
    Columns(Vec<String>),
    All,
}

/// `INSERT INTO t (..) SELECT <values> FROM <resource table> WHERE <access>`.
///
/// Inserts one row when the user may access the referenced resource and no
/// row otherwise. Denial is reported through the row count, never as an error.
#[must_use]
#[derive(Clone, Debug)]
pub struct GuardedInsert {
    stmt: InsertStatement,
    returning: ReturningColumns,
}

impl GuardedInsert {
    pub(crate) fn new(stmt: InsertStatement) -> Self {
        Self {
            stmt,
            returning: ReturningColumns::None,
        }
    }

    pub fn returning(mut self, returning: ReturningColumns) -> Self {
        self.returning = returning;
        self
    }

    /// The statement as [`one`](Self::one) and [`all`](Self::all) run it,
    /// including the `RETURNING` clause if one was requested.
    #[must_use]
    pub fn statement(&self) -> InsertStatement {
        let mut stmt = self.stmt.clone();
        match &self.returning {
            ReturningColumns::None => {}
            ReturningColumns::Columns(cols) => {
                stmt.returning(Query::returning().columns(cols.iter().map(Alias::new)));
            }
            ReturningColumns::All => {
                stmt.returning_all();
            }
        }
        stmt
    }

    /// Execute without `RETURNING`; the result is the number of inserted rows (0 or 1).
    ///
    /// # Errors
    /// Returns `AccessLevelError::Db` if the statement fails, e.g. on a constraint violation.
    pub async fn exec<C: ConnectionTrait>(self, conn: &C) -> Result<u64, AccessLevelError> {
        let res = conn
            .execute(conn.get_database_backend().build(&self.stmt))
            .await?;
        tracing::debug!(inserted = res.rows_affected(), "Guarded insert");
        Ok(res.rows_affected())
    }

    /// Execute and decode the inserted row, `None` when access was denied.
    ///
    /// # Errors
    /// - `AccessLevelError::Invalid` if no returning columns were requested or
    ///   the backend lacks `RETURNING`.
    /// - `AccessLevelError::Db` if the statement fails.
    pub async fn one<M, C>(self, conn: &C) -> Result<Option<M>, AccessLevelError>
    where
        M: FromQueryResult,
        C: ConnectionTrait,
    {
        let stmt = conn
            .get_database_backend()
            .build(&self.returning_statement(conn)?);
        Ok(M::find_by_statement(stmt).one(conn).await?)
    }

    /// Execute and decode every inserted row.
    ///
    /// # Errors
    /// Same as [`one`](Self::one).
    pub async fn all<M, C>(self, conn: &C) -> Result<Vec<M>, AccessLevelError>
    where
        M: FromQueryResult,
        C: ConnectionTrait,
    {
        let stmt = conn
            .get_database_backend()
            .build(&self.returning_statement(conn)?);
        let rows = M::find_by_statement(stmt).all(conn).await?;
        tracing::debug!(inserted = rows.len(), "Guarded insert");
        Ok(rows)
    }

    fn returning_statement<C: ConnectionTrait>(
        &self,
        conn: &C,
    ) -> Result<InsertStatement, AccessLevelError> {
        if self.returning == ReturningColumns::None {
            return Err(AccessLevelError::Invalid(
                "returning columns must be set to fetch inserted rows",
            ));
        }
        if conn.get_database_backend() == DbBackend::MySql {
            return Err(AccessLevelError::Invalid(
                "database backend does not support RETURNING",
            ));
        }
        Ok(self.statement())
    }
}
