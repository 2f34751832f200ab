use sea_orm::DbErr;
use thiserror::Error;

use crate::key::KeyDataType;

/// Errors returned by access-level operations.
///
/// A user lacking access is never an error: guarded queries simply return or
/// affect zero rows.
#[derive(Debug, Error)]
pub enum AccessLevelError {
    /// Error reported by the database engine, passed through unchanged.
    #[error("database error: {0}")]
    Db(#[from] DbErr),

    #[error("invalid access level configuration: {0}")]
    Config(String),

    /// The Rust key type does not match the data type declared in the configuration.
    #[error("{role} key type mismatch: configured as {declared}, supplied {supplied}")]
    KeyTypeMismatch {
        role: &'static str,
        declared: KeyDataType,
        supplied: KeyDataType,
    },

    #[error("invalid request: {0}")]
    Invalid(&'static str),

    #[error("query build error: {0}")]
    Query(String),
}

impl From<sea_orm::sea_query::error::Error> for AccessLevelError {
    fn from(e: sea_orm::sea_query::error::Error) -> Self {
        Self::Query(e.to_string())
    }
}

impl From<figment::Error> for AccessLevelError {
    fn from(e: figment::Error) -> Self {
        Self::Config(e.to_string())
    }
}
