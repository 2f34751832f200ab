use std::fmt;

use sea_orm::sea_query::ColumnDef;
use sea_orm::{TryGetable, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// SQL data type of a user or resource key column.
///
/// Used when the grants table is created so that its `userKey` / `resourceKey`
/// columns match the columns they reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeyDataType {
    /// 32-bit integer.
    #[default]
    Integer,
    /// 64-bit integer.
    BigInteger,
    Text,
    Uuid,
}

impl KeyDataType {
    /// Apply the SQL type of this key to a column definition.
    pub(crate) fn apply(self, col: &mut ColumnDef) -> &mut ColumnDef {
        match self {
            Self::Integer => col.integer(),
            Self::BigInteger => col.big_integer(),
            Self::Text => col.text(),
            Self::Uuid => col.uuid(),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::BigInteger => "big_integer",
            Self::Text => "text",
            Self::Uuid => "uuid",
        }
    }
}

impl fmt::Display for KeyDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A Rust type usable as a user or resource key.
///
/// The associated [`KeyDataType`] ties the Rust type to the SQL column type
/// declared in [`AccessLevelRuleConfig`](crate::AccessLevelRuleConfig); the
/// pairing is checked once when the rule is constructed.
pub trait AccessKey: Clone + fmt::Debug + Send + Sync + Into<Value> + TryGetable + 'static {
    const DATA_TYPE: KeyDataType;
}

impl AccessKey for i32 {
    const DATA_TYPE: KeyDataType = KeyDataType::Integer;
}

impl AccessKey for i64 {
    const DATA_TYPE: KeyDataType = KeyDataType::BigInteger;
}

impl AccessKey for String {
    const DATA_TYPE: KeyDataType = KeyDataType::Text;
}

impl AccessKey for Uuid {
    const DATA_TYPE: KeyDataType = KeyDataType::Uuid;
}
