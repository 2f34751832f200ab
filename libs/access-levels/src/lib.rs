#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Row-level access levels for `SeaORM` resource tables.
//!
//! An [`AccessLevelRule`] binds a user table to a resource table. It owns a
//! grants table `{resource}_access_levels` holding an integer level per
//! (user, resource) pair, and rewrites select, update, delete and insert
//! statements so that they only see or touch rows the user may access:
//!
//! - the owner of a resource always holds the configured owner level,
//! - any other user needs a grant at or above the requested minimum.
//!
//! Denied access never surfaces as an error. Guarded queries return or
//! affect zero rows instead.
//!
//! ```ignore
//! let rule = AccessLevelRule::<i32, i32>::new(
//!     AccessLevelRuleConfig::new("users", "posts", "owner_id", WRITE),
//! )?;
//! rule.create(&db).await?;
//! rule.set_access_level(&db, &reader_id, &post_id, READ).await?;
//!
//! let visible = rule
//!     .guard_selecting_access_level(READ, &reader_id, post::Entity::find().into_query())
//!     .all::<post::Model, _>(&db)
//!     .await?;
//! ```

pub mod config;
pub mod error;
pub mod guard;
pub mod insert;
pub mod key;
pub mod migration;
pub mod rule;
pub mod schema;
pub mod select;

pub use config::AccessLevelRuleConfig;
pub use error::AccessLevelError;
pub use guard::ResourceLink;
pub use insert::{GuardedInsert, ReturningColumns};
pub use key::{AccessKey, KeyDataType};
pub use migration::AccessLevelMigration;
pub use rule::{AccessLevelRule, NO_ACCESS, ResourceGrant, UserGrant};
pub use schema::{ACCESS_LEVEL_COLUMN, RESOURCE_KEY_COLUMN, USER_KEY_COLUMN};
pub use select::{GuardedSelect, WithAccessLevel};
