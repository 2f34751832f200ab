#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

//! Shared fixtures: `users`, `posts` and `comments` tables created by
//! `sea-orm-migration`, plus the posts access-level rule.

use access_levels::{AccessLevelMigration, AccessLevelRule, AccessLevelRuleConfig};
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use sea_orm_migration::prelude as mig;

pub const READ: i32 = 1;
pub const WRITE: i32 = 2;

pub mod user {
    use sea_orm::entity::prelude::*;

    #[derive(Debug, Clone, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: i32,
        pub name: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod post {
    use sea_orm::entity::prelude::*;

    #[derive(Debug, Clone, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "posts")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: i32,
        pub owner_id: Option<i32>,
        pub title: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod comment {
    use sea_orm::entity::prelude::*;

    #[derive(Debug, Clone, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "comments")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub post_id: i32,
        pub body: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub fn posts_rule() -> AccessLevelRule<i32, i32> {
    AccessLevelRule::new(AccessLevelRuleConfig::new("users", "posts", "owner_id", WRITE))
        .expect("posts rule")
}

struct CreateBlogTables;

impl mig::MigrationName for CreateBlogTables {
    fn name(&self) -> &'static str {
        "m001_create_blog_tables"
    }
}

#[async_trait::async_trait]
impl mig::MigrationTrait for CreateBlogTables {
    async fn up(&self, manager: &mig::SchemaManager) -> Result<(), mig::DbErr> {
        manager
            .create_table(
                mig::Table::create()
                    .table(mig::Alias::new("users"))
                    .col(
                        mig::ColumnDef::new(mig::Alias::new("id"))
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        mig::ColumnDef::new(mig::Alias::new("name"))
                            .string()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                mig::Table::create()
                    .table(mig::Alias::new("posts"))
                    .col(
                        mig::ColumnDef::new(mig::Alias::new("id"))
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        mig::ColumnDef::new(mig::Alias::new("owner_id"))
                            .integer()
                            .null(),
                    )
                    .col(
                        mig::ColumnDef::new(mig::Alias::new("title"))
                            .string()
                            .not_null(),
                    )
                    .foreign_key(
                        mig::ForeignKey::create()
                            .name("fk_posts_owner_id")
                            .from(mig::Alias::new("posts"), mig::Alias::new("owner_id"))
                            .to(mig::Alias::new("users"), mig::Alias::new("id"))
                            .on_delete(mig::ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                mig::Table::create()
                    .table(mig::Alias::new("comments"))
                    .col(
                        mig::ColumnDef::new(mig::Alias::new("id"))
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        mig::ColumnDef::new(mig::Alias::new("post_id"))
                            .integer()
                            .not_null(),
                    )
                    .col(
                        mig::ColumnDef::new(mig::Alias::new("body"))
                            .string()
                            .not_null(),
                    )
                    .foreign_key(
                        mig::ForeignKey::create()
                            .name("fk_comments_post_id")
                            .from(mig::Alias::new("comments"), mig::Alias::new("post_id"))
                            .to(mig::Alias::new("posts"), mig::Alias::new("id"))
                            .on_delete(mig::ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &mig::SchemaManager) -> Result<(), mig::DbErr> {
        for table in ["comments", "posts", "users"] {
            manager
                .drop_table(
                    mig::Table::drop()
                        .table(mig::Alias::new(table))
                        .if_exists()
                        .to_owned(),
                )
                .await?;
        }
        Ok(())
    }
}

pub struct Migrator;

impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn mig::MigrationTrait>> {
        vec![
            Box::new(CreateBlogTables),
            Box::new(AccessLevelMigration::new(posts_rule())),
        ]
    }
}

/// Fresh in-memory database with all migrations applied.
pub async fn setup_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(opts).await.expect("connect");
    Migrator::up(&db, None).await.expect("migrate");
    db
}

pub async fn insert_users(db: &DatabaseConnection, ids: impl IntoIterator<Item = i32>) {
    for id in ids {
        user::ActiveModel {
            id: Set(id),
            name: Set(format!("user-{id}")),
        }
        .insert(db)
        .await
        .expect("insert user");
    }
}

pub async fn insert_post(db: &DatabaseConnection, id: i32, owner_id: i32) {
    insert_post_owned_by(db, id, Some(owner_id)).await;
}

pub async fn insert_post_owned_by(db: &DatabaseConnection, id: i32, owner_id: Option<i32>) {
    post::ActiveModel {
        id: Set(id),
        owner_id: Set(owner_id),
        title: Set(format!("post-{id}")),
    }
    .insert(db)
    .await
    .expect("insert post");
}

pub async fn insert_comment(db: &DatabaseConnection, post_id: i32, body: &str) -> i32 {
    comment::ActiveModel {
        post_id: Set(post_id),
        body: Set(body.to_owned()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert comment")
    .id
}

/// Users 1-5. User 2 owns post 1, user 3 owns posts 2 and 3, user 4 owns
/// post 4 and reads post 1, user 5 reads post 2 and writes post 3.
pub async fn seed_blog(db: &DatabaseConnection, rule: &AccessLevelRule<i32, i32>) {
    insert_users(db, 1..=5).await;
    for (post, owner) in [(1, 2), (2, 3), (3, 3), (4, 4)] {
        insert_post(db, post, owner).await;
    }
    for (user, post, level) in [(4, 1, READ), (5, 2, READ), (5, 3, WRITE)] {
        rule.set_access_level(db, &user, &post, level)
            .await
            .expect("grant");
    }
}
