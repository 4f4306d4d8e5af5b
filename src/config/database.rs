//! Database configuration module.
//!
//! This module handles the database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs. The one constraint SeaORM cannot express from an entity, the
//! partial unique index over pending invitations, is created with raw SQL.

use crate::entities::{Expense, ExpenseParticipant, Friendship, Invitation, User};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info, instrument};

/// Default database location used when `DATABASE_URL` is unset.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://splitbook.sqlite?mode=rwc";

/// At most one pending invitation per unordered pair of users, whichever of
/// them sent it.
const PENDING_INVITATION_INDEX: &str =
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_invitations_pending_users \
     ON invitations (min(from_user_id, to_user_id), max(from_user_id, to_user_id)) \
     WHERE NOT is_accepted";

/// Directional index from earlier schemas, replaced by [`PENDING_INVITATION_INDEX`].
const LEGACY_PENDING_INVITATION_INDEX: &str = "DROP INDEX IF EXISTS idx_invitations_pending_pair";

/// Gets the database URL from the environment or returns the default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables and indexes if they do not already exist.
///
/// Tables are created parents first so foreign keys resolve: users, then the
/// friendship graph, then the ledger.
#[instrument(skip(db))]
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, User).await?;
    create_table(db, &schema, Invitation).await?;
    create_table(db, &schema, Friendship).await?;
    create_table(db, &schema, Expense).await?;
    create_table(db, &schema, ExpenseParticipant).await?;

    db.execute_unprepared(LEGACY_PENDING_INVITATION_INDEX).await?;
    db.execute_unprepared(PENDING_INVITATION_INDEX).await?;

    info!("Database tables ensured.");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::{expense, expense_participant, invitation};
    use crate::test_utils::*;
    use sea_orm::{ActiveModelTrait, ModelTrait, PaginatorTrait, Set};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        assert_eq!(User::find().count(&db).await?, 0);
        assert_eq!(Invitation::find().count(&db).await?, 0);
        assert_eq!(Friendship::find().count(&db).await?, 0);
        assert_eq!(Expense::find().count(&db).await?, 0);
        assert_eq!(ExpenseParticipant::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_pending_invitation_index_rejects_second_pending_row() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice").await?;
        let bob = create_test_user(&db, "bob").await?;

        let pending = || invitation::ActiveModel {
            from_user_id: Set(alice.id),
            to_user_id: Set(bob.id),
            is_accepted: Set(false),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };

        pending().insert(&db).await?;
        let second = pending().insert(&db).await;
        assert!(second.is_err());
        assert_eq!(Invitation::find().count(&db).await?, 1);

        // Accepted rows are outside the index.
        invitation::ActiveModel {
            from_user_id: Set(alice.id),
            to_user_id: Set(bob.id),
            is_accepted: Set(true),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await?;
        assert_eq!(Invitation::find().count(&db).await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_pending_invitation_index_covers_both_directions() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice").await?;
        let bob = create_test_user(&db, "bob").await?;

        let pending = |from_user_id: i64, to_user_id: i64| invitation::ActiveModel {
            from_user_id: Set(from_user_id),
            to_user_id: Set(to_user_id),
            is_accepted: Set(false),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };

        pending(alice.id, bob.id).insert(&db).await?;
        let reverse = pending(bob.id, alice.id).insert(&db).await;
        assert!(matches!(
            reverse.unwrap_err().sql_err(),
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
        ));
        assert_eq!(Invitation::find().count(&db).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_deleting_expense_cascades_to_participants() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice").await?;

        let expense = expense::ActiveModel {
            amount_cents: Set(1_000),
            description: Set("Coffee".to_string()),
            created_by: Set(alice.id),
            date_created: Set(chrono::Utc::now()),
            tax_cents: Set(0),
            ..Default::default()
        }
        .insert(&db)
        .await?;
        expense_participant::ActiveModel {
            expense_id: Set(expense.id),
            participant_id: Set(alice.id),
            paid_share_cents: Set(0),
            owes_share_cents: Set(1_000),
            ..Default::default()
        }
        .insert(&db)
        .await?;
        assert_eq!(ExpenseParticipant::find().count(&db).await?, 1);

        expense.delete(&db).await?;
        assert_eq!(ExpenseParticipant::find().count(&db).await?, 0);
        Ok(())
    }
}
