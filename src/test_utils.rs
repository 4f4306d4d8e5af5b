//! Shared test utilities.
//!
//! This module provides common helper functions for setting up test databases
//! and creating users, friendships and expenses with sensible defaults.

use crate::{
    core::{
        expense::{self, ExpenseDetails, NewExpense},
        friendship,
        split::ParticipantSpec,
        user,
    },
    entities,
    errors::Result,
};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test user named `name` with the email `<name>@example.com`.
pub async fn create_test_user(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::user::Model> {
    user::create_user(db, name, &format!("{name}@example.com")).await
}

/// Makes two users friends through the invitation handshake.
pub async fn make_friends(
    db: &DatabaseConnection,
    from: &entities::user::Model,
    to: &entities::user::Model,
) -> Result<()> {
    let invitation = friendship::send_invitation(db, from.id, &to.email).await?;
    friendship::accept_invitation(db, invitation.id, to.id, true).await?;
    Ok(())
}

/// Creates an expense with no up-front payments.
///
/// # Defaults
/// * `description`: `"Test expense"`
/// * `tax`: zero
pub async fn create_test_expense(
    db: &DatabaseConnection,
    creator: &entities::user::Model,
    amount: Decimal,
    participant_ids: &[i64],
) -> Result<ExpenseDetails> {
    expense::create_expense(
        db,
        creator.id,
        &NewExpense {
            amount,
            description: "Test expense".to_string(),
            tax: Decimal::ZERO,
            participants: participant_ids.iter().copied().map(ParticipantSpec::new).collect(),
        },
    )
    .await
}

/// Sets up a database with two users, alice and bob, who are friends.
/// Returns (db, alice, bob) for common test scenarios.
pub async fn setup_with_friends() -> Result<(
    DatabaseConnection,
    entities::user::Model,
    entities::user::Model,
)> {
    let db = setup_test_db().await?;
    let alice = create_test_user(&db, "alice").await?;
    let bob = create_test_user(&db, "bob").await?;
    make_friends(&db, &alice, &bob).await?;
    Ok((db, alice, bob))
}
