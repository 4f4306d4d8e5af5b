//! Balance aggregation - Read models over the expense ledger.
//!
//! Every function here reads inside one database transaction, so all the
//! numbers in a response come from the same snapshot of the ledger. Sums are
//! computed on integer cents and start from zero, so a user without any rows
//! gets zero totals rather than missing values.
//!
//! The "owed to me" figure is the sum of `paid_share` over the rows of
//! expenses the user created, while "owed" sums `owes_share` over the user's
//! own rows. The two definitions are intentionally not mirror images of each
//! other; they are kept as the product defines them.

use crate::{
    core::{
        expense::{ExpenseDetails, load_expense_details, participated_expense_ids},
        friendship::list_friends,
        split::from_cents,
        user::require_user,
    },
    entities::{ExpenseParticipant, expense, expense_participant, user},
    errors::{Result, trace_failure},
};
use sea_orm::{Condition, TransactionTrait, prelude::*};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// How much one participant owes on the expenses a user created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FriendBalance {
    /// The participant
    pub participant_id: i64,
    /// Sum of their positive `owes_share` values
    pub total: Decimal,
}

/// Balance figures for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    /// The user the figures are for
    pub user_id: i64,
    /// Sum of `owes_share` over the user's participant rows
    pub total_owed: Decimal,
    /// Sum of `paid_share` over rows of expenses the user created
    pub total_owed_to_me: Decimal,
    /// `total_owed_to_me - total_owed`
    pub net_balance: Decimal,
    /// Positive `owes_share` on the user's expenses, grouped by participant
    pub friends_owed_to_me: Vec<FriendBalance>,
}

/// A user's expenses together with their balance figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MyExpenses {
    /// Expenses the user created or takes part in, newest first
    pub expenses: Vec<ExpenseDetails>,
    /// Balance figures over the same snapshot
    #[serde(flatten)]
    pub summary: UserSummary,
}

/// The expenses one friend takes part in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FriendExpenses {
    /// The friend
    pub friend: user::Model,
    /// Every expense the friend participates in, newest first
    pub expenses: Vec<ExpenseDetails>,
}

/// Folds ledger rows into a [`UserSummary`].
///
/// # Arguments
/// * `user_id` - The user being summarised
/// * `own_rows` - Participant rows where the user is the participant
/// * `created_rows` - Participant rows of expenses the user created
#[must_use]
pub fn summarize(
    user_id: i64,
    own_rows: &[expense_participant::Model],
    created_rows: &[expense_participant::Model],
) -> UserSummary {
    let total_owed: i64 = own_rows.iter().map(|row| row.owes_share_cents).sum();
    let total_owed_to_me: i64 = created_rows.iter().map(|row| row.paid_share_cents).sum();

    let mut by_participant: BTreeMap<i64, i64> = BTreeMap::new();
    for row in created_rows.iter().filter(|row| row.owes_share_cents > 0) {
        *by_participant.entry(row.participant_id).or_default() += row.owes_share_cents;
    }

    UserSummary {
        user_id,
        total_owed: from_cents(total_owed),
        total_owed_to_me: from_cents(total_owed_to_me),
        net_balance: from_cents(total_owed_to_me - total_owed),
        friends_owed_to_me: by_participant
            .into_iter()
            .map(|(participant_id, total)| FriendBalance {
                participant_id,
                total: from_cents(total),
            })
            .collect(),
    }
}

async fn summary_in<C>(db: &C, user_id: i64) -> Result<UserSummary>
where
    C: ConnectionTrait,
{
    let own_rows = ExpenseParticipant::find()
        .filter(expense_participant::Column::ParticipantId.eq(user_id))
        .all(db)
        .await?;
    let created_rows = ExpenseParticipant::find()
        .inner_join(crate::entities::Expense)
        .filter(expense::Column::CreatedBy.eq(user_id))
        .all(db)
        .await?;
    Ok(summarize(user_id, &own_rows, &created_rows))
}

async fn user_expenses_in<C>(db: &C, user_id: i64) -> Result<Vec<ExpenseDetails>>
where
    C: ConnectionTrait,
{
    let participated = participated_expense_ids(db, user_id).await?;
    load_expense_details(
        db,
        Condition::any()
            .add(expense::Column::CreatedBy.eq(user_id))
            .add(expense::Column::Id.is_in(participated)),
    )
    .await
}

/// Computes the balance figures of a user.
#[instrument(skip(db))]
pub async fn compute_user_summary(db: &DatabaseConnection, user_id: i64) -> Result<UserSummary> {
    let result: Result<UserSummary> = async {
        let txn = db.begin().await?;
        require_user(&txn, user_id).await?;
        let summary = summary_in(&txn, user_id).await?;
        txn.commit().await?;
        Ok(summary)
    }
    .await;
    result.inspect_err(trace_failure)
}

/// Lists every expense the user created or participates in, newest first.
///
/// An expense the user both created and takes part in is listed once.
#[instrument(skip(db))]
pub async fn list_user_expenses(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<ExpenseDetails>> {
    let result: Result<Vec<ExpenseDetails>> = async {
        let txn = db.begin().await?;
        require_user(&txn, user_id).await?;
        let expenses = user_expenses_in(&txn, user_id).await?;
        txn.commit().await?;
        Ok(expenses)
    }
    .await;
    result.inspect_err(trace_failure)
}

/// Lists the user's expenses together with their balance figures.
#[instrument(skip(db))]
pub async fn list_my_expenses(db: &DatabaseConnection, user_id: i64) -> Result<MyExpenses> {
    let result: Result<MyExpenses> = async {
        let txn = db.begin().await?;
        require_user(&txn, user_id).await?;
        let expenses = user_expenses_in(&txn, user_id).await?;
        let summary = summary_in(&txn, user_id).await?;
        txn.commit().await?;
        debug!(expenses = expenses.len(), net_balance = %summary.net_balance, "Loaded expenses");
        Ok(MyExpenses { expenses, summary })
    }
    .await;
    result.inspect_err(trace_failure)
}

/// Lists, for each friend of the user, every expense that friend takes part in.
///
/// The lists are not restricted to expenses the user shares with the friend.
#[instrument(skip(db))]
pub async fn list_friend_expenses(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<FriendExpenses>> {
    let result: Result<Vec<FriendExpenses>> = async {
        let txn = db.begin().await?;
        let friends = list_friends(&txn, user_id).await?;

        let mut out = Vec::with_capacity(friends.len());
        for friend in friends {
            let ids = participated_expense_ids(&txn, friend.id).await?;
            let expenses = if ids.is_empty() {
                Vec::new()
            } else {
                load_expense_details(&txn, Condition::all().add(expense::Column::Id.is_in(ids)))
                    .await?
            };
            out.push(FriendExpenses { friend, expenses });
        }

        txn.commit().await?;
        Ok(out)
    }
    .await;
    result.inspect_err(trace_failure)
}
