//! Expense business logic - Recording shared expenses and reading them back.
//!
//! An expense is written together with one participant row per participant
//! inside a single database transaction. Every participant other than the
//! creator must be a friend of the creator; the first one who is not aborts
//! the whole operation and nothing is persisted. Expenses are immutable once
//! created, so this module exposes no update or delete operations.

use crate::{
    core::{
        friendship::is_friend,
        split::{ParticipantSpec, split_equally, to_cents},
        user::require_user,
    },
    entities::{Expense, ExpenseParticipant, expense, expense_participant},
    errors::{Error, Result, trace_failure},
};
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// Input for [`create_expense`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewExpense {
    /// Total amount to split, strictly positive
    pub amount: Decimal,
    /// What the expense was for
    pub description: String,
    /// Tax included in the amount, zero when omitted
    #[serde(default)]
    pub tax: Decimal,
    /// Who shares the expense, optionally with up-front payments
    pub participants: Vec<ParticipantSpec>,
}

/// An expense together with its participant rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseDetails {
    /// The expense row
    #[serde(flatten)]
    pub expense: expense::Model,
    /// One row per participant, ordered by row id
    pub participants: Vec<expense_participant::Model>,
}

impl ExpenseDetails {
    /// Finds the participant row of `user_id`, if they take part.
    #[must_use]
    pub fn share_of(&self, user_id: i64) -> Option<&expense_participant::Model> {
        self.participants
            .iter()
            .find(|row| row.participant_id == user_id)
    }
}

/// Validates everything about a new expense that does not need the database.
/// Returns the trimmed description and the amount and tax in cents.
fn validate_new_expense(new_expense: &NewExpense) -> Result<(String, i64, i64)> {
    if new_expense.amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount {
            field: "amount",
            amount: new_expense.amount,
        });
    }
    let amount_cents = to_cents("amount", new_expense.amount)?;

    if new_expense.tax < Decimal::ZERO {
        return Err(Error::InvalidAmount {
            field: "tax",
            amount: new_expense.tax,
        });
    }
    let tax_cents = to_cents("tax", new_expense.tax)?;

    let description = new_expense.description.trim();
    if description.is_empty() {
        return Err(Error::Validation {
            field: "description",
            message: "must not be empty".to_string(),
        });
    }
    Ok((description.to_string(), amount_cents, tax_cents))
}

/// Records a new expense and splits it equally between its participants.
///
/// Input is validated before the database is touched. The creator may list
/// themselves as a participant; every other participant must exist and be a
/// friend of the creator, otherwise the call fails with
/// [`Error::UserNotFound`] or [`Error::NotAFriend`] and no rows are written.
///
/// # Arguments
/// * `creator_id` - The user recording (and owning) the expense
/// * `new_expense` - Amount, description, tax and participant list
#[instrument(
    skip(db, new_expense),
    fields(amount = %new_expense.amount, participants = new_expense.participants.len())
)]
pub async fn create_expense(
    db: &DatabaseConnection,
    creator_id: i64,
    new_expense: &NewExpense,
) -> Result<ExpenseDetails> {
    let result: Result<ExpenseDetails> = async {
        let (description, amount_cents, tax_cents) = validate_new_expense(new_expense)?;
        let shares = split_equally(new_expense.amount, &new_expense.participants)?;
        let rows = shares
            .iter()
            .map(|share| {
                Ok((
                    share.user_id,
                    to_cents("paid_share", share.paid_share)?,
                    to_cents("owes_share", share.owes_share)?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        // Use a transaction so the expense and its participant rows commit together
        let txn = db.begin().await?;

        require_user(&txn, creator_id).await?;
        for &(participant_id, _, _) in &rows {
            if participant_id == creator_id {
                continue;
            }
            require_user(&txn, participant_id).await?;
            if !is_friend(&txn, creator_id, participant_id).await? {
                return Err(Error::NotAFriend {
                    creator_id,
                    participant_id,
                });
            }
        }

        let expense = expense::ActiveModel {
            amount_cents: Set(amount_cents),
            description: Set(description),
            created_by: Set(creator_id),
            date_created: Set(chrono::Utc::now()),
            tax_cents: Set(tax_cents),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut participants = Vec::with_capacity(rows.len());
        for (participant_id, paid_share_cents, owes_share_cents) in rows {
            let row = expense_participant::ActiveModel {
                expense_id: Set(expense.id),
                participant_id: Set(participant_id),
                paid_share_cents: Set(paid_share_cents),
                owes_share_cents: Set(owes_share_cents),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            participants.push(row);
        }

        txn.commit().await?;

        Ok(ExpenseDetails {
            expense,
            participants,
        })
    }
    .await;

    let details = result.inspect_err(trace_failure)?;
    info!(expense_id = details.expense.id, "Expense created");
    Ok(details)
}

/// Loads the expenses matching `filter` with their participant rows, newest first.
pub(crate) async fn load_expense_details<C>(
    db: &C,
    filter: Condition,
) -> Result<Vec<ExpenseDetails>>
where
    C: ConnectionTrait,
{
    let expenses = Expense::find()
        .filter(filter)
        .order_by_desc(expense::Column::DateCreated)
        .order_by_desc(expense::Column::Id)
        .all(db)
        .await?;
    if expenses.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = expenses.iter().map(|e| e.id).collect();
    let mut rows_by_expense: BTreeMap<i64, Vec<expense_participant::Model>> = BTreeMap::new();
    for row in ExpenseParticipant::find()
        .filter(expense_participant::Column::ExpenseId.is_in(ids))
        .order_by_asc(expense_participant::Column::Id)
        .all(db)
        .await?
    {
        rows_by_expense.entry(row.expense_id).or_default().push(row);
    }

    Ok(expenses
        .into_iter()
        .map(|expense| ExpenseDetails {
            participants: rows_by_expense.remove(&expense.id).unwrap_or_default(),
            expense,
        })
        .collect())
}

/// Ids of every expense `user_id` participates in.
pub(crate) async fn participated_expense_ids<C>(db: &C, user_id: i64) -> Result<Vec<i64>>
where
    C: ConnectionTrait,
{
    let rows = ExpenseParticipant::find()
        .filter(expense_participant::Column::ParticipantId.eq(user_id))
        .all(db)
        .await?;
    let mut ids: Vec<i64> = rows.into_iter().map(|row| row.expense_id).collect();
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}

/// Retrieves a single expense with its participant rows.
#[instrument(skip(db))]
pub async fn get_expense(db: &DatabaseConnection, expense_id: i64) -> Result<ExpenseDetails> {
    let result: Result<ExpenseDetails> = async {
        load_expense_details(db, Condition::all().add(expense::Column::Id.eq(expense_id)))
            .await?
            .pop()
            .ok_or(Error::ExpenseNotFound { expense_id })
    }
    .await;
    result.inspect_err(trace_failure)
}

/// Retrieves the expenses a user created, newest first.
#[instrument(skip(db))]
pub async fn list_created_expenses(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<ExpenseDetails>> {
    let result: Result<Vec<ExpenseDetails>> = async {
        require_user(db, user_id).await?;
        load_expense_details(db, Condition::all().add(expense::Column::CreatedBy.eq(user_id)))
            .await
    }
    .await;
    result.inspect_err(trace_failure)
}
