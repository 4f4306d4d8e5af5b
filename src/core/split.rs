//! Equal-split policy - Pure share computation for new expenses.
//!
//! Every participant is assigned the same share of the amount, computed in
//! decimal arithmetic and quantized to the currency unit. A participant's
//! up-front payment is credited against their share, so
//! `paid_share + owes_share == equal_share` for every row. Residual cents are
//! not redistributed: splitting 100.00 three ways yields 33.33 each.

use crate::errors::{Error, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Number of fractional digits in stored money values.
pub const CURRENCY_SCALE: u32 = 2;

/// Maximum number of significant digits in stored money values.
pub const MONEY_PRECISION: u32 = 10;

/// One requested participant of a new expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSpec {
    /// The participant
    pub user_id: i64,
    /// What the participant paid up front, zero when omitted
    #[serde(default)]
    pub paid_share: Decimal,
}

impl ParticipantSpec {
    /// A participant who has not paid anything yet.
    #[must_use]
    pub const fn new(user_id: i64) -> Self {
        Self {
            user_id,
            paid_share: Decimal::ZERO,
        }
    }

    /// Sets the up-front payment.
    #[must_use]
    pub const fn with_paid_share(mut self, paid_share: Decimal) -> Self {
        self.paid_share = paid_share;
        self
    }
}

/// The computed share of one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Share {
    /// The participant
    pub user_id: i64,
    /// Amount paid up front
    pub paid_share: Decimal,
    /// Amount still owed; negative when the participant overpaid
    pub owes_share: Decimal,
}

/// Checks that a value fits a decimal(10,2) column.
pub fn validate_money(field: &'static str, amount: Decimal) -> Result<()> {
    if amount.normalize().scale() > CURRENCY_SCALE {
        return Err(Error::Validation {
            field,
            message: format!("{amount} has more than {CURRENCY_SCALE} decimal places"),
        });
    }
    let limit = Decimal::from(10_i64.pow(MONEY_PRECISION - CURRENCY_SCALE));
    if amount.abs() >= limit {
        return Err(Error::Validation {
            field,
            message: format!("{amount} exceeds {MONEY_PRECISION} digits"),
        });
    }
    Ok(())
}

/// Converts a validated money value into integer cents for storage.
pub fn to_cents(field: &'static str, amount: Decimal) -> Result<i64> {
    validate_money(field, amount)?;
    let mut scaled = amount;
    scaled.rescale(CURRENCY_SCALE);
    i64::try_from(scaled.mantissa()).map_err(|_| Error::InvalidAmount { field, amount })
}

/// Converts stored integer cents back into a money value.
#[must_use]
pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, CURRENCY_SCALE)
}

/// Computes `amount / participant_count`, quantized to the currency unit.
pub fn equal_share(amount: Decimal, participant_count: usize) -> Result<Decimal> {
    if participant_count == 0 {
        return Err(Error::InvalidParticipantSet {
            reason: "an expense needs at least one participant".to_string(),
        });
    }
    let share = amount / Decimal::from(participant_count);
    Ok(share.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointNearestEven))
}

/// Splits `amount` equally between `participants`, crediting each up-front payment.
///
/// Rejects an empty participant list, the same user listed twice, and paid
/// shares that are negative or not representable as money. `owes_share` is not
/// clamped, so a participant who paid more than their share ends up with a
/// negative `owes_share`.
pub fn split_equally(amount: Decimal, participants: &[ParticipantSpec]) -> Result<Vec<Share>> {
    let share = equal_share(amount, participants.len())?;

    let mut seen = HashSet::with_capacity(participants.len());
    for spec in participants {
        if !seen.insert(spec.user_id) {
            return Err(Error::InvalidParticipantSet {
                reason: format!("user {} is listed more than once", spec.user_id),
            });
        }
        if spec.paid_share < Decimal::ZERO {
            return Err(Error::InvalidAmount {
                field: "paid_share",
                amount: spec.paid_share,
            });
        }
        validate_money("paid_share", spec.paid_share)?;
    }

    Ok(participants
        .iter()
        .map(|spec| Share {
            user_id: spec.user_id,
            paid_share: spec.paid_share,
            owes_share: share - spec.paid_share,
        })
        .collect())
}
