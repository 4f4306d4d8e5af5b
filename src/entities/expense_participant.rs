//! Expense participant entity - One user's share of an expense.
//!
//! `paid_share` is what the participant contributed up front and
//! `owes_share` is the equal share minus that contribution. Rows are deleted
//! together with their expense.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Expense participant database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "expense_participants")]
pub struct Model {
    /// Unique identifier for the row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Expense this share belongs to
    pub expense_id: i64,
    /// User assigned the share
    pub participant_id: i64,
    /// Amount the participant paid at creation time, in cents
    pub paid_share_cents: i64,
    /// Amount the participant still owes, in cents; negative when they overpaid
    pub owes_share_cents: i64,
}

/// Defines relationships between `ExpenseParticipant` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each row belongs to one expense
    #[sea_orm(
        belongs_to = "super::expense::Entity",
        from = "Column::ExpenseId",
        to = "super::expense::Column::Id",
        on_delete = "Cascade"
    )]
    Expense,
    /// Each row references one participant
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ParticipantId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Participant,
}

impl Related<super::expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expense.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Up-front payment as a decimal currency value.
    #[must_use]
    pub fn paid_share(&self) -> Decimal {
        crate::core::split::from_cents(self.paid_share_cents)
    }

    /// Outstanding share as a decimal currency value.
    #[must_use]
    pub fn owes_share(&self) -> Decimal {
        crate::core::split::from_cents(self.owes_share_cents)
    }
}
