//! Expense entity - A shared cost recorded by its creator.
//!
//! Expenses are write-once: they are created together with their participant
//! rows and never updated afterwards. Money is stored as integer cents; the
//! accessors on [`Model`] convert back to `Decimal`.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Expense database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    /// Unique identifier for the expense
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Total amount to split, in cents
    pub amount_cents: i64,
    /// Human-readable description of the expense
    pub description: String,
    /// User who recorded the expense
    pub created_by: i64,
    /// When the expense was recorded
    pub date_created: DateTimeUtc,
    /// Tax included in the amount, in cents; informational only
    pub tax_cents: i64,
}

/// Defines relationships between Expense and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each expense belongs to its creator
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Creator,
    /// One expense has many participant rows
    #[sea_orm(has_many = "super::expense_participant::Entity")]
    Participants,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Creator.def()
    }
}

impl Related<super::expense_participant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Total amount as a decimal currency value.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        crate::core::split::from_cents(self.amount_cents)
    }

    /// Tax as a decimal currency value.
    #[must_use]
    pub fn tax(&self) -> Decimal {
        crate::core::split::from_cents(self.tax_cents)
    }
}
