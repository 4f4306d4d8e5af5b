//! User entity - A person who can befriend others and share expenses.
//!
//! Users are identified by a unique `username` handle and a unique `email`,
//! which is how invitations address their recipient.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Unique handle shown to friends
    #[sea_orm(unique)]
    pub username: String,
    /// Unique email address used to address invitations
    #[sea_orm(unique)]
    pub email: String,
    /// When the user was created
    pub date_joined: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Expenses this user created
    #[sea_orm(has_many = "super::expense::Entity")]
    Expenses,
    /// Participant rows referencing this user
    #[sea_orm(has_many = "super::expense_participant::Entity")]
    ExpenseParticipants,
}

impl Related<super::expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl Related<super::expense_participant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseParticipants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
