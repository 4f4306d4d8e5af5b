//! Invitation entity - A friend request from one user to another.
//!
//! An invitation starts pending (`is_accepted == false`) and may be accepted
//! exactly once by its recipient. The schema bootstrap adds a partial unique
//! index so at most one pending invitation exists per ordered pair.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Invitation database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invitations")]
pub struct Model {
    /// Unique identifier for the invitation
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who sent the invitation
    pub from_user_id: i64,
    /// User who may accept the invitation
    pub to_user_id: i64,
    /// Terminal flag, set once when the recipient accepts
    pub is_accepted: bool,
    /// When the invitation was sent
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Invitation and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Sender of the invitation
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::FromUserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    FromUser,
    /// Recipient of the invitation
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ToUserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    ToUser,
}

impl ActiveModelBehavior for ActiveModel {}
