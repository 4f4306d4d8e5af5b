//! Friendship entity - A directed friend edge.
//!
//! Accepting an invitation inserts the edge in both directions, so the
//! friend relation is the symmetric closure of these rows. The composite
//! primary key keeps each directed edge unique.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Friend edge database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "friendships")]
pub struct Model {
    /// User whose friend set this edge belongs to
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    /// The friend
    #[sea_orm(primary_key, auto_increment = false)]
    pub friend_id: i64,
    /// When the edge was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Friendship and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Owner of the edge
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    /// Target of the edge
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::FriendId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Friend,
}

impl ActiveModelBehavior for ActiveModel {}
