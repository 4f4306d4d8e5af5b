//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod expense;
pub mod expense_participant;
pub mod friendship;
pub mod invitation;
pub mod user;

// Re-export specific types to avoid conflicts
pub use expense::{Column as ExpenseColumn, Entity as Expense, Model as ExpenseModel};
pub use expense_participant::{
    Column as ExpenseParticipantColumn, Entity as ExpenseParticipant,
    Model as ExpenseParticipantModel,
};
pub use friendship::{Column as FriendshipColumn, Entity as Friendship, Model as FriendshipModel};
pub use invitation::{Column as InvitationColumn, Entity as Invitation, Model as InvitationModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
