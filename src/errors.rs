//! Unified error type for the ledger.
//!
//! Every failure a core operation can produce is a named variant. Callers that
//! need to map errors onto a transport (status codes, retry policy) should use
//! [`Error::kind`] rather than matching every variant.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, error};

/// Coarse classification of [`Error`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input, rejected before any write.
    Validation,
    /// The actor is not allowed to perform the operation.
    Authorization,
    /// The request clashes with existing state; nothing was changed.
    Conflict,
    /// A referenced user, invitation or expense does not exist.
    NotFound,
    /// Storage or environment failure. The effect of the operation is unknown.
    Internal,
}

/// Errors produced by ledger operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid amount for {field}: {amount}")]
    InvalidAmount { field: &'static str, amount: Decimal },

    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Invalid participant set: {reason}")]
    InvalidParticipantSet { reason: String },

    #[error("Invitations can only be accepted, not declined")]
    InvalidAcceptValue,

    #[error("You cannot send an invitation to yourself")]
    SelfInvitation,

    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("User {participant_id} is not a friend of user {creator_id}")]
    NotAFriend { creator_id: i64, participant_id: i64 },

    #[error("A pending invitation already exists between users {from_user_id} and {to_user_id}")]
    DuplicateInvitation { from_user_id: i64, to_user_id: i64 },

    #[error("Users {user_id} and {other_id} are already friends")]
    AlreadyFriends { user_id: i64, other_id: i64 },

    #[error("Invitation {invitation_id} has already been accepted")]
    AlreadyResolved { invitation_id: i64 },

    #[error("A user with this {field} already exists")]
    UserExists { field: &'static str },

    #[error("User not found: {identifier}")]
    UserNotFound { identifier: String },

    #[error("Invitation not found: {invitation_id}")]
    InvitationNotFound { invitation_id: i64 },

    #[error("Expense not found: {expense_id}")]
    ExpenseNotFound { expense_id: i64 },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl Error {
    /// Classifies this error for callers that only need the category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount { .. }
            | Self::Validation { .. }
            | Self::InvalidParticipantSet { .. }
            | Self::InvalidAcceptValue
            | Self::SelfInvitation => ErrorKind::Validation,
            Self::Unauthorized { .. } | Self::NotAFriend { .. } => ErrorKind::Authorization,
            Self::DuplicateInvitation { .. }
            | Self::AlreadyFriends { .. }
            | Self::AlreadyResolved { .. }
            | Self::UserExists { .. } => ErrorKind::Conflict,
            Self::UserNotFound { .. }
            | Self::InvitationNotFound { .. }
            | Self::ExpenseNotFound { .. } => ErrorKind::NotFound,
            Self::Config { .. } | Self::Database(_) => ErrorKind::Internal,
        }
    }

    /// Message that is safe to hand to an external client.
    ///
    /// Internal errors collapse into a generic message so storage details never
    /// leave the process; the full error is logged instead.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "An internal error occurred".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Logs a failed operation inside the caller's span.
///
/// Storage failures are logged at `error` so the span fields (operation,
/// actor and target ids) are enough to reconstruct intent during recovery.
/// Rejected business rules are routine and only logged at `debug`.
pub(crate) fn trace_failure(err: &Error) {
    if err.kind() == ErrorKind::Internal {
        error!(error = %err, "operation failed on storage");
    } else {
        debug!(error = %err, kind = ?err.kind(), "operation rejected");
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
