//! Core business logic - framework-agnostic friendship, splitting and balance operations.

/// Read models over the ledger: summaries and expense listings
pub mod balance;
/// Recording expenses and reading them back
pub mod expense;
/// Invitations and the friend relation
pub mod friendship;
/// Equal-split share computation and money conversion
pub mod split;
/// Minimal user directory
pub mod user;
