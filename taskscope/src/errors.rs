//! Error types for `TaskScope`.
//!
//! The error design follows a small taxonomy:
//!
//! - **Persistence errors** are the only class that triggers transactional
//!   rollback. They indicate resource-layer trouble (connections, handles).
//! - **Domain validation errors** (no capacity, invalid fields) flow through
//!   the normal result channel as [`crate::result::OperationResult::Failure`]
//!   values and never surface as panics once past construction.
//! - **Contract violations** (blank names, zero capacity) fail fast at the
//!   smart constructors in [`crate::types`] and are not representable here.

use crate::types::{Capacity, EventId};
use thiserror::Error;

/// Errors carried by a failed unit of work.
///
/// `OperationError` is what a unit of work reports through the result
/// channel when it cannot produce its value. The scope inspects the class
/// of the error (via [`OperationError::is_persistence`]) to decide whether
/// rollback is warranted before the completion handler is notified.
#[derive(Debug, Clone, Error)]
pub enum OperationError {
    /// A domain validation rule was violated.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The event is already at capacity; the registration was not recorded.
    #[error("event {event_id} is at capacity ({max_attendees} attendees)")]
    NoCapacity {
        /// The event that has no remaining capacity.
        event_id: EventId,
        /// The capacity that was reached.
        max_attendees: Capacity,
    },

    /// A persistence-layer error occurred. When the scope runs under a
    /// transactional context, this class of error triggers rollback before
    /// the failure is reported.
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// The unit of work terminated abnormally instead of returning a result.
    #[error("unit of work panicked: {0}")]
    Panicked(String),
}

impl OperationError {
    /// Returns `true` for errors in the persistence class, the only class
    /// that triggers rollback when the context is transactional.
    pub const fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

/// Errors raised by transactional resources.
///
/// These are deliberately `Clone` (string payloads rather than source
/// errors) so they can travel inside [`OperationError`] through the
/// result channel.
#[derive(Debug, Clone, Error)]
pub enum PersistenceError {
    /// The connection to the backing resource could not be acquired.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// `begin` was called while a transaction handle was already open.
    #[error("a transaction is already active for this resource")]
    TransactionAlreadyActive,

    /// `commit` was called with no open transaction handle.
    #[error("no transaction is active")]
    NoActiveTransaction,

    /// Rolling back the open handle failed. Swallowed (and logged) by
    /// [`crate::transaction::TransactionManager::rollback_if_active`].
    #[error("rollback failed: {0}")]
    RollbackFailed(String),

    /// The backing resource reported an error.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors raised by the scope itself, as opposed to its units of work.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// The scope has begun shutting down; new forks are rejected.
    #[error("scope is shutting down; new units of work are rejected")]
    ShutdownRequested,
}

/// Result alias for transaction lifecycle operations.
pub type TransactionResult<T> = Result<T, PersistenceError>;

/// Result alias for scope operations such as `fork`.
pub type ScopeResult<T> = Result<T, ScopeError>;
