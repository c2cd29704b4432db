//! The transactional marker chosen once per scope.

use crate::transaction::TransactionManager;
use std::sync::Arc;

/// Whether an operation group runs under a transaction.
///
/// Chosen once at scope construction and immutable for the scope's
/// lifetime. In the `Transactional` variant the manager belongs to this
/// one group: it must not be shared with another scope, though the caller
/// keeps a clone of the `Arc` so it can `commit` or `close` after `join`.
#[derive(Clone)]
pub enum OperationContext {
    /// The group participates in a single shared transaction. A
    /// persistence-class failure anywhere in the group triggers
    /// [`TransactionManager::rollback_if_active`] before the failure is
    /// reported.
    Transactional(Arc<TransactionManager>),
    /// The group runs without transactional protection; cancelled units'
    /// partial effects are not undone.
    NonTransactional,
}

impl OperationContext {
    /// Returns `true` for the `Transactional` variant.
    pub const fn is_transactional(&self) -> bool {
        matches!(self, Self::Transactional(_))
    }

    /// Returns the transaction manager, if the context is transactional.
    pub const fn transaction_manager(&self) -> Option<&Arc<TransactionManager>> {
        match self {
            Self::Transactional(manager) => Some(manager),
            Self::NonTransactional => None,
        }
    }
}

impl std::fmt::Debug for OperationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transactional(_) => f.write_str("OperationContext::Transactional"),
            Self::NonTransactional => f.write_str("OperationContext::NonTransactional"),
        }
    }
}
