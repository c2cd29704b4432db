//! Transaction lifecycle management for operation groups.
//!
//! A [`TransactionManager`] owns at most one open transaction handle at a
//! time. The handle belongs to exactly one scope for the duration of one
//! operation group and is never shared across groups: every unit forked
//! into a transactional scope participates in the single shared
//! transaction, so rollback reverses the whole group's effects.
//!
//! The handle is passed explicitly (the manager travels inside the
//! [`crate::context::OperationContext`]) rather than living in ambient
//! per-thread state.

use crate::errors::{PersistenceError, TransactionResult};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// An open transaction handle.
///
/// Consuming methods make the terminal states unmistakable: a handle is
/// either committed or rolled back, exactly once.
#[async_trait]
pub trait Transaction: Send {
    /// Finalizes the transaction, making its effects permanent.
    async fn commit(self: Box<Self>) -> TransactionResult<()>;

    /// Reverses the transaction's effects.
    async fn rollback(self: Box<Self>) -> TransactionResult<()>;
}

/// A resource that can open transactions.
///
/// `begin` may fail with a resource-acquisition error; implementations that
/// admit only one transaction at a time report
/// [`PersistenceError::TransactionAlreadyActive`] on a second `begin`.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Opens a new transaction handle.
    async fn begin(&self) -> TransactionResult<Box<dyn Transaction>>;
}

/// Owns the begin/commit/rollback/close lifecycle for one transactional
/// resource.
///
/// # Lifecycle
///
/// - [`begin`](Self::begin) acquires the handle; it fails if the source
///   fails or a handle is already open.
/// - [`commit`](Self::commit) finalizes the open handle; calling it without
///   one is an error.
/// - [`rollback_if_active`](Self::rollback_if_active) is defensive: a no-op
///   without an open handle, and it swallows (logs) rollback failures. It
///   runs inside failure-handling paths that must not themselves fail.
/// - [`close`](Self::close) releases any open handle unconditionally by
///   rolling it back. Idempotent; safe to call on every exit path.
pub struct TransactionManager {
    source: Arc<dyn TransactionSource>,
    active: Mutex<Option<Box<dyn Transaction>>>,
}

impl TransactionManager {
    /// Creates a manager over the given transactional resource.
    pub fn new(source: Arc<dyn TransactionSource>) -> Self {
        Self {
            source,
            active: Mutex::new(None),
        }
    }

    /// Opens a transaction handle.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::TransactionAlreadyActive`] if a handle is
    /// already open, or whatever error the source reports.
    pub async fn begin(&self) -> TransactionResult<()> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            return Err(PersistenceError::TransactionAlreadyActive);
        }
        *active = Some(self.source.begin().await?);
        debug!("transaction opened");
        Ok(())
    }

    /// Commits the open transaction handle.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::NoActiveTransaction`] if `begin` did not
    /// succeed first, or whatever error the commit reports.
    pub async fn commit(&self) -> TransactionResult<()> {
        let handle = self.active.lock().await.take();
        match handle {
            Some(transaction) => {
                transaction.commit().await?;
                debug!("transaction committed");
                Ok(())
            }
            None => Err(PersistenceError::NoActiveTransaction),
        }
    }

    /// Rolls back the open handle if there is one; otherwise does nothing.
    ///
    /// Rollback failures are logged and swallowed. This method never
    /// returns an error: it runs inside failure paths that must not
    /// themselves fail.
    pub async fn rollback_if_active(&self) {
        let handle = self.active.lock().await.take();
        if let Some(transaction) = handle {
            match transaction.rollback().await {
                Ok(()) => debug!("transaction rolled back"),
                Err(error) => warn!(%error, "rollback failed; continuing"),
            }
        }
    }

    /// Releases any open handle unconditionally, rolling back uncommitted
    /// work. Idempotent; safe to call multiple times.
    pub async fn close(&self) {
        self.rollback_if_active().await;
    }

    /// Returns `true` while a transaction handle is open.
    pub async fn is_active(&self) -> bool {
        self.active.lock().await.is_some()
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct StubResource {
        begins: AtomicUsize,
        commits: AtomicUsize,
        rollbacks: AtomicUsize,
        fail_rollback: bool,
    }

    struct StubTransaction {
        resource: Arc<StubResource>,
    }

    #[async_trait]
    impl Transaction for StubTransaction {
        async fn commit(self: Box<Self>) -> TransactionResult<()> {
            self.resource.commits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> TransactionResult<()> {
            self.resource.rollbacks.fetch_add(1, Ordering::SeqCst);
            if self.resource.fail_rollback {
                return Err(PersistenceError::RollbackFailed("stub".to_string()));
            }
            Ok(())
        }
    }

    // Source whose transactions report back into the shared counters.
    struct CountingSource {
        resource: Arc<StubResource>,
    }

    #[async_trait]
    impl TransactionSource for CountingSource {
        async fn begin(&self) -> TransactionResult<Box<dyn Transaction>> {
            self.resource.begins.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(StubTransaction {
                resource: Arc::clone(&self.resource),
            }))
        }
    }

    fn manager_over(resource: &Arc<StubResource>) -> TransactionManager {
        TransactionManager::new(Arc::new(CountingSource {
            resource: Arc::clone(resource),
        }))
    }

    #[tokio::test]
    async fn begin_commit_runs_the_full_lifecycle() {
        let resource = Arc::new(StubResource::default());
        let manager = manager_over(&resource);

        manager.begin().await.unwrap();
        assert!(manager.is_active().await);
        manager.commit().await.unwrap();
        assert!(!manager.is_active().await);

        assert_eq!(resource.begins.load(Ordering::SeqCst), 1);
        assert_eq!(resource.commits.load(Ordering::SeqCst), 1);
        assert_eq!(resource.rollbacks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn second_begin_fails_while_a_handle_is_open() {
        let resource = Arc::new(StubResource::default());
        let manager = manager_over(&resource);

        manager.begin().await.unwrap();
        assert!(matches!(
            manager.begin().await,
            Err(PersistenceError::TransactionAlreadyActive)
        ));
    }

    #[tokio::test]
    async fn commit_without_begin_is_an_error() {
        let resource = Arc::new(StubResource::default());
        let manager = manager_over(&resource);

        assert!(matches!(
            manager.commit().await,
            Err(PersistenceError::NoActiveTransaction)
        ));
    }

    #[tokio::test]
    async fn rollback_if_active_is_a_noop_without_a_handle() {
        let resource = Arc::new(StubResource::default());
        let manager = manager_over(&resource);

        manager.rollback_if_active().await;
        assert_eq!(resource.rollbacks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rollback_if_active_swallows_rollback_failures() {
        let resource = Arc::new(StubResource {
            fail_rollback: true,
            ..StubResource::default()
        });
        let manager = manager_over(&resource);

        manager.begin().await.unwrap();
        // Must not panic or propagate the stubbed failure.
        manager.rollback_if_active().await;
        assert_eq!(resource.rollbacks.load(Ordering::SeqCst), 1);
        assert!(!manager.is_active().await);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_rolls_back_open_work() {
        let resource = Arc::new(StubResource::default());
        let manager = manager_over(&resource);

        manager.begin().await.unwrap();
        manager.close().await;
        manager.close().await;
        manager.close().await;

        assert_eq!(resource.rollbacks.load(Ordering::SeqCst), 1);
        assert!(!manager.is_active().await);
    }
}
