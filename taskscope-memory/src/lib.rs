//! In-memory adapter for the `taskscope` library.
//!
//! Provides [`InMemoryLedger`], a thread-safe registration ledger that
//! implements both the [`RegistrationLedger`] capacity gate and the
//! [`TransactionSource`] lifecycle, so a scope can run transactionally
//! against it and roll back the whole group's registrations on failure.
//! Useful for tests and development; persistence is out of scope.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use taskscope::errors::{OperationError, PersistenceError, TransactionResult};
use taskscope::registration::{Attendee, EventSummary, Registration, RegistrationLedger};
use taskscope::result::OperationResult;
use taskscope::transaction::{Transaction, TransactionSource};
use taskscope::types::{EventId, RegistrationId};
use tracing::debug;

#[derive(Default)]
struct LedgerState {
    // Per-event registration lists; different events never contend beyond
    // the shared lock acquisition itself.
    registrations: HashMap<EventId, Vec<Registration>>,
    // Some(_) while a transaction is open; records what rollback must undo.
    journal: Option<Vec<(EventId, RegistrationId)>>,
    // Makes the next register attempt fail with a persistence error.
    fail_next_register: bool,
}

impl LedgerState {
    fn confirmed_count(&self, event_id: EventId) -> usize {
        self.registrations.get(&event_id).map_or(0, |entries| {
            entries
                .iter()
                .filter(|r| r.status.counts_toward_capacity())
                .count()
        })
    }
}

/// Thread-safe in-memory registration ledger.
///
/// The capacity check-and-append runs under one write lock, so the
/// confirmed count can never exceed an event's capacity no matter how many
/// units of work register concurrently: the (M+1)-th attempt always
/// observes a full event and yields a `NoCapacity` failure.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    inner: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `event` still has seats for another confirmed registration.
    pub fn has_available_capacity(&self, event: &EventSummary) -> bool {
        let state = self.inner.read();
        state.confirmed_count(event.id) < event.max_attendees.as_usize()
    }

    /// Makes the next `register` call fail with a persistence-class error.
    ///
    /// Fault-injection hook for exercising the rollback path in tests.
    pub fn fail_next_register(&self) {
        self.inner.write().fail_next_register = true;
    }
}

impl std::fmt::Debug for InMemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.read();
        f.debug_struct("InMemoryLedger")
            .field("events", &state.registrations.len())
            .field("transaction_open", &state.journal.is_some())
            .finish()
    }
}

#[async_trait]
impl RegistrationLedger for InMemoryLedger {
    async fn register(
        &self,
        event: &EventSummary,
        attendee: &Attendee,
    ) -> OperationResult<Registration> {
        let mut state = self.inner.write();

        if state.fail_next_register {
            state.fail_next_register = false;
            return OperationResult::Failure(OperationError::Persistence(
                PersistenceError::ConnectionFailed("injected ledger failure".to_string()),
            ));
        }

        // Check and append under the same write guard; this is the whole
        // capacity invariant.
        if state.confirmed_count(event.id) >= event.max_attendees.as_usize() {
            return OperationResult::Failure(OperationError::NoCapacity {
                event_id: event.id,
                max_attendees: event.max_attendees,
            });
        }

        let registration = Registration::confirmed(event.id, attendee.id);
        let LedgerState {
            registrations,
            journal,
            ..
        } = &mut *state;
        registrations
            .entry(event.id)
            .or_default()
            .push(registration.clone());
        if let Some(entries) = journal.as_mut() {
            entries.push((event.id, registration.id));
        }
        OperationResult::Success(registration)
    }

    async fn confirmed_count(&self, event_id: EventId) -> usize {
        self.inner.read().confirmed_count(event_id)
    }

    async fn registrations_for(&self, event_id: EventId) -> Vec<Registration> {
        self.inner
            .read()
            .registrations
            .get(&event_id)
            .cloned()
            .unwrap_or_default()
    }
}

/// The ledger's single journaling transaction handle.
///
/// While open, every registration recorded through the ledger is
/// journaled; rollback removes exactly the journaled registrations.
pub struct LedgerTransaction {
    inner: Arc<RwLock<LedgerState>>,
}

#[async_trait]
impl Transaction for LedgerTransaction {
    async fn commit(self: Box<Self>) -> TransactionResult<()> {
        let mut state = self.inner.write();
        let journaled = state.journal.take().map_or(0, |entries| entries.len());
        debug!(journaled, "ledger transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> TransactionResult<()> {
        let mut state = self.inner.write();
        if let Some(entries) = state.journal.take() {
            let undone = entries.len();
            for (event_id, registration_id) in entries {
                if let Some(registrations) = state.registrations.get_mut(&event_id) {
                    registrations.retain(|r| r.id != registration_id);
                }
            }
            debug!(undone, "ledger transaction rolled back");
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionSource for InMemoryLedger {
    async fn begin(&self) -> TransactionResult<Box<dyn Transaction>> {
        let mut state = self.inner.write();
        if state.journal.is_some() {
            return Err(PersistenceError::TransactionAlreadyActive);
        }
        state.journal = Some(Vec::new());
        Ok(Box::new(LedgerTransaction {
            inner: Arc::clone(&self.inner),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskscope::types::{AttendeeName, Capacity, EventName};

    fn event_with_capacity(capacity: u32) -> EventSummary {
        EventSummary::new(
            EventId::new(),
            EventName::try_new("Rock Night").unwrap(),
            Capacity::try_new(capacity).unwrap(),
        )
    }

    fn attendee(name: &str) -> Attendee {
        Attendee::new(AttendeeName::try_new(name).unwrap())
    }

    #[tokio::test]
    async fn registers_until_capacity_then_fails() {
        let ledger = InMemoryLedger::new();
        let event = event_with_capacity(2);

        assert!(ledger.register(&event, &attendee("A")).await.is_success());
        assert!(ledger.register(&event, &attendee("B")).await.is_success());

        let third = ledger.register(&event, &attendee("C")).await;
        match third {
            OperationResult::Failure(OperationError::NoCapacity {
                event_id,
                max_attendees,
            }) => {
                assert_eq!(event_id, event.id);
                assert_eq!(max_attendees, event.max_attendees);
            }
            other => panic!("expected NoCapacity, got {other:?}"),
        }
        assert_eq!(ledger.confirmed_count(event.id).await, 2);
    }

    #[tokio::test]
    async fn different_events_do_not_contend_for_capacity() {
        let ledger = InMemoryLedger::new();
        let first = event_with_capacity(1);
        let second = event_with_capacity(1);

        assert!(ledger.register(&first, &attendee("A")).await.is_success());
        assert!(ledger.register(&second, &attendee("B")).await.is_success());
        assert_eq!(ledger.confirmed_count(first.id).await, 1);
        assert_eq!(ledger.confirmed_count(second.id).await, 1);
    }

    #[tokio::test]
    async fn rollback_undoes_only_journaled_registrations() {
        let ledger = InMemoryLedger::new();
        let event = event_with_capacity(10);

        // Recorded outside any transaction; must survive rollback.
        assert!(ledger.register(&event, &attendee("A")).await.is_success());

        let transaction = ledger.begin().await.unwrap();
        assert!(ledger.register(&event, &attendee("B")).await.is_success());
        assert!(ledger.register(&event, &attendee("C")).await.is_success());
        transaction.rollback().await.unwrap();

        assert_eq!(ledger.confirmed_count(event.id).await, 1);
    }

    #[tokio::test]
    async fn commit_keeps_journaled_registrations() {
        let ledger = InMemoryLedger::new();
        let event = event_with_capacity(10);

        let transaction = ledger.begin().await.unwrap();
        assert!(ledger.register(&event, &attendee("A")).await.is_success());
        transaction.commit().await.unwrap();

        assert_eq!(ledger.confirmed_count(event.id).await, 1);
    }

    #[tokio::test]
    async fn only_one_transaction_may_be_open() {
        let ledger = InMemoryLedger::new();
        let _open = ledger.begin().await.unwrap();
        assert!(matches!(
            ledger.begin().await,
            Err(PersistenceError::TransactionAlreadyActive)
        ));
    }

    #[tokio::test]
    async fn injected_failure_is_persistence_class() {
        let ledger = InMemoryLedger::new();
        let event = event_with_capacity(5);
        ledger.fail_next_register();

        let result = ledger.register(&event, &attendee("A")).await;
        match result {
            OperationResult::Failure(error) => assert!(error.is_persistence()),
            OperationResult::Success(_) => panic!("expected injected failure"),
        }

        // The fault is one-shot.
        assert!(ledger.register(&event, &attendee("A")).await.is_success());
    }
}
