//! The structured concurrent operation scope.
//!
//! An [`OperationScope`] owns a cohort of concurrently-executing units of
//! work. Each unit is forked as an independent task and reports an
//! [`OperationResult`] through a typed completion channel; `join` drives
//! every completion, in completion order, into the caller-supplied
//! [`CompletionHandler`].
//!
//! The concurrency contract is "first failure cancels siblings": the first
//! failing unit triggers rollback (when the context is transactional and
//! the error is persistence-class), notifies the handler, and asks the
//! remaining units to stop. Cancellation is cooperative - in-flight units
//! receive a [`CancellationSignal`] and may observe it or run to
//! completion, but a result produced after shutdown was requested is
//! discarded without notification.
//!
//! A scope is a single-use orchestrator for one all-or-nothing-notify
//! group. It never retries; retry policy is a caller concern layered above
//! `fork`.

use crate::completion::CompletionHandler;
use crate::context::OperationContext;
use crate::errors::{OperationError, ScopeError, ScopeResult};
use crate::result::OperationResult;
use crate::types::OperationName;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::debug;

/// A cooperative stop request handed to every forked unit of work.
///
/// Units that mutate shared state should check the signal at safe points;
/// units that ignore it may run to completion, but their results are
/// discarded once shutdown has been requested.
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    receiver: watch::Receiver<bool>,
}

impl CancellationSignal {
    /// Returns `true` once scope shutdown has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Suspends until shutdown is requested (or the scope is gone).
    pub async fn cancelled(&mut self) {
        // wait_for errs only when the scope side is dropped, which also
        // means the unit should stop.
        let _ = self.receiver.wait_for(|cancelled| *cancelled).await;
    }
}

/// What `join` observed, for callers that want an outcome without going
/// through the handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinSummary {
    /// Units whose success was delivered to the handler.
    pub successes: usize,
    /// Units whose failure was delivered to the handler.
    pub failures: usize,
    /// Units that completed after shutdown was requested; their results
    /// were dropped without notification.
    pub discarded: usize,
    /// Whether the scope shut down (first failure or an explicit request).
    pub shut_down: bool,
}

/// A bounded group of concurrently-forked units of work reporting through
/// a typed result channel.
///
/// # Example
///
/// ```rust,ignore
/// let mut scope = OperationScope::new(
///     OperationName::try_new("register-attendees")?,
///     OperationContext::NonTransactional,
///     handler,
/// );
/// scope.fork(|_signal| async move { ledger.register(&event, &attendee).await })?;
/// let summary = scope.join().await;
/// ```
pub struct OperationScope<T> {
    name: OperationName,
    context: OperationContext,
    handler: Box<dyn CompletionHandler<T>>,
    tasks: JoinSet<(OperationResult<T>, bool)>,
    shutdown_tx: watch::Sender<bool>,
    // Held so a shutdown request always has a live receiver.
    shutdown_rx: watch::Receiver<bool>,
}

impl<T: Send + 'static> OperationScope<T> {
    /// Opens a scope for one operation group.
    pub fn new(
        name: OperationName,
        context: OperationContext,
        handler: impl CompletionHandler<T> + 'static,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            name,
            context,
            handler: Box::new(handler),
            tasks: JoinSet::new(),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// The context this scope was opened with.
    pub const fn context(&self) -> &OperationContext {
        &self.context
    }

    /// Schedules a unit of work to run concurrently with the caller.
    ///
    /// Never blocks. The unit receives a [`CancellationSignal`] it may
    /// observe; the scope samples the signal at the moment the unit
    /// returns so late completions can be discarded.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::ShutdownRequested`] once shutdown has been
    /// requested; no new work is admitted after that point.
    pub fn fork<F, Fut>(&mut self, unit: F) -> ScopeResult<()>
    where
        F: FnOnce(CancellationSignal) -> Fut + Send + 'static,
        Fut: Future<Output = OperationResult<T>> + Send + 'static,
    {
        if *self.shutdown_rx.borrow() {
            return Err(ScopeError::ShutdownRequested);
        }
        let signal = CancellationSignal {
            receiver: self.shutdown_tx.subscribe(),
        };
        let shutdown_probe = self.shutdown_tx.subscribe();
        self.tasks.spawn(async move {
            let outcome = AssertUnwindSafe(unit(signal)).catch_unwind().await;
            // Sampled when the work has actually returned: completions are
            // classified as before or after the shutdown request.
            let after_shutdown = *shutdown_probe.borrow();
            let result = match outcome {
                Ok(result) => result,
                Err(panic) => {
                    OperationResult::Failure(OperationError::Panicked(panic_message(&*panic)))
                }
            };
            (result, after_shutdown)
        });
        Ok(())
    }

    /// Asks the whole group to stop without recording a failure.
    ///
    /// Units still in flight observe the cancellation signal; completions
    /// from this point on are discarded without notification, and further
    /// forks are rejected.
    pub fn request_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Waits for the group to conclude, driving completions into the
    /// handler.
    ///
    /// Blocks the calling control flow until all forked units have
    /// completed, or - after shutdown - until in-flight units have had the
    /// chance to observe cancellation and stop. For every unit that
    /// completed before shutdown was requested, exactly one terminal
    /// notification is delivered, in completion order. The first failure
    /// triggers rollback (transactional context, persistence-class error
    /// only), requests cancellation of the remaining units, and suppresses
    /// notification of anything completing afterward.
    pub async fn join(mut self) -> JoinSummary {
        let mut summary = JoinSummary::default();
        let mut should_shutdown = *self.shutdown_rx.borrow();

        while let Some(joined) = self.tasks.join_next().await {
            // JoinError can only mean an aborted task here; unit panics are
            // captured inside the task wrapper.
            let Ok((result, after_shutdown)) = joined else {
                summary.discarded += 1;
                continue;
            };
            if after_shutdown {
                summary.discarded += 1;
                continue;
            }
            match result {
                OperationResult::Success(value) => {
                    self.handler.on_success(&value);
                    summary.successes += 1;
                }
                OperationResult::Failure(error) => {
                    if error.is_persistence() {
                        if let OperationContext::Transactional(manager) = &self.context {
                            manager.rollback_if_active().await;
                        }
                    }
                    self.handler.on_failure(&error);
                    summary.failures += 1;
                    if !should_shutdown {
                        should_shutdown = true;
                        debug!(
                            scope = %self.name,
                            %error,
                            "first failure; cancelling sibling units"
                        );
                        let _ = self.shutdown_tx.send(true);
                    }
                }
            }
        }

        if should_shutdown {
            self.handler.on_shutdown();
        }
        summary.shut_down = should_shutdown;
        debug!(
            scope = %self.name,
            successes = summary.successes,
            failures = summary.failures,
            discarded = summary.discarded,
            "scope concluded"
        );
        summary
    }
}

impl<T> std::fmt::Debug for OperationScope<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationScope")
            .field("name", &self.name)
            .field("context", &self.context)
            .field("in_flight", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unit of work panicked".to_string()
    }
}
