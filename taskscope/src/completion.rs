//! Completion handlers: the capability a caller supplies to be notified of
//! a scope's outcome.
//!
//! A handler is a capability value, not a mutable entity. Handlers compose
//! via sequential chaining ([`CompletionHandlerExt::and_then`]): the result
//! is a single linear broadcast chain in which the receiver's callback runs
//! first, then the argument's, with the same value, for every event.

use crate::errors::OperationError;
use std::sync::Arc;

/// Callbacks invoked by a scope as its units of work conclude.
///
/// Each forked unit produces exactly one terminal call to either
/// [`on_success`](Self::on_success) or [`on_failure`](Self::on_failure),
/// unless the unit completed after scope shutdown was requested, in which
/// case its result is discarded without notification.
/// [`on_shutdown`](Self::on_shutdown) fires at most once, at scope end,
/// when shutdown was requested.
///
/// Callbacks run on the control flow that called `join`, one at a time;
/// no two notifications ever interleave.
///
/// # Panics in callbacks
///
/// A panic raised inside a callback propagates to the caller of `join`.
/// Dropping the scope aborts remaining units, so the group still does not
/// outlive its owner.
pub trait CompletionHandler<T>: Send + Sync {
    /// A unit of work completed with `value`.
    fn on_success(&self, value: &T);

    /// A unit of work failed with `error`.
    fn on_failure(&self, error: &OperationError);

    /// The scope concluded after shutdown was requested.
    fn on_shutdown(&self) {}
}

/// Combinators available on every completion handler.
pub trait CompletionHandlerExt<T>: CompletionHandler<T> + Sized {
    /// Chains `next` after this handler.
    ///
    /// The returned handler invokes this handler's callback first, then
    /// `next`'s, with the same argument, for success, failure, and shutdown
    /// alike. Chaining is associative in observed call order:
    /// `a.and_then(b).and_then(c)` and `a.and_then(b.and_then(c))` produce
    /// the same flattened sequence a, b, c.
    fn and_then<H: CompletionHandler<T>>(self, next: H) -> Chained<Self, H> {
        Chained {
            first: self,
            second: next,
        }
    }
}

impl<T, H: CompletionHandler<T>> CompletionHandlerExt<T> for H {}

/// Two handlers invoked in sequence. Built by
/// [`CompletionHandlerExt::and_then`].
#[derive(Debug, Clone)]
pub struct Chained<A, B> {
    first: A,
    second: B,
}

impl<T, A, B> CompletionHandler<T> for Chained<A, B>
where
    A: CompletionHandler<T>,
    B: CompletionHandler<T>,
{
    fn on_success(&self, value: &T) {
        self.first.on_success(value);
        self.second.on_success(value);
    }

    fn on_failure(&self, error: &OperationError) {
        self.first.on_failure(error);
        self.second.on_failure(error);
    }

    fn on_shutdown(&self) {
        self.first.on_shutdown();
        self.second.on_shutdown();
    }
}

/// Adapts a pair of closures into a completion handler.
///
/// This is the form domain callers typically use:
///
/// ```rust,ignore
/// let handler = FnHandler::new(
///     |registration: &Registration| println!("confirmed: {registration:?}"),
///     |error| eprintln!("registration failed: {error}"),
/// );
/// ```
pub struct FnHandler<S, F> {
    on_success: S,
    on_failure: F,
}

impl<S, F> FnHandler<S, F> {
    /// Creates a handler from success and failure closures. `on_shutdown`
    /// stays a no-op.
    pub const fn new(on_success: S, on_failure: F) -> Self {
        Self {
            on_success,
            on_failure,
        }
    }
}

impl<T, S, F> CompletionHandler<T> for FnHandler<S, F>
where
    S: Fn(&T) + Send + Sync,
    F: Fn(&OperationError) + Send + Sync,
{
    fn on_success(&self, value: &T) {
        (self.on_success)(value);
    }

    fn on_failure(&self, error: &OperationError) {
        (self.on_failure)(error);
    }
}

/// A shared handle to a handler is itself a handler, so one instance can
/// drive a scope and still be inspected by the caller afterward.
impl<T, H: CompletionHandler<T> + ?Sized> CompletionHandler<T> for Arc<H> {
    fn on_success(&self, value: &T) {
        (**self).on_success(value);
    }

    fn on_failure(&self, error: &OperationError) {
        (**self).on_failure(error);
    }

    fn on_shutdown(&self) {
        (**self).on_shutdown();
    }
}
