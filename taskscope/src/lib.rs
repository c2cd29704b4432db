//! `TaskScope` - structured concurrent operation scopes.
//!
//! A scope owns a bounded cohort of concurrently-forked units of work,
//! each reporting through a typed result channel. The contract is fork,
//! join, propagate first failure, cancel siblings, roll back if
//! transactional: the first failing unit triggers transactional rollback
//! (persistence-class errors only), notifies the caller-supplied
//! completion handler, and cooperatively cancels the remaining units.
//!
//! Domain callers supply arbitrary units of work; the library never
//! prints, never retries, and surfaces every failure to the handler.
//! Units forked into a scope must be idempotent-safe to discard on
//! cancellation - partial effects of a cancelled unit are not undone
//! except through the transactional-rollback path.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod context;
pub mod errors;
pub mod registration;
pub mod result;
pub mod scope;
pub mod transaction;
pub mod types;

pub use completion::{Chained, CompletionHandler, CompletionHandlerExt, FnHandler};
pub use context::OperationContext;
pub use errors::{OperationError, PersistenceError, ScopeError, ScopeResult, TransactionResult};
pub use registration::{
    Attendee, EventSummary, Registration, RegistrationLedger, RegistrationStatus,
};
pub use result::OperationResult;
pub use scope::{CancellationSignal, JoinSummary, OperationScope};
pub use transaction::{Transaction, TransactionManager, TransactionSource};
pub use types::{
    AttendeeId, AttendeeName, Capacity, EventId, EventName, OperationName, RegistrationId,
    Timestamp,
};
