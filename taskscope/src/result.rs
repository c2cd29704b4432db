//! The typed outcome value produced by each unit of work.

use crate::errors::OperationError;

/// The outcome of a single unit of work.
///
/// Produced exactly once per forked unit; immutable; has no identity beyond
/// its tag and payload. The scope drives every completed unit's
/// `OperationResult` into the completion handler.
///
/// This is deliberately a two-variant tagged union rather than a plain
/// `Result` alias so that failure payloads are always [`OperationError`]
/// and matching stays exhaustive at the scope boundary.
#[derive(Debug, Clone)]
#[must_use]
pub enum OperationResult<T> {
    /// The unit of work produced its value.
    Success(T),
    /// The unit of work failed with a classified error.
    Failure(OperationError),
}

impl<T> OperationResult<T> {
    /// Returns `true` if this is a `Success`.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns `true` if this is a `Failure`.
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Maps the success value, leaving failures untouched.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> OperationResult<U> {
        match self {
            Self::Success(value) => OperationResult::Success(f(value)),
            Self::Failure(error) => OperationResult::Failure(error),
        }
    }

    /// Converts into a standard `Result`.
    pub fn into_result(self) -> Result<T, OperationError> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(error) => Err(error),
        }
    }
}

impl<T> From<Result<T, OperationError>> for OperationResult<T> {
    fn from(result: Result<T, OperationError>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(error) => Self::Failure(error),
        }
    }
}

impl<T> From<OperationResult<T>> for Result<T, OperationError> {
    fn from(result: OperationResult<T>) -> Self {
        result.into_result()
    }
}
