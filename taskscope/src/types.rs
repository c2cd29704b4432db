//! Core value types for the `TaskScope` library.
//!
//! All fallible-to-construct types use smart constructors so that an instance,
//! once it exists, is always valid. Contract violations (blank names, zero
//! capacity) are rejected at construction time and never travel through the
//! result channel.

use chrono::{DateTime, Utc};
use nutype::nutype;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The name of an operation group, used to label a scope in logs.
///
/// `OperationName` values are guaranteed to be non-empty and at most
/// 255 characters after trimming.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct OperationName(String);

/// The display name of an event.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct EventName(String);

/// The display name of an attendee. Non-blank by construction.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct AttendeeName(String);

/// The maximum number of confirmed attendees an event admits.
///
/// Always at least 1; an event that admits nobody is a construction error,
/// not a runtime condition.
#[nutype(
    validate(greater_or_equal = 1),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Display,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct Capacity(u32);

impl Capacity {
    /// Returns the capacity as a `usize` for comparisons against counts.
    pub fn as_usize(self) -> usize {
        let value: u32 = self.into();
        value as usize
    }
}

/// A globally unique event identifier using UUIDv7 format.
///
/// UUIDv7 gives time-based ordering, so events sort in creation order.
#[nutype(
    validate(predicate = |id: &Uuid| id.get_version() == Some(uuid::Version::SortRand)),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new `EventId` with the current timestamp.
    pub fn new() -> Self {
        // Uuid::now_v7() always yields a valid v7 UUID
        Self::try_new(Uuid::now_v7()).expect("Uuid::now_v7() should always return a valid v7 UUID")
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

/// A unique attendee identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttendeeId(Uuid);

impl AttendeeId {
    /// Creates a new random `AttendeeId`.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AttendeeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AttendeeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A unique registration identifier in UUIDv7 format, so registrations
/// sort in the order they were recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationId(Uuid);

impl RegistrationId {
    /// Creates a new `RegistrationId` with the current timestamp.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RegistrationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A timestamp for when something was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a new timestamp from a UTC `DateTime`.
    pub const fn new(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// Creates a timestamp representing the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the underlying `DateTime`.
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self::new(datetime)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(timestamp: Timestamp) -> Self {
        timestamp.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn operation_name_accepts_valid_strings(s in "[a-zA-Z0-9_-]{1,255}") {
            let result = OperationName::try_new(s.clone());
            prop_assert!(result.is_ok());
            let name = result.unwrap();
            prop_assert_eq!(name.as_ref(), &s);
        }

        #[test]
        fn operation_name_trims_whitespace(s in " {0,10}[a-zA-Z0-9_-]{1,240} {0,10}") {
            let result = OperationName::try_new(s.clone());
            prop_assert!(result.is_ok());
            let name = result.unwrap();
            prop_assert_eq!(name.as_ref(), s.trim());
        }

        #[test]
        fn operation_name_rejects_blank_strings(s in " {0,50}") {
            prop_assert!(OperationName::try_new(s).is_err());
        }

        #[test]
        fn capacity_accepts_positive_values(c in 1u32..=u32::MAX) {
            let result = Capacity::try_new(c);
            prop_assert!(result.is_ok());
            prop_assert_eq!(result.unwrap().as_usize(), c as usize);
        }
    }

    #[test]
    fn capacity_rejects_zero() {
        assert!(Capacity::try_new(0).is_err());
    }

    #[test]
    fn attendee_name_rejects_blank_names() {
        assert!(AttendeeName::try_new("").is_err());
        assert!(AttendeeName::try_new("   \t").is_err());
        assert!(AttendeeName::try_new("Jane Doe").is_ok());
    }

    #[test]
    fn event_id_new_creates_valid_v7() {
        let event_id = EventId::new();
        assert_eq!(
            event_id.as_ref().get_version(),
            Some(uuid::Version::SortRand)
        );
    }

    #[test]
    fn event_id_rejects_non_v7_uuids() {
        assert!(EventId::try_new(Uuid::new_v4()).is_err());
        assert!(EventId::try_new(Uuid::nil()).is_err());
    }

    #[test]
    fn registration_ids_sort_in_creation_order() {
        let first = RegistrationId::new();
        let second = RegistrationId::new();
        assert!(first <= second);
    }

    #[test]
    fn timestamp_now_creates_current_time() {
        let before = Utc::now();
        let timestamp = Timestamp::now();
        let after = Utc::now();

        assert!(timestamp.as_datetime() >= &before);
        assert!(timestamp.as_datetime() <= &after);
    }

    #[test]
    fn timestamp_roundtrips_through_serde() {
        let timestamp = Timestamp::now();
        let json = serde_json::to_string(&timestamp).unwrap();
        let deserialized: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(timestamp, deserialized);
    }
}
