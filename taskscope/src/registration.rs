//! The registration domain contract: the one shared mutable resource the
//! framework guards under concurrent access.
//!
//! Only the interface surface the capacity gate needs from the event domain
//! lives here - an event's identity and capacity, an attendee's identity,
//! and the registration record itself. Rendering, pricing, and the rest of
//! the event domain belong to outer collaborators.

use crate::result::OperationResult;
use crate::types::{AttendeeId, AttendeeName, Capacity, EventId, EventName, RegistrationId, Timestamp};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The slice of an event the capacity gate needs: identity, a display
/// name, and the attendee bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    /// The event's identity.
    pub id: EventId,
    /// The event's display name.
    pub name: EventName,
    /// The maximum number of confirmed attendees.
    pub max_attendees: Capacity,
}

impl EventSummary {
    /// Creates an event summary.
    pub const fn new(id: EventId, name: EventName, max_attendees: Capacity) -> Self {
        Self {
            id,
            name,
            max_attendees,
        }
    }
}

/// An attendee, reduced to what a registration needs to reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    /// The attendee's identity.
    pub id: AttendeeId,
    /// The attendee's display name. Non-blank by construction.
    pub name: AttendeeName,
}

impl Attendee {
    /// Creates an attendee with a fresh identity.
    pub fn new(name: AttendeeName) -> Self {
        Self {
            id: AttendeeId::new(),
            name,
        }
    }
}

/// The lifecycle status of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrationStatus {
    /// The registration holds a seat.
    Confirmed,
    /// Waiting for capacity to free up.
    Waitlisted,
    /// Withdrawn; no longer holds a seat.
    Cancelled,
    /// The attendee showed up.
    Attended,
}

impl RegistrationStatus {
    /// Whether a registration in this status occupies one of the event's
    /// seats for the purpose of the capacity check.
    pub const fn counts_toward_capacity(self) -> bool {
        matches!(self, Self::Confirmed | Self::Attended)
    }
}

/// Associates one attendee with one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// The registration's identity; UUIDv7, so records sort in the order
    /// they were made.
    pub id: RegistrationId,
    /// The event registered for.
    pub event_id: EventId,
    /// The attendee registered.
    pub attendee_id: AttendeeId,
    /// When the registration was recorded.
    pub registered_at: Timestamp,
    /// The registration's current status.
    pub status: RegistrationStatus,
}

impl Registration {
    /// Creates a confirmed registration recorded now.
    pub fn confirmed(event_id: EventId, attendee_id: AttendeeId) -> Self {
        Self {
            id: RegistrationId::new(),
            event_id,
            attendee_id,
            registered_at: Timestamp::now(),
            status: RegistrationStatus::Confirmed,
        }
    }

    /// Returns a copy of this registration with a new status.
    #[must_use]
    pub fn with_status(&self, status: RegistrationStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

/// A collection of registrations bounded by event capacity.
///
/// # Concurrency contract
///
/// `register` is a check-then-act sequence - read the event's confirmed
/// count, compare against capacity, append. Implementations MUST serialize
/// the check-and-append per event (a lock, an owning actor, or a
/// compare-and-swap loop) so that `confirmed count <= max_attendees` holds
/// at all times, including when `register` runs inside concurrently-forked
/// units of work. Different events are independent and may be registered
/// against concurrently.
///
/// "No capacity" is a [`crate::errors::OperationError::NoCapacity`]
/// failure value through the normal result channel, never a panic.
#[async_trait]
pub trait RegistrationLedger: Send + Sync {
    /// Attempts to register `attendee` for `event`.
    ///
    /// Produces `Success(registration)` with status `Confirmed` while
    /// capacity remains, and `Failure(NoCapacity)` once the event is full.
    async fn register(
        &self,
        event: &EventSummary,
        attendee: &Attendee,
    ) -> OperationResult<Registration>;

    /// The number of registrations currently occupying seats for `event_id`.
    async fn confirmed_count(&self, event_id: EventId) -> usize;

    /// All registrations recorded for `event_id`, in registration order.
    async fn registrations_for(&self, event_id: EventId) -> Vec<Registration>;
}
