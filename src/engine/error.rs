use ulid::Ulid;

use crate::model::{Ms, TimePeriod};

use super::store::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    NotFound(Ulid),
    /// Overlaps a committed booking; the caller must pick another slot.
    SchedulingConflict(Option<Ulid>),
    /// Not inside the resource's published availability.
    OutsideAvailability {
        resource_id: Ulid,
        date: Ms,
        period: TimePeriod,
    },
    /// The booking lock was not acquired in time; retry the same request.
    LockTimeout,
    Validation(&'static str),
    /// The resource owner cannot receive payments.
    DependencyUnsatisfied(Ulid),
    NotOwner { actor: Ulid, entity: Ulid },
    PastBooking(Ulid),
    PaymentFailed(String),
    Store(String),
}

impl EngineError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::LockTimeout)
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::SchedulingConflict(Some(id)) => {
                write!(f, "scheduling conflict with booking: {id}")
            }
            EngineError::SchedulingConflict(None) => write!(f, "scheduling conflict"),
            EngineError::OutsideAvailability {
                resource_id,
                date,
                period,
            } => write!(
                f,
                "resource {resource_id} is not available on {date} for [{}, {})",
                period.start_time, period.end_time
            ),
            EngineError::LockTimeout => write!(f, "booking lock timed out, try again later"),
            EngineError::Validation(msg) => write!(f, "invalid request: {msg}"),
            EngineError::DependencyUnsatisfied(owner) => {
                write!(f, "owner {owner} has no payable account")
            }
            EngineError::NotOwner { actor, entity } => {
                write!(f, "user {actor} does not own {entity}")
            }
            EngineError::PastBooking(id) => write!(f, "booking {id} has already elapsed"),
            EngineError::PaymentFailed(e) => write!(f, "payment failed: {e}"),
            EngineError::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Integrity(id) => EngineError::SchedulingConflict(id),
            StoreError::NotFound(id) => EngineError::NotFound(id),
            StoreError::Unavailable(msg) => EngineError::Store(msg),
        }
    }
}
