mod availability;
mod conflict;
mod coverage;
mod error;
mod lock;
mod mutations;
pub mod pricing;
mod queries;
mod store;
mod streak;

pub use availability::{compress_blocks, time_blocks, week_availability};
pub use coverage::{is_covered, merge_overlapping};
pub use error::EngineError;
pub use lock::{BookingGuard, BookingLocks};
pub use store::{
    AvailabilityStore, BookingStore, Collaborators, InMemoryStore, PaymentError, PaymentGateway,
    ResourceStore, StoreError, SubmissionStore,
};
pub use streak::current_streak;

use std::sync::Arc;

use ulid::Ulid;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::model::*;

/// Scheduling core: availability resolution, weekly aggregation, booking
/// creation under an exclusion lock, cancellation and streak lookup.
///
/// Reads never take the booking lock. Only `create_booking` serializes, and it
/// re-validates inside the critical section because a read may be stale.
pub struct Engine {
    pub(super) stores: Collaborators,
    pub(super) locks: BookingLocks,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) config: Config,
}

impl Engine {
    pub fn new(stores: Collaborators, config: Config) -> Self {
        Self::with_clock(stores, config, Arc::new(SystemClock))
    }

    pub fn with_clock(stores: Collaborators, config: Config, clock: Arc<dyn Clock>) -> Self {
        Self {
            locks: BookingLocks::new(config.lock_scope, config.lock_timeout),
            stores,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Local midnight of the current day.
    pub fn today(&self) -> Ms {
        conflict::floor_day(self.clock.now_ms(), self.config.utc_offset_ms)
    }

    /// `(today, current time-of-day)` read from a single clock sample.
    pub(super) fn now_on_calendar(&self) -> (Ms, Ms) {
        let now = self.clock.now_ms();
        let today = conflict::floor_day(now, self.config.utc_offset_ms);
        (today, conflict::time_of_day(now, today))
    }

    /// Lookup a resource or fail with `NotFound`.
    pub(super) async fn require_resource(&self, resource_id: Ulid) -> Result<Resource, EngineError> {
        self.stores
            .resources
            .resource(resource_id)
            .await?
            .ok_or(EngineError::NotFound(resource_id))
    }

    /// Lookup a resource and check that `actor` owns it.
    pub(super) async fn require_owned_resource(
        &self,
        actor: Ulid,
        resource_id: Ulid,
    ) -> Result<Resource, EngineError> {
        let resource = self.require_resource(resource_id).await?;
        if resource.owner_id != actor {
            return Err(EngineError::NotOwner {
                actor,
                entity: resource_id,
            });
        }
        Ok(resource)
    }

    /// Split bookings into elapsed and upcoming relative to now.
    pub(super) fn split_by_now(&self, bookings: Vec<Booking>) -> BookingsData {
        let (today, now_time) = self.now_on_calendar();
        let (past, upcoming) = bookings
            .into_iter()
            .partition(|b| conflict::has_elapsed(b, today, now_time));
        BookingsData { past, upcoming }
    }
}
