use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::limits::MAX_WINDOWS_PER_RESOURCE;
use crate::model::*;

use super::conflict::{find_conflict, has_elapsed, validate_date, validate_period, validate_window};
use super::pricing::booking_price;
use super::store::StoreError;
use super::{Engine, EngineError};

impl Engine {
    /// Reserve `[start_time, end_time)` on `date` for `user_id`.
    ///
    /// Validation, resource lookup, the payable-account check and the
    /// availability check run without the lock. The overlap check is repeated
    /// under the lock, and the store's own integrity check is the final word.
    pub async fn create_booking(
        &self,
        user_id: Ulid,
        resource_id: Ulid,
        date: Ms,
        start_time: Ms,
        end_time: Ms,
    ) -> Result<Booking, EngineError> {
        let result = self
            .try_create_booking(user_id, resource_id, date, start_time, end_time)
            .await;
        let label = crate::observability::outcome_label(&result.as_ref().map(|_| ()));
        metrics::counter!(crate::observability::BOOKING_REQUESTS_TOTAL, "outcome" => label)
            .increment(1);
        result
    }

    async fn try_create_booking(
        &self,
        user_id: Ulid,
        resource_id: Ulid,
        date: Ms,
        start_time: Ms,
        end_time: Ms,
    ) -> Result<Booking, EngineError> {
        let period = validate_period(start_time, end_time)?;
        validate_date(date, self.config.utc_offset_ms)?;

        let resource = self.require_resource(resource_id).await?;
        if !self
            .stores
            .payments
            .has_payable_account(resource.owner_id)
            .await
        {
            debug!("resource {resource_id}: owner {} has no payable account", resource.owner_id);
            return Err(EngineError::DependencyUnsatisfied(resource.owner_id));
        }
        if !self.is_within_windows(resource_id, date, &period).await? {
            return Err(EngineError::OutsideAvailability {
                resource_id,
                date,
                period,
            });
        }
        // Cheap early rejection; repeated under the lock.
        self.ensure_no_overlap(resource_id, date, &period, "pre_lock")
            .await?;

        let guard = match self.locks.acquire(resource_id).await {
            Ok(guard) => guard,
            Err(e) => {
                warn!("booking lock timed out for resource {resource_id}");
                metrics::counter!(crate::observability::LOCK_TIMEOUTS_TOTAL).increment(1);
                return Err(e);
            }
        };

        self.ensure_no_overlap(resource_id, date, &period, "post_lock")
            .await?;

        let price = booking_price(&period, resource.price_per_hour);
        let streak = self.current_streak(user_id).await?;
        let waive_fee = streak >= self.config.fee_waiver_streak;

        let booking = Booking {
            id: Ulid::new(),
            resource_id,
            user_id,
            date,
            start_time,
            end_time,
            price,
        };
        match self.stores.bookings.insert(booking.clone()).await {
            Ok(()) => {}
            Err(StoreError::Integrity(existing)) => {
                metrics::counter!(crate::observability::BOOKING_CONFLICTS_TOTAL, "stage" => "storage")
                    .increment(1);
                return Err(EngineError::SchedulingConflict(existing));
            }
            Err(e) => return Err(e.into()),
        }

        // Charge at the tail of the critical section; on failure the booking is
        // withdrawn so no unpaid slot is ever held.
        match self
            .stores
            .payments
            .charge(resource.owner_id, price, waive_fee)
            .await
        {
            Ok(receipt) => {
                if receipt.fee_waived {
                    metrics::counter!(crate::observability::FEES_WAIVED_TOTAL).increment(1);
                }
            }
            Err(e) => {
                warn!("charge for booking {} failed, rolling back: {e}", booking.id);
                metrics::counter!(crate::observability::PAYMENT_ROLLBACKS_TOTAL).increment(1);
                if let Err(rollback) = self.stores.bookings.delete(booking.id).await {
                    warn!("rollback of booking {} failed: {rollback}", booking.id);
                }
                return Err(EngineError::PaymentFailed(e.to_string()));
            }
        }
        drop(guard);

        info!(
            "booked {} on resource {resource_id}: date={date} [{start_time}, {end_time}) price={price} fee_waived={waive_fee}",
            booking.id
        );
        Ok(booking)
    }

    async fn ensure_no_overlap(
        &self,
        resource_id: Ulid,
        date: Ms,
        period: &TimePeriod,
        stage: &'static str,
    ) -> Result<(), EngineError> {
        let existing = self
            .stores
            .bookings
            .bookings_for_resource(resource_id, Some(DateRange::day(date)))
            .await?;
        if let Some(clash) = find_conflict(&existing, period) {
            debug!("resource {resource_id}: [{}, {}) overlaps booking {} ({stage})", period.start_time, period.end_time, clash.id);
            metrics::counter!(crate::observability::BOOKING_CONFLICTS_TOTAL, "stage" => stage)
                .increment(1);
            return Err(EngineError::SchedulingConflict(Some(clash.id)));
        }
        Ok(())
    }

    /// Delete a booking the user owns that has not yet elapsed.
    pub async fn cancel_booking(&self, user_id: Ulid, booking_id: Ulid) -> Result<Booking, EngineError> {
        let booking = self.booking(booking_id).await?;
        if booking.user_id != user_id {
            return Err(EngineError::NotOwner {
                actor: user_id,
                entity: booking_id,
            });
        }
        let (today, now_time) = self.now_on_calendar();
        if has_elapsed(&booking, today, now_time) {
            return Err(EngineError::PastBooking(booking_id));
        }

        let removed = self.stores.bookings.delete(booking_id).await?;
        metrics::counter!(crate::observability::BOOKINGS_CANCELLED_TOTAL).increment(1);
        info!("cancelled booking {booking_id} on resource {}", removed.resource_id);
        Ok(removed)
    }

    // ── Owner-managed availability windows ──────────────────────

    pub async fn add_window(
        &self,
        owner_id: Ulid,
        resource_id: Ulid,
        window: NewWindow,
    ) -> Result<AvailabilityWindow, EngineError> {
        validate_window(&window, self.config.utc_offset_ms)?;
        self.require_owned_resource(owner_id, resource_id).await?;

        // Count and insert under the resource lock so concurrent adds cannot
        // overshoot the cap.
        let _guard = self.locks.acquire(resource_id).await?;
        if self.list_windows(resource_id).await?.len() >= MAX_WINDOWS_PER_RESOURCE {
            return Err(EngineError::Validation("too many availability windows"));
        }
        let window = window.into_window(Ulid::new(), resource_id);
        self.stores.availability.insert_window(window.clone()).await?;
        info!("window {} added to resource {resource_id}", window.id);
        Ok(window)
    }

    /// Replace every window of the resource. Nothing changes if any window is invalid.
    pub async fn set_windows(
        &self,
        owner_id: Ulid,
        resource_id: Ulid,
        windows: Vec<NewWindow>,
    ) -> Result<Vec<AvailabilityWindow>, EngineError> {
        if windows.len() > MAX_WINDOWS_PER_RESOURCE {
            return Err(EngineError::Validation("too many availability windows"));
        }
        for window in &windows {
            validate_window(window, self.config.utc_offset_ms)?;
        }
        self.require_owned_resource(owner_id, resource_id).await?;

        let windows: Vec<AvailabilityWindow> = windows
            .into_iter()
            .map(|w| w.into_window(Ulid::new(), resource_id))
            .collect();
        let _guard = self.locks.acquire(resource_id).await?;
        self.stores
            .availability
            .replace_windows(resource_id, windows.clone())
            .await?;
        info!("resource {resource_id}: replaced windows ({} total)", windows.len());
        Ok(windows)
    }

    pub async fn update_window(
        &self,
        owner_id: Ulid,
        window_id: Ulid,
        window: NewWindow,
    ) -> Result<AvailabilityWindow, EngineError> {
        validate_window(&window, self.config.utc_offset_ms)?;
        let existing = self
            .stores
            .availability
            .window(window_id)
            .await?
            .ok_or(EngineError::NotFound(window_id))?;
        self.require_owned_resource(owner_id, existing.resource_id).await?;

        let updated = window.into_window(window_id, existing.resource_id);
        self.stores.availability.update_window(updated.clone()).await?;
        info!("window {window_id} updated");
        Ok(updated)
    }

    pub async fn remove_window(&self, owner_id: Ulid, window_id: Ulid) -> Result<AvailabilityWindow, EngineError> {
        let existing = self
            .stores
            .availability
            .window(window_id)
            .await?
            .ok_or(EngineError::NotFound(window_id))?;
        self.require_owned_resource(owner_id, existing.resource_id).await?;

        let removed = self.stores.availability.delete_window(window_id).await?;
        info!("window {window_id} removed from resource {}", removed.resource_id);
        Ok(removed)
    }
}
