use std::time::Instant;

use ulid::Ulid;

use crate::model::*;

use super::availability::week_availability;
use super::conflict::{find_conflict, has_elapsed, validate_date, validate_period};
use super::coverage::is_covered;
use super::streak::current_streak;
use super::{Engine, EngineError};

impl Engine {
    /// Resolver only: is `period` inside the resource's published windows on `date`?
    pub(super) async fn is_within_windows(
        &self,
        resource_id: Ulid,
        date: Ms,
        period: &TimePeriod,
    ) -> Result<bool, EngineError> {
        let windows = self
            .stores
            .availability
            .list_windows(resource_id, DateRange::day(date))
            .await?;
        Ok(is_covered(period, &windows))
    }

    /// Lock-free check: the slot is inside published availability and no
    /// committed booking overlaps it. A concurrent writer may still win the slot.
    pub async fn check_availability(
        &self,
        resource_id: Ulid,
        date: Ms,
        start_time: Ms,
        end_time: Ms,
    ) -> Result<bool, EngineError> {
        let period = validate_period(start_time, end_time)?;
        validate_date(date, self.config.utc_offset_ms)?;
        self.require_resource(resource_id).await?;

        if !self.is_within_windows(resource_id, date, &period).await? {
            return Ok(false);
        }
        let booked = self
            .stores
            .bookings
            .bookings_for_resource(resource_id, Some(DateRange::day(date)))
            .await?;
        Ok(find_conflict(&booked, &period).is_none())
    }

    /// Free time for `date` and the following six days.
    pub async fn week_availability(
        &self,
        resource_id: Ulid,
        date: Ms,
    ) -> Result<WeekAvailability, EngineError> {
        validate_date(date, self.config.utc_offset_ms)?;
        self.require_resource(resource_id).await?;

        let started = Instant::now();
        let span = DateRange::between(date, date + SIX_DAYS);
        let windows = self
            .stores
            .availability
            .list_windows(resource_id, span)
            .await?;
        let bookings = self
            .stores
            .bookings
            .bookings_for_resource(resource_id, Some(span))
            .await?;
        let week = week_availability(date, &windows, &bookings);
        metrics::histogram!(crate::observability::WEEK_QUERY_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        Ok(week)
    }

    pub async fn current_streak(&self, user_id: Ulid) -> Result<u32, EngineError> {
        let submissions = self
            .stores
            .submissions
            .completed_submissions(user_id)
            .await?;
        Ok(current_streak(&submissions, self.today()))
    }

    pub async fn booking(&self, booking_id: Ulid) -> Result<Booking, EngineError> {
        self.stores
            .bookings
            .booking(booking_id)
            .await?
            .ok_or(EngineError::NotFound(booking_id))
    }

    pub async fn bookings_for_resource(&self, resource_id: Ulid) -> Result<BookingsData, EngineError> {
        let bookings = self
            .stores
            .bookings
            .bookings_for_resource(resource_id, None)
            .await?;
        Ok(self.split_by_now(bookings))
    }

    /// Bookings the user made.
    pub async fn bookings_for_user(&self, user_id: Ulid) -> Result<BookingsData, EngineError> {
        let bookings = self.stores.bookings.bookings_for_user(user_id, None).await?;
        Ok(self.split_by_now(bookings))
    }

    /// Bookings made against any resource the owner publishes.
    pub async fn bookings_for_owner(&self, owner_id: Ulid) -> Result<BookingsData, EngineError> {
        let mut bookings = Vec::new();
        for resource in self.stores.resources.resources_owned_by(owner_id).await? {
            bookings.extend(
                self.stores
                    .bookings
                    .bookings_for_resource(resource.id, None)
                    .await?,
            );
        }
        bookings.sort_by_key(|b| (b.date, b.start_time));
        Ok(self.split_by_now(bookings))
    }

    /// Whether the user has an elapsed booking on the resource.
    pub async fn has_user_booked_resource_in_past(
        &self,
        resource_id: Ulid,
        user_id: Ulid,
    ) -> Result<bool, EngineError> {
        let (today, now_time) = self.now_on_calendar();
        let bookings = self.stores.bookings.bookings_for_user(user_id, None).await?;
        Ok(bookings
            .iter()
            .any(|b| b.resource_id == resource_id && has_elapsed(b, today, now_time)))
    }

    pub async fn resource_has_upcoming_bookings(&self, resource_id: Ulid) -> Result<bool, EngineError> {
        let (today, now_time) = self.now_on_calendar();
        let upcoming = self
            .stores
            .bookings
            .bookings_for_resource(resource_id, Some(DateRange { from: today, to: None }))
            .await?;
        Ok(upcoming.iter().any(|b| !has_elapsed(b, today, now_time)))
    }

    pub async fn list_windows(&self, resource_id: Ulid) -> Result<Vec<AvailabilityWindow>, EngineError> {
        let mut windows = self
            .stores
            .availability
            .list_windows(resource_id, DateRange { from: Ms::MIN, to: None })
            .await?;
        windows.sort_by_key(|w| (w.start_date, w.start_time));
        Ok(windows)
    }
}
