use crate::limits::*;
use crate::model::*;

use super::EngineError;

// ── Calendar arithmetic ──────────────────────────────────────────

/// Local midnight (as epoch ms) of the day containing `now`.
pub(crate) fn floor_day(now: Ms, utc_offset_ms: Ms) -> Ms {
    (now + utc_offset_ms).div_euclid(ONE_DAY) * ONE_DAY - utc_offset_ms
}

/// Time-of-day offset of `now` on the day starting at `today`.
pub(crate) fn time_of_day(now: Ms, today: Ms) -> Ms {
    now - today + DAY_START
}

/// A booking has elapsed once its day is over, or on its day once it has ended.
pub(crate) fn has_elapsed(booking: &Booking, today: Ms, now_time: Ms) -> bool {
    booking.date < today || (booking.date == today && booking.end_time < now_time)
}

// ── Validation ───────────────────────────────────────────────────

pub(crate) fn validate_date(date: Ms, utc_offset_ms: Ms) -> Result<(), EngineError> {
    if !(MIN_VALID_DATE_MS..=MAX_VALID_DATE_MS).contains(&date) {
        return Err(EngineError::Validation("date out of range"));
    }
    if (date + utc_offset_ms).rem_euclid(ONE_DAY) != 0 {
        return Err(EngineError::Validation("date is not a local midnight"));
    }
    Ok(())
}

pub(crate) fn validate_period(start_time: Ms, end_time: Ms) -> Result<TimePeriod, EngineError> {
    if start_time.rem_euclid(TIME_BLOCK) != 0 || end_time.rem_euclid(TIME_BLOCK) != 0 {
        return Err(EngineError::Validation("time must be aligned to a 15 minute block"));
    }
    if end_time <= start_time {
        return Err(EngineError::Validation("end time must be after start time"));
    }
    if start_time < DAY_START || end_time > DAY_END {
        return Err(EngineError::Validation("time outside of the day"));
    }
    Ok(TimePeriod::new(start_time, end_time))
}

pub(crate) fn validate_window(window: &NewWindow, utc_offset_ms: Ms) -> Result<(), EngineError> {
    validate_date(window.start_date, utc_offset_ms)?;
    if let Some(end_date) = window.end_date {
        validate_date(end_date, utc_offset_ms)?;
        if end_date < window.start_date {
            return Err(EngineError::Validation("end date before start date"));
        }
    }
    validate_period(window.start_time, window.end_time)?;
    Ok(())
}

// ── Overlap ──────────────────────────────────────────────────────

/// First booking whose period overlaps `period`.
pub(crate) fn find_conflict<'a>(bookings: &'a [Booking], period: &TimePeriod) -> Option<&'a Booking> {
    bookings.iter().find(|b| b.period().overlaps(period))
}
