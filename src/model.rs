use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Milliseconds: epoch instants, calendar days and time-of-day offsets alike.
pub type Ms = i64;

pub const SECOND: Ms = 1_000;
pub const MINUTE: Ms = 60 * SECOND;
pub const HOUR: Ms = 60 * MINUTE;
pub const ONE_DAY: Ms = 24 * HOUR;
pub const SIX_DAYS: Ms = 6 * ONE_DAY;

/// All booking and availability times are aligned to this block.
pub const TIME_BLOCK: Ms = 15 * MINUTE;

/// Time-of-day values are offsets from 10:00 local; these bound 00:00..24:00.
pub const DAY_START: Ms = -10 * HOUR;
pub const DAY_END: Ms = 14 * HOUR;

/// Half-open time-of-day range `[start_time, end_time)` within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimePeriod {
    pub start_time: Ms,
    pub end_time: Ms,
}

impl TimePeriod {
    pub fn new(start_time: Ms, end_time: Ms) -> Self {
        debug_assert!(start_time < end_time, "TimePeriod start must be before end");
        Self { start_time, end_time }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end_time - self.start_time
    }

    /// Two periods conflict unless one ends at or before the other's start.
    pub fn overlaps(&self, other: &TimePeriod) -> bool {
        !(self.end_time <= other.start_time || self.start_time >= other.end_time)
    }

    /// Returns true if `self` fully contains `other`.
    pub fn contains(&self, other: &TimePeriod) -> bool {
        self.start_time <= other.start_time && other.end_time <= self.end_time
    }
}

/// Inclusive range of calendar days. `to: None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Ms,
    pub to: Option<Ms>,
}

impl DateRange {
    pub fn day(date: Ms) -> Self {
        Self { from: date, to: Some(date) }
    }

    pub fn between(from: Ms, to: Ms) -> Self {
        Self { from, to: Some(to) }
    }

    pub fn contains(&self, date: Ms) -> bool {
        self.from <= date && self.to.is_none_or(|to| date <= to)
    }

    pub fn intersects(&self, other: &DateRange) -> bool {
        self.to.is_none_or(|to| other.from <= to) && other.to.is_none_or(|to| self.from <= to)
    }
}

/// A bookable resource (a car space) as seen by the scheduling core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: Ulid,
    pub owner_id: Ulid,
    pub price_per_hour: Decimal,
}

/// Owner-published recurring availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub id: Ulid,
    pub resource_id: Ulid,
    pub start_date: Ms,
    /// `None` means open-ended.
    pub end_date: Option<Ms>,
    pub start_time: Ms,
    pub end_time: Ms,
}

impl AvailabilityWindow {
    pub fn dates(&self) -> DateRange {
        DateRange {
            from: self.start_date,
            to: self.end_date,
        }
    }

    /// Built without the `new` assertion; stored rows are not re-validated.
    pub fn period(&self) -> TimePeriod {
        TimePeriod {
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

/// Window fields supplied by an owner, before ids are assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWindow {
    pub start_date: Ms,
    pub end_date: Option<Ms>,
    pub start_time: Ms,
    pub end_time: Ms,
}

impl NewWindow {
    pub fn into_window(self, id: Ulid, resource_id: Ulid) -> AvailabilityWindow {
        AvailabilityWindow {
            id,
            resource_id,
            start_date: self.start_date,
            end_date: self.end_date,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub resource_id: Ulid,
    pub user_id: Ulid,
    pub date: Ms,
    pub start_time: Ms,
    pub end_time: Ms,
    /// Two decimal places.
    pub price: Decimal,
}

impl Booking {
    pub fn period(&self) -> TimePeriod {
        TimePeriod {
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

/// Free time on a single calendar day, sorted and non-overlapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAvailability {
    pub date: Ms,
    pub times: Vec<TimePeriod>,
}

/// Seven consecutive days starting at the queried date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekAvailability {
    pub days: [DayAvailability; 7],
}

impl WeekAvailability {
    pub fn day(&self, date: Ms) -> Option<&DayAvailability> {
        self.days.iter().find(|d| d.date == date)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingsData {
    pub past: Vec<Booking>,
    pub upcoming: Vec<Booking>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleSubmission {
    pub id: Ulid,
    pub user_id: Ulid,
    pub puzzle_date: Ms,
    /// Day the submission first matched the solution.
    pub completion_date: Option<Ms>,
}

/// Outcome of a successful payment transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeReceipt {
    pub owner_id: Ulid,
    pub amount: Decimal,
    pub service_fee: Decimal,
    pub fee_waived: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_overlap_is_half_open() {
        let a = TimePeriod::new(0, HOUR);
        let b = TimePeriod::new(30 * MINUTE, 2 * HOUR);
        let c = TimePeriod::new(HOUR, 2 * HOUR);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c)); // adjacent
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn period_contains() {
        let outer = TimePeriod::new(0, 8 * HOUR);
        assert!(outer.contains(&TimePeriod::new(HOUR, 2 * HOUR)));
        assert!(outer.contains(&outer));
        assert!(!outer.contains(&TimePeriod::new(7 * HOUR, 9 * HOUR)));
        assert_eq!(outer.duration_ms(), 8 * HOUR);
    }

    #[test]
    fn date_range_open_ended() {
        let open = DateRange { from: ONE_DAY, to: None };
        assert!(open.contains(ONE_DAY));
        assert!(open.contains(1000 * ONE_DAY));
        assert!(!open.contains(0));

        let week = DateRange::between(0, SIX_DAYS);
        assert!(open.intersects(&week));
        assert!(week.intersects(&open));

        let later = DateRange { from: 10 * ONE_DAY, to: None };
        assert!(!later.intersects(&week));
        assert!(!week.intersects(&later));
    }

    #[test]
    fn date_range_bounded_intersection() {
        let a = DateRange::between(0, 2 * ONE_DAY);
        let b = DateRange::between(2 * ONE_DAY, 4 * ONE_DAY);
        let c = DateRange::between(3 * ONE_DAY, 4 * ONE_DAY);
        assert!(a.intersects(&b)); // share a day
        assert!(!a.intersects(&c));
    }

    #[test]
    fn malformed_stored_rows_yield_periods_without_panicking() {
        let window = AvailabilityWindow {
            id: Ulid::new(),
            resource_id: Ulid::new(),
            start_date: 0,
            end_date: None,
            start_time: 2 * HOUR,
            end_time: HOUR,
        };
        let inverted = window.period();
        assert_eq!(inverted.start_time, 2 * HOUR);
        assert!(!inverted.contains(&TimePeriod::new(HOUR, 2 * HOUR)));

        let booking = Booking {
            id: Ulid::new(),
            resource_id: window.resource_id,
            user_id: Ulid::new(),
            date: 0,
            start_time: HOUR,
            end_time: HOUR,
            price: Decimal::ZERO,
        };
        assert_eq!(booking.period().duration_ms(), 0);
    }

    #[test]
    fn booking_serializes_price_with_two_places() {
        let booking = Booking {
            id: Ulid::new(),
            resource_id: Ulid::new(),
            user_id: Ulid::new(),
            date: 0,
            start_time: 0,
            end_time: HOUR,
            price: Decimal::new(1250, 2),
        };
        let json = serde_json::to_string(&booking).unwrap();
        assert!(json.contains("\"12.50\""), "{json}");
        let decoded: Booking = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, booking);
    }
}
