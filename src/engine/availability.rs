use std::collections::BTreeSet;

use crate::model::*;

// ── Weekly free-time aggregation ─────────────────────────────────

/// Start offsets of every block in `[start_time, end_time)`.
pub fn time_blocks(period: TimePeriod) -> impl Iterator<Item = Ms> {
    (period.start_time..period.end_time).step_by(TIME_BLOCK as usize)
}

/// Compress block starts into maximal contiguous periods. A block whose end
/// equals the next block's start continues the same period.
pub fn compress_blocks(blocks: &BTreeSet<Ms>) -> Vec<TimePeriod> {
    let mut periods: Vec<TimePeriod> = Vec::new();
    for &start in blocks {
        let end = start + TIME_BLOCK;
        if let Some(last) = periods.last_mut()
            && last.end_time == start
        {
            last.end_time = end;
            continue;
        }
        periods.push(TimePeriod::new(start, end));
    }
    periods
}

/// Free time for `[query_date, query_date + 6 days]`: union of window blocks per
/// day minus every booked block. Windows and bookings outside the span are ignored.
pub fn week_availability(
    query_date: Ms,
    windows: &[AvailabilityWindow],
    bookings: &[Booking],
) -> WeekAvailability {
    let last_date = query_date + SIX_DAYS;
    let mut free: [BTreeSet<Ms>; 7] = Default::default();

    for window in windows {
        let first = window.start_date.max(query_date);
        let last = window.end_date.map_or(last_date, |end| end.min(last_date));
        if first > last {
            continue;
        }
        let blocks: Vec<Ms> = time_blocks(window.period()).collect();
        let mut date = first;
        while date <= last {
            if let Some(day) = day_index(query_date, date) {
                free[day].extend(blocks.iter().copied());
            }
            date += ONE_DAY;
        }
    }

    for booking in bookings {
        let Some(day) = day_index(query_date, booking.date) else {
            continue;
        };
        for block in time_blocks(booking.period()) {
            free[day].remove(&block);
        }
    }

    let days = std::array::from_fn(|i| DayAvailability {
        date: query_date + i as Ms * ONE_DAY,
        times: compress_blocks(&free[i]),
    });
    WeekAvailability { days }
}

fn day_index(query_date: Ms, date: Ms) -> Option<usize> {
    let offset = date - query_date;
    if offset < 0 || offset % ONE_DAY != 0 {
        return None;
    }
    let index = (offset / ONE_DAY) as usize;
    (index < 7).then_some(index)
}
