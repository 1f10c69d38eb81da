use rust_decimal::{Decimal, RoundingStrategy};

use crate::model::{HOUR, TimePeriod};

fn to_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `hours * price_per_hour`, rounded to two decimal places.
pub fn booking_price(period: &TimePeriod, price_per_hour: Decimal) -> Decimal {
    let hours = Decimal::from(period.duration_ms()) / Decimal::from(HOUR);
    to_cents(hours * price_per_hour)
}

/// Share of `price` kept by the system, rounded to two decimal places.
pub fn service_fee(price: Decimal, rate: Decimal) -> Decimal {
    to_cents(price * rate)
}
