use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::limits::MAX_SERVICE_FEE_PERCENT;
use crate::model::{MINUTE, Ms};

/// How booking creation is serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockScope {
    /// One lock for every resource.
    Global,
    /// One lock per resource; bookings on different resources never contend.
    #[default]
    PerResource,
}

impl FromStr for LockScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "global" => Ok(LockScope::Global),
            "resource" | "per_resource" | "per-resource" => Ok(LockScope::PerResource),
            other => Err(format!("unknown lock scope: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Bounded wait for the booking lock.
    pub lock_timeout: Duration,
    pub lock_scope: LockScope,
    /// Offset of local time from UTC; local midnight defines a calendar day.
    pub utc_offset_ms: Ms,
    /// Fraction of the booking price charged as a service fee.
    pub service_fee_rate: Decimal,
    /// Streak length at which the service fee is waived.
    pub fee_waiver_streak: u32,
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(2),
            lock_scope: LockScope::PerResource,
            utc_offset_ms: 0,
            service_fee_rate: Decimal::new(15, 2),
            fee_waiver_streak: 7,
            metrics_port: None,
        }
    }
}

impl Config {
    /// Read `BAYLINE_*` variables, falling back to defaults for anything
    /// missing or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let lock_timeout = lookup("BAYLINE_LOCK_TIMEOUT_MS")
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.lock_timeout);
        let lock_scope = lookup("BAYLINE_LOCK_SCOPE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.lock_scope);
        let utc_offset_ms = lookup("BAYLINE_UTC_OFFSET_MINUTES")
            .and_then(|s| s.parse::<Ms>().ok())
            .map(|m| m * MINUTE)
            .unwrap_or(defaults.utc_offset_ms);
        let service_fee_rate = lookup("BAYLINE_SERVICE_FEE_PERCENT")
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|p| *p <= MAX_SERVICE_FEE_PERCENT)
            .map(|p| Decimal::new(p as i64, 2))
            .unwrap_or(defaults.service_fee_rate);
        let fee_waiver_streak = lookup("BAYLINE_FEE_WAIVER_STREAK")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.fee_waiver_streak);
        let metrics_port = lookup("BAYLINE_METRICS_PORT").and_then(|s| s.parse().ok());

        Self {
            lock_timeout,
            lock_scope,
            utc_offset_ms,
            service_fee_rate,
            fee_waiver_streak,
            metrics_port,
        }
    }
}
