use crate::model::Ms;

/// Bound on windows an owner may publish for one resource.
pub const MAX_WINDOWS_PER_RESOURCE: usize = 256;

/// Calendar days before this are rejected (1970-01-01).
pub const MIN_VALID_DATE_MS: Ms = 0;

/// Calendar days after this are rejected (2100-01-01).
pub const MAX_VALID_DATE_MS: Ms = 4_102_444_800_000;

pub const MAX_SERVICE_FEE_PERCENT: u32 = 100;
