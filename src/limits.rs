//! Engine-level resource limits. All are generous; they exist to bound
//! memory and WAL growth, not to shape normal traffic.

pub const MAX_PROPERTY_ID_LEN: usize = 128;
pub const MAX_GUEST_NAME_LEN: usize = 256;
/// RFC 5321 path limit.
pub const MAX_GUEST_EMAIL_LEN: usize = 254;
/// Widest accepted date range, inclusive day count.
pub const MAX_RANGE_DAYS: i64 = 365 * 5;
pub const MAX_ALLOCATIONS_PER_PROPERTY: usize = 100_000;
