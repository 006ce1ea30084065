//! Conversions between relative TTLs and absolute epoch-second deadlines.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current Unix time in whole seconds.
pub fn unix_now() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs() as i64,
        Err(before) => -(before.duration().as_secs() as i64),
    }
}

/// Absolute deadline `ttl` from now, rounded down to the second.
///
/// TTLs too large to represent clamp to `i64::MAX`.
///
/// # Example
///
/// ```
/// use emberkv::ttl::{expires_in, unix_now};
/// use std::time::Duration;
///
/// let at = expires_in(Duration::from_secs(60));
/// assert!(at >= unix_now() + 59);
/// ```
pub fn expires_in(ttl: Duration) -> i64 {
    let secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    unix_now().saturating_add(secs)
}

/// Wall-clock time left until `expires_at`, or zero if it already passed.
pub fn duration_until(expires_at: i64) -> Duration {
    if expires_at <= 0 {
        return Duration::ZERO;
    }
    match UNIX_EPOCH.checked_add(Duration::from_secs(expires_at as u64)) {
        Some(deadline) => deadline
            .duration_since(SystemTime::now())
            .unwrap_or(Duration::ZERO),
        // Beyond what the platform clock can express
        None => Duration::MAX,
    }
}
