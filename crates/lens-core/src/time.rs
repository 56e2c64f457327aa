//! Millisecond clock and cache freshness rule (no chrono dependency).

use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants::NARRATIVE_TTL_MS;

/// Current UTC time as Unix milliseconds.
pub fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// A cache entry written at `written_at_ms` is readable iff strictly less
/// than the TTL has elapsed. A clock that went backwards counts as fresh.
pub fn cache_is_fresh(written_at_ms: u64, now_ms: u64) -> bool {
    now_ms.saturating_sub(written_at_ms) < NARRATIVE_TTL_MS
}
