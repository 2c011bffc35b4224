//! Time utilities.

use std::time::{SystemTime, UNIX_EPOCH};

/// Get current timestamp in epoch milliseconds.
#[inline(always)]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
