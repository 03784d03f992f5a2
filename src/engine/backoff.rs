//! Exponential backoff schedule for transient provider retries (§4.9 step 7).

use std::time::Duration;

const BASE_SECS: u64 = 30;
const CAP_SECS: u64 = 120;

/// The backoff duration before the `attempt_index`-th transient retry
/// (0-based): 30s, 60s, 120s, capped at 120s thereafter.
pub fn interval(attempt_index: u32) -> Duration {
    let secs = BASE_SECS.saturating_mul(1u64 << attempt_index.min(16));
    Duration::from_secs(secs.min(CAP_SECS))
}
