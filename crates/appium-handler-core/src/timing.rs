//! Deadline-based sleeping.
//!
//! [`sleep_for`] never returns before its deadline. A timer that fires early
//! (or a sleep that is otherwise cut short) simply re-arms until the wall
//! clock catches up.

use std::time::Duration;

use tokio::time::Instant;

/// Stand-in for deadlines too far out to represent.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `Instant::now() + duration`, clamped far in the future instead of
/// overflowing.
pub fn deadline_after(duration: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(duration).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Sleeps for `seconds` whole seconds.
pub async fn sleep_for(seconds: u64) {
    sleep_until_elapsed(Duration::from_secs(seconds)).await;
}

/// Sleeps until at least `duration` has elapsed since the call.
pub async fn sleep_until_elapsed(duration: Duration) {
    let deadline = deadline_after(duration);
    while Instant::now() < deadline {
        tokio::time::sleep_until(deadline).await;
    }
}
