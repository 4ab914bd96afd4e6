//! Bounded waiting.
//!
//! Every wait in a session is either a fixed settle sleep (letting the game's
//! render pipeline reach a stable frame after an input) or a bounded poll at
//! a fixed interval. Long waits re-check a shared stop flag on every poll so
//! a host can cancel cooperatively; an in-flight capture or OCR call itself
//! is never preempted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Fixed post-input settle delay.
pub fn settle(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}

pub fn stop_requested(stop: &AtomicBool) -> bool {
    stop.load(Ordering::Relaxed)
}

/// Poll `condition` every `interval` until it returns true, the timeout
/// expires, or `stop` is raised. Returns whether the condition was met.
pub fn poll_until(
    timeout: Duration,
    interval: Duration,
    stop: &AtomicBool,
    mut condition: impl FnMut() -> bool,
) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if stop_requested(stop) {
            return false;
        }
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(interval.min(deadline.saturating_duration_since(Instant::now())));
    }
}
