//! Retry primitives shared by the upload orchestrator and the publish session.
//!
//! Two retry styles live in this crate:
//!
//! - **Uploads** use capped exponential backoff with jitter ([`Backoff`]).
//!   Many workers may fail at the same moment when a host hiccups, and the
//!   jitter spreads their second attempts apart.
//! - **Page creation and editing** wait for whatever the service asks for.
//!   Telegraph answers a flood-controlled request with a message that embeds
//!   the number of seconds to wait. [`retry_delay_hint`] is the only place
//!   that reads that message; everything else treats the hint as optional and
//!   falls back to a fixed delay.
//!
//! Sleeping goes through the [`Pause`] trait so tests can record the requested
//! waits instead of spending real time on them.

use std::sync::Arc;
use std::time::Duration;

/// Something that can block the current thread for a while.
pub trait Pause: Send + Sync {
    fn pause(&self, duration: Duration);
}

/// Production [`Pause`]: a plain `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

impl<T: Pause + ?Sized> Pause for Arc<T> {
    fn pause(&self, duration: Duration) {
        (**self).pause(duration)
    }
}

/// Capped exponential backoff.
///
/// The n-th retry waits `initial * 2^n`, never more than `max`, plus a
/// random jitter of up to 10% of the uncapped delay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max }
    }

    /// Base delay before retry number `retry` (0-based), without jitter.
    pub fn base_delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.initial.saturating_mul(factor)
    }

    /// Delay to wait before retry number `retry`, jitter included and capped.
    pub fn delay(&self, retry: u32) -> Duration {
        let base = self.base_delay(retry);
        (base + jitter(base)).min(self.max)
    }
}

/// Uniform random jitter in `[0, 10%]` of `delay`.
pub fn jitter(delay: Duration) -> Duration {
    delay.mul_f64(0.1 * rand::random::<f64>())
}

/// Extract a server-suggested wait (in seconds) from an error message.
///
/// Recognizes the two shapes the publishing service produces:
/// `"Flood control exceeded. Retry in 7 seconds"` and `"FLOOD_WAIT_7"`.
/// Anything else yields `None`, which callers treat as "use the fixed delay".
pub fn retry_delay_hint(message: &str) -> Option<u64> {
    let lower = message.to_ascii_lowercase();
    for marker in ["retry in ", "flood_wait_"] {
        if let Some(pos) = lower.find(marker) {
            let digits: String = lower[pos + marker.len()..]
                .trim_start()
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if let Ok(secs) = digits.parse::<u64>() {
                return Some(secs);
            }
        }
    }
    None
}

/// How long to wait after a failed page request.
///
/// A hint of `N` seconds becomes `N + 1` seconds so the retry lands after
/// the window has really closed.
pub fn hinted_or(message: &str, fallback: Duration) -> Duration {
    match retry_delay_hint(message) {
        Some(secs) => Duration::from_secs(secs.saturating_add(1)),
        None => fallback,
    }
}
