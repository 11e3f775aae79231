use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

/// A manually-advanced virtual clock shared by every fake in a scenario, so
/// TTL- and debounce-dependent behavior (lease expiry, `IgnoreMark` expiry,
/// rate-limit backoff windows) can be exercised deterministically without
/// sleeping real wall-clock time in a test.
///
/// Cloning a [`VirtualClock`] shares the same underlying counter — clone it
/// into every fake that needs to observe the same passage of time.
#[derive(Clone)]
pub struct VirtualClock {
    elapsed: Arc<Mutex<Duration>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self {
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Elapsed virtual time since the clock was created.
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap()
    }

    /// The elapsed duration expressed as a UTC timestamp, anchored at an
    /// arbitrary fixed epoch so every fake in a scenario agrees on "now".
    pub fn now_utc(&self) -> DateTime<Utc> {
        epoch() + chrono::Duration::from_std(self.elapsed()).unwrap_or_default()
    }

    pub fn advance(&self, delta: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap();
        *elapsed += delta;
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}
