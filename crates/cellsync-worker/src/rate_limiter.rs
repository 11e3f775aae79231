use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// A fixed-window rate limiter throttling the worker's consumption of
/// `jobs:edit` to the outbound API quota (§4.8: ≤55/min). Implemented
/// locally as a counter reset every window rather than pulling in a
/// `governor`-style crate, since this worker is the only caller.
pub struct RateLimiter {
    max_per_window: usize,
    window: Duration,
    state: Mutex<(Instant, usize)>,
}

impl RateLimiter {
    pub fn new(max_per_window: usize, window: Duration) -> Self {
        Self {
            max_per_window,
            window,
            state: Mutex::new((Instant::now(), 0)),
        }
    }

    pub fn per_minute(max_per_minute: usize) -> Self {
        Self::new(max_per_minute, Duration::from_secs(60))
    }

    /// Blocks until a slot in the current (or a fresh) window is available.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().unwrap();
                let now = Instant::now();
                if now.duration_since(state.0) >= self.window {
                    *state = (now, 0);
                }
                if state.1 < self.max_per_window {
                    state.1 += 1;
                    None
                } else {
                    Some((state.0 + self.window).saturating_duration_since(now))
                }
            };
            match wait {
                None => return,
                Some(delay) => tokio::time::sleep(delay).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn throttles_once_the_window_is_exhausted() {
        let limiter = RateLimiter::new(2, Duration::from_millis(100));

        limiter.acquire().await;
        limiter.acquire().await;

        let started = Instant::now();
        limiter.acquire().await;
        assert!(Instant::now().duration_since(started) >= Duration::from_millis(100));
    }
}
