use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

const DEFAULT_INITIAL: Duration = Duration::from_secs(5);
const DEFAULT_MAX: Duration = Duration::from_secs(60);

/// Tracks the remote client's rate-limit state across calls (§4.3). On a
/// rate-limited response, the backoff doubles, capped at `max`; on any
/// success it resets. Reads requested before `backoff_until` are rejected
/// without performing I/O.
///
/// Log emissions are rate-limited themselves: one `warn!` on entering
/// backoff, one `info!` on leaving it, none in between.
pub struct RateLimitState {
    initial: Duration,
    max: Duration,
    current: Duration,
    backoff_until: Option<DateTime<Utc>>,
}

impl RateLimitState {
    pub fn new() -> Self {
        Self::with_bounds(DEFAULT_INITIAL, DEFAULT_MAX)
    }

    pub fn with_bounds(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
            backoff_until: None,
        }
    }

    /// `true` if a call issued at `now` must be rejected without I/O.
    pub fn is_backing_off(&self, now: DateTime<Utc>) -> bool {
        self.backoff_until.is_some_and(|until| now < until)
    }

    /// `(is_backing_off, remaining_backoff)` as of `now`, for status
    /// reporting (§6's `GET /status`).
    pub fn status(&self, now: DateTime<Utc>) -> (bool, Duration) {
        match self.backoff_until {
            Some(until) if now < until => (
                true,
                (until - now).to_std().unwrap_or(Duration::ZERO),
            ),
            _ => (false, Duration::ZERO),
        }
    }

    /// Records a rate-limited response observed at `now`, doubling the
    /// backoff (capped) and emitting the "entering backoff" log exactly once
    /// per transition.
    pub fn record_rate_limited(&mut self, now: DateTime<Utc>) {
        let entering = self.backoff_until.is_none();
        self.current = (self.current * 2).min(self.max);
        self.backoff_until = Some(now + chrono::Duration::from_std(self.current).unwrap_or_default());
        if entering {
            warn!(backoff_secs = self.current.as_secs(), "remote sheet rate limited, entering backoff");
        }
    }

    /// Records a successful call, resetting the backoff and emitting the
    /// "leaving backoff" log if a backoff was in effect.
    pub fn record_success(&mut self) {
        if self.backoff_until.is_some() {
            info!("remote sheet rate limit cleared, leaving backoff");
        }
        self.current = self.initial;
        self.backoff_until = None;
    }
}

impl Default for RateLimitState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_and_caps_on_repeated_rate_limits() {
        let mut state = RateLimitState::with_bounds(Duration::from_secs(5), Duration::from_secs(60));
        let t0 = Utc::now();

        state.record_rate_limited(t0);
        assert_eq!(state.current, Duration::from_secs(10));
        state.record_rate_limited(t0);
        assert_eq!(state.current, Duration::from_secs(20));
        state.record_rate_limited(t0);
        assert_eq!(state.current, Duration::from_secs(40));
        state.record_rate_limited(t0);
        assert_eq!(state.current, Duration::from_secs(60), "must cap at max");
        state.record_rate_limited(t0);
        assert_eq!(state.current, Duration::from_secs(60));
    }

    #[test]
    fn success_resets_backoff() {
        let mut state = RateLimitState::new();
        let t0 = Utc::now();
        state.record_rate_limited(t0);
        assert!(state.is_backing_off(t0));

        state.record_success();
        assert!(!state.is_backing_off(t0));
    }

    #[test]
    fn backing_off_rejects_calls_before_deadline() {
        let mut state = RateLimitState::with_bounds(Duration::from_secs(5), Duration::from_secs(60));
        let t0 = Utc::now();
        state.record_rate_limited(t0);

        assert!(state.is_backing_off(t0 + chrono::Duration::seconds(1)));
        assert!(!state.is_backing_off(t0 + chrono::Duration::seconds(11)));
    }
}
