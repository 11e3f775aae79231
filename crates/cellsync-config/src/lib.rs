//! Loads the recognized configuration surface (§6) from environment
//! variables exactly once at bootstrap. No other crate re-reads the
//! environment directly — every component receives a [`ReconcilerConfig`]
//! constructed here and threaded through by `cellsync-runtime`.

use std::time::Duration;

use cellsync_types::ErrorKind;
use thiserror::Error;
use tracing::warn;

const MIN_POLL_INTERVAL_MS: u64 = 3_000;

const DEFAULT_REMOTE_RANGE: &str = "Sheet1!A1:H20";
const DEFAULT_LEASE_TTL_SEC: u64 = 5;
const DEFAULT_LOCK_RETRY_DELAY_MS: u64 = 200;
const DEFAULT_LOCK_MAX_ATTEMPTS: u32 = 15;
const DEFAULT_IGNORE_MARK_TTL_SEC: u64 = 10;
const DEFAULT_SNAPSHOT_TTL_SEC: u64 = 86_400;
const DEFAULT_OUTBOUND_DEBOUNCE_MS: u64 = 500;
const DEFAULT_RATE_LIMIT_INITIAL_BACKOFF_MS: u64 = 5_000;
const DEFAULT_RATE_LIMIT_MAX_BACKOFF_MS: u64 = 60_000;
const DEFAULT_WORKER_FANOUT: usize = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingRequired(&'static str),
    #[error("environment variable {name} has an invalid value {value:?}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    /// Every `ConfigError` is `validation`-classified: malformed input at
    /// bootstrap, rejected with a reason, never reaching the core (§7).
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// The full recognized configuration surface from §6, loaded once at
/// bootstrap and threaded through every component by value/reference —
/// nothing below this crate calls `std::env::var` itself.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub poll_interval: Duration,
    pub remote_range: String,
    pub lease_ttl: Duration,
    pub lock_retry_delay: Duration,
    pub lock_max_attempts: u32,
    pub ignore_mark_ttl: Duration,
    pub snapshot_ttl: Duration,
    pub outbound_debounce: Duration,
    pub rate_limit_initial_backoff: Duration,
    pub rate_limit_max_backoff: Duration,
    pub worker_fanout: usize,
    pub remote_id: String,
    pub store_dsn: String,
    pub kv_address: String,
    pub remote_base_url: String,
    pub remote_bearer_token: String,
}

impl ReconcilerConfig {
    /// Loads every recognized `CELLSYNC_*` variable from the process
    /// environment, applying the defaults and silent clamping from §6/§8
    /// property 9. Missing required variables (`storeDsn`/`kvAddress`/
    /// `remoteId`) are reported as [`ConfigError::MissingRequired`], never a
    /// panic.
    pub fn from_env() -> Result<Self, ConfigError> {
        let poll_interval_ms = parse_opt_u64("CELLSYNC_POLL_INTERVAL_MS")?.unwrap_or(MIN_POLL_INTERVAL_MS);
        let poll_interval_ms = clamp_poll_interval(poll_interval_ms);

        Ok(Self {
            poll_interval: Duration::from_millis(poll_interval_ms),
            remote_range: env_or("CELLSYNC_REMOTE_RANGE", DEFAULT_REMOTE_RANGE),
            lease_ttl: Duration::from_secs(parse_opt_u64("CELLSYNC_LEASE_TTL_SEC")?.unwrap_or(DEFAULT_LEASE_TTL_SEC)),
            lock_retry_delay: Duration::from_millis(
                parse_opt_u64("CELLSYNC_LOCK_RETRY_DELAY_MS")?.unwrap_or(DEFAULT_LOCK_RETRY_DELAY_MS),
            ),
            lock_max_attempts: parse_opt_u64("CELLSYNC_LOCK_MAX_ATTEMPTS")?
                .unwrap_or(DEFAULT_LOCK_MAX_ATTEMPTS as u64) as u32,
            ignore_mark_ttl: Duration::from_secs(
                parse_opt_u64("CELLSYNC_IGNORE_MARK_TTL_SEC")?.unwrap_or(DEFAULT_IGNORE_MARK_TTL_SEC),
            ),
            snapshot_ttl: Duration::from_secs(
                parse_opt_u64("CELLSYNC_SNAPSHOT_TTL_SEC")?.unwrap_or(DEFAULT_SNAPSHOT_TTL_SEC),
            ),
            outbound_debounce: Duration::from_millis(
                parse_opt_u64("CELLSYNC_OUTBOUND_DEBOUNCE_MS")?.unwrap_or(DEFAULT_OUTBOUND_DEBOUNCE_MS),
            ),
            rate_limit_initial_backoff: Duration::from_millis(
                parse_opt_u64("CELLSYNC_RATE_LIMIT_INITIAL_BACKOFF_MS")?
                    .unwrap_or(DEFAULT_RATE_LIMIT_INITIAL_BACKOFF_MS),
            ),
            rate_limit_max_backoff: Duration::from_millis(
                parse_opt_u64("CELLSYNC_RATE_LIMIT_MAX_BACKOFF_MS")?.unwrap_or(DEFAULT_RATE_LIMIT_MAX_BACKOFF_MS),
            ),
            worker_fanout: parse_opt_u64("CELLSYNC_WORKER_FANOUT")?.unwrap_or(DEFAULT_WORKER_FANOUT as u64) as usize,
            remote_id: require_env("CELLSYNC_REMOTE_ID")?,
            store_dsn: require_env("CELLSYNC_STORE_DSN")?,
            kv_address: require_env("CELLSYNC_KV_ADDRESS")?,
            remote_base_url: env_or(
                "CELLSYNC_REMOTE_BASE_URL",
                "https://sheets.googleapis.com/v4/spreadsheets",
            ),
            remote_bearer_token: std::env::var("CELLSYNC_REMOTE_BEARER_TOKEN").unwrap_or_default(),
        })
    }
}

/// Lower-bounds `pollIntervalMs` at [`MIN_POLL_INTERVAL_MS`], silently
/// per §6/property 9 — a `pollIntervalMs = 500` request is clamped to 3000,
/// not rejected.
fn clamp_poll_interval(requested_ms: u64) -> u64 {
    if requested_ms < MIN_POLL_INTERVAL_MS {
        warn!(requested_ms, clamped_to_ms = MIN_POLL_INTERVAL_MS, "pollIntervalMs below floor, clamping");
        MIN_POLL_INTERVAL_MS
    } else {
        requested_ms
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty()).unwrap_or_else(|| default.to_string())
}

fn require_env(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingRequired(name))
}

fn parse_opt_u64(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse::<u64>().map(Some).map_err(|e| ConfigError::InvalidValue {
            name,
            value: raw,
            reason: e.to_string(),
        }),
        _ => Ok(None),
    }
}
