use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use cellsync_types::{CellAddress, CellValue, Snapshot};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::backoff::RateLimitState;
use crate::client::RemoteSheet;
use crate::error::RemoteError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything needed to address one remote sheet over HTTP.
#[derive(Debug, Clone)]
pub struct RemoteEndpoint {
    /// API root, e.g. `https://sheets.googleapis.com/v4/spreadsheets`.
    pub base_url: String,
    pub remote_id: String,
    /// `Sheet1!A1:H20` form, used both for reads and as the prefix stripped
    /// off to recover the sheet name for batch-update ranges.
    pub range: String,
    pub bearer_token: String,
}

impl RemoteEndpoint {
    fn sheet_name(&self) -> &str {
        self.range.split_once('!').map(|(name, _)| name).unwrap_or(&self.range)
    }
}

/// `reqwest`-backed [`RemoteSheet`] adapter. Holds no long-lived connection
/// state beyond the shared `reqwest::Client`'s own pool; rate-limit and
/// offline tracking live in `state`, guarded by a plain `Mutex` since every
/// access here is a quick read-modify-write around the actual I/O, never
/// held across an `.await`.
pub struct HttpRemote {
    http: reqwest::Client,
    endpoint: RemoteEndpoint,
    state: Mutex<RemoteState>,
}

struct RemoteState {
    backoff: RateLimitState,
    offline: bool,
}

impl HttpRemote {
    pub fn new(endpoint: RemoteEndpoint) -> Self {
        Self::with_backoff(endpoint, RateLimitState::new())
    }

    pub fn with_backoff(endpoint: RemoteEndpoint, backoff: RateLimitState) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("reqwest client builds with static config"),
            endpoint,
            state: Mutex::new(RemoteState { backoff, offline: false }),
        }
    }

    fn values_url(&self) -> String {
        format!(
            "{}/{}/values/{}",
            self.endpoint.base_url.trim_end_matches('/'),
            self.endpoint.remote_id,
            urlencoding_range(&self.endpoint.range)
        )
    }

    fn batch_update_url(&self) -> String {
        format!(
            "{}/{}/values:batchUpdate",
            self.endpoint.base_url.trim_end_matches('/'),
            self.endpoint.remote_id
        )
    }

    fn note_offline_transition(&self, offline: bool) {
        let mut state = self.state.lock().unwrap();
        let was_offline = state.offline;
        state.offline = offline;
        drop(state);
        if offline && !was_offline {
            tracing::warn!(remote_id = %self.endpoint.remote_id, "remote sheet transitioned to offline");
        } else if !offline && was_offline {
            tracing::info!(remote_id = %self.endpoint.remote_id, "remote sheet transitioned back to online");
        }
    }

    fn classify_transport_error(&self, err: reqwest::Error) -> RemoteError {
        if err.status().map(|s| s.as_u16()) == Some(429) {
            self.note_offline_transition(false);
            let mut state = self.state.lock().unwrap();
            state.backoff.record_rate_limited(Utc::now());
            RemoteError::RateLimited
        } else if err.is_timeout() || err.is_connect() {
            self.note_offline_transition(true);
            RemoteError::Offline(err.to_string())
        } else {
            RemoteError::Other(anyhow::anyhow!(err))
        }
    }

    fn record_success(&self) {
        self.note_offline_transition(false);
        self.state.lock().unwrap().backoff.record_success();
    }
}

#[async_trait]
impl RemoteSheet for HttpRemote {
    async fn read_range(&self) -> Result<Snapshot, RemoteError> {
        {
            let state = self.state.lock().unwrap();
            if state.backoff.is_backing_off(Utc::now()) {
                return Err(RemoteError::RateLimited);
            }
        }

        let resp = self
            .http
            .get(self.values_url())
            .bearer_auth(&self.endpoint.bearer_token)
            .send()
            .await
            .map_err(|e| self.classify_transport_error(e))?;

        if resp.status().as_u16() == 429 {
            let mut state = self.state.lock().unwrap();
            state.backoff.record_rate_limited(Utc::now());
            return Err(RemoteError::RateLimited);
        }
        let resp = resp.error_for_status().map_err(|e| self.classify_transport_error(e))?;

        let body: ValueRangeResponse = resp
            .json()
            .await
            .map_err(|e| RemoteError::Malformed(e.to_string()))?;

        self.record_success();
        flatten_values(&body.values.unwrap_or_default())
    }

    async fn write_batch(&self, changes: &[(CellAddress, CellValue)]) -> Result<(), RemoteError> {
        if changes.is_empty() {
            return Ok(());
        }
        {
            let state = self.state.lock().unwrap();
            if state.backoff.is_backing_off(Utc::now()) {
                return Err(RemoteError::RateLimited);
            }
        }

        let sheet_name = self.endpoint.sheet_name();
        let data: Vec<Value> = changes
            .iter()
            .map(|(addr, value)| {
                serde_json::json!({
                    "range": addr.sheet_range(sheet_name),
                    "majorDimension": "ROWS",
                    "values": [[value.as_str()]],
                })
            })
            .collect();
        let body = serde_json::json!({
            "valueInputOption": "RAW",
            "data": data,
        });

        let resp = self
            .http
            .post(self.batch_update_url())
            .bearer_auth(&self.endpoint.bearer_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify_transport_error(e))?;

        if resp.status().as_u16() == 429 {
            let mut state = self.state.lock().unwrap();
            state.backoff.record_rate_limited(Utc::now());
            return Err(RemoteError::RateLimited);
        }
        resp.error_for_status().map_err(|e| self.classify_transport_error(e))?;

        self.record_success();
        debug!(count = changes.len(), "batch push acknowledged by remote sheet");
        Ok(())
    }

    async fn write_single(&self, address: CellAddress, value: &CellValue) -> Result<(), RemoteError> {
        self.write_batch(&[(address, value.clone())]).await
    }

    fn rate_limit_status(&self) -> (bool, Duration) {
        self.state.lock().unwrap().backoff.status(Utc::now())
    }
}

#[derive(Debug, Deserialize)]
struct ValueRangeResponse {
    values: Option<Vec<Vec<Value>>>,
}

/// URL-encode only the parts that matter (`!`, spaces) for a range path
/// segment; this crate's own caller always supplies a well-formed
/// `Sheet1!A1:H20` string, so a full percent-encoder is unnecessary.
fn urlencoding_range(range: &str) -> String {
    range.replace('!', "%21").replace(' ', "%20")
}

/// Flattens a dense, row-major 2-D values array into a [`Snapshot`], using
/// the `(rowIndex+1, columnLetter(colIndex))` addressing rule. A non-string
/// scalar is stringified; a row shorter than others (merged-cell
/// continuation, trailing omission) simply contributes no entries past its
/// own length, which collapses to "absent" in the `Snapshot` exactly like
/// any other missing cell.
fn flatten_values(values: &[Vec<Value>]) -> Result<Snapshot, RemoteError> {
    let mut snapshot = Snapshot::new();
    for (row_idx, row) in values.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            let as_string = match cell {
                Value::Null => continue,
                Value::String(s) => s.clone(),
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                other => other.to_string(),
            };
            if as_string.is_empty() {
                continue;
            }
            let col_index = u8::try_from(col_idx).map_err(|_| RemoteError::Malformed(format!("column index {col_idx} out of range")))?;
            let address = CellAddress::from_indices(row_idx as u32 + 1, col_index)
                .map_err(|e| RemoteError::Malformed(e.to_string()))?;
            let value = CellValue::new(as_string).map_err(|e| RemoteError::Malformed(e.to_string()))?;
            snapshot.set(address, value);
        }
    }
    Ok(snapshot)
}
