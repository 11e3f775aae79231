use std::sync::Arc;

use cellsync_kv::{Kv, KvError};

use crate::job::EditJob;

const JOBS_EDIT_KEY: &str = "jobs:edit";

/// Enqueues an edit job onto the `jobs:edit` KV list — the integration
/// point the (out-of-scope) `POST /edit` handler calls (§4.8).
pub async fn enqueue_edit_job(kv: &Arc<dyn Kv>, job: &EditJob) -> Result<(), KvError> {
    let encoded = serde_json::to_string(job).map_err(|e| KvError::Other(e.into()))?;
    kv.list_push_back(JOBS_EDIT_KEY, &encoded).await
}

pub(crate) async fn pop_edit_job(kv: &Arc<dyn Kv>) -> Result<Option<EditJob>, KvError> {
    let Some(raw) = kv.list_pop_front(JOBS_EDIT_KEY).await? else {
        return Ok(None);
    };
    let job = serde_json::from_str(&raw).map_err(|e| KvError::Other(e.into()))?;
    Ok(Some(job))
}
