use cellsync_types::{CellAddress, CellValue, Origin};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A point-edit notification accepted by the (out-of-scope) `POST /edit`
/// route and carried through the `jobs:edit` KV list (§4.8). Distinct from
/// [`cellsync_types::PendingChange`]: a job additionally carries the `job_id`
/// a lease owner string is built from (`worker:<jobId>`) and the submitting
/// origin, which the worker records but never applies verbatim — every
/// successful apply is written with [`Origin::Worker`] regardless of what
/// the submitter claimed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditJob {
    pub job_id: Uuid,
    pub address: CellAddress,
    /// `None` represents a deletion.
    pub value: Option<CellValue>,
    pub submitted_origin: Origin,
    pub enqueued_at: DateTime<Utc>,
}

impl EditJob {
    pub fn new(address: CellAddress, value: Option<CellValue>, submitted_origin: Origin, now: DateTime<Utc>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            address,
            value,
            submitted_origin,
            enqueued_at: now,
        }
    }
}
