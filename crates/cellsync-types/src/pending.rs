use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::CellAddress;
use crate::origin::Origin;
use crate::value::CellValue;

/// An element of one of the durable `pending:*` FIFO lists (§4.7), or of the
/// `jobs:edit` ingress list (§4.8), which reuses the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChange {
    pub address: CellAddress,
    /// `None` represents a deletion (empty cell).
    pub value: Option<CellValue>,
    pub origin: Origin,
    pub timestamp: DateTime<Utc>,
}

impl PendingChange {
    pub fn new(address: CellAddress, value: Option<CellValue>, origin: Origin, timestamp: DateTime<Utc>) -> Self {
        Self {
            address,
            value,
            origin,
            timestamp,
        }
    }
}
