use chrono::{DateTime, Utc};

use crate::address::CellAddress;
use crate::origin::Origin;
use crate::value::CellValue;

/// One row of the relational store's `cells` table.
///
/// The store enforces at most one `StoredCell` per [`CellAddress`]; a
/// deletion removes the row rather than storing an empty value, so every
/// `StoredCell` that exists carries a non-empty `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCell {
    pub address: CellAddress,
    pub value: CellValue,
    pub origin: Origin,
    pub updated_at: DateTime<Utc>,
}
