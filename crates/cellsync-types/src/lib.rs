//! cellsync-types
//!
//! Cell addressing, snapshot, origin tagging, and the diff algorithm that
//! drives the CDC poller. Pure data and pure functions — no I/O, no clock
//! reads, so this crate's tests run instantly and its behavior is trivially
//! reusable from every other crate in the workspace.

mod address;
mod error;
mod origin;
mod pending;
mod snapshot;
mod stored_cell;
mod value;

pub use address::{column_to_index, index_to_column, AddressError, CellAddress, MAX_COL_INDEX, MAX_ROW};
pub use error::ErrorKind;
pub use origin::{InvalidOrigin, Origin};
pub use pending::PendingChange;
pub use snapshot::{diff, Snapshot, SnapshotDiff};
pub use stored_cell::StoredCell;
pub use value::{CellValue, ValueTooLong, MAX_VALUE_BYTES};
