use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on a cell's byte length.
pub const MAX_VALUE_BYTES: usize = 5_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("cell value exceeds {MAX_VALUE_BYTES} bytes ({0} bytes)")]
pub struct ValueTooLong(pub usize);

/// A cell's string content, validated against [`MAX_VALUE_BYTES`] at
/// construction so no component downstream needs to re-check the bound.
///
/// The empty string is a valid `CellValue` and is distinct from "the cell is
/// absent from the `Snapshot`" at this layer — see `CellValue::is_empty`.
/// Only the relational-store boundary collapses the two (an empty cell is
/// represented there as a deleted row).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellValue(String);

impl CellValue {
    pub fn new(value: impl Into<String>) -> Result<Self, ValueTooLong> {
        let value = value.into();
        if value.len() > MAX_VALUE_BYTES {
            return Err(ValueTooLong(value.len()));
        }
        Ok(Self(value))
    }

    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for CellValue {
    type Error = ValueTooLong;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CellValue> for String {
    fn from(value: CellValue) -> Self {
        value.0
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_valid_and_distinct_from_absent() {
        let v = CellValue::new("").unwrap();
        assert!(v.is_empty());
    }

    #[test]
    fn rejects_values_over_the_byte_cap() {
        let too_long = "x".repeat(MAX_VALUE_BYTES + 1);
        assert!(CellValue::new(too_long).is_err());
        assert!(CellValue::new("x".repeat(MAX_VALUE_BYTES)).is_ok());
    }
}
