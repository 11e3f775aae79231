use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on [`CellAddress::row`], inclusive.
pub const MAX_ROW: u32 = 10_000;
/// Upper bound on the zero-based column index, inclusive (`A..=Z`).
pub const MAX_COL_INDEX: u8 = 25;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("row {0} is out of range 1..={MAX_ROW}")]
    RowOutOfRange(u32),
    #[error("column letter must be a single character in A..=Z, got {0:?}")]
    InvalidColumnLetter(String),
}

/// A validated (row, column) pair identifying one cell in both the remote
/// sheet and the relational store.
///
/// The column is stored as a zero-based index (`A` = 0) internally; only the
/// constructors and `Display`/`FromStr` deal in the one-letter public form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellAddress {
    row: u32,
    col_index: u8,
}

impl CellAddress {
    /// Build a `CellAddress` from a 1-based row and a column letter (`"A"..="Z"`).
    pub fn new(row: u32, column_letter: &str) -> Result<Self, AddressError> {
        if row == 0 || row > MAX_ROW {
            return Err(AddressError::RowOutOfRange(row));
        }
        let col_index = column_to_index(column_letter)?;
        Ok(Self { row, col_index })
    }

    /// Build a `CellAddress` from a 1-based row and a zero-based column index.
    pub fn from_indices(row: u32, col_index: u8) -> Result<Self, AddressError> {
        if row == 0 || row > MAX_ROW {
            return Err(AddressError::RowOutOfRange(row));
        }
        if col_index > MAX_COL_INDEX {
            return Err(AddressError::InvalidColumnLetter(index_to_column(col_index)));
        }
        Ok(Self { row, col_index })
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn col_index(&self) -> u8 {
        self.col_index
    }

    pub fn column_letter(&self) -> String {
        index_to_column(self.col_index)
    }

    /// The `Sheet1!<Letter><Row>` form used by the remote batch-update API.
    pub fn sheet_range(&self, sheet_name: &str) -> String {
        format!("{sheet_name}!{}{}", self.column_letter(), self.row)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.column_letter())
    }
}

impl FromStr for CellAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (row_s, col_s) = s
            .split_once(':')
            .ok_or_else(|| AddressError::InvalidColumnLetter(s.to_string()))?;
        let row: u32 = row_s
            .parse()
            .map_err(|_| AddressError::InvalidColumnLetter(s.to_string()))?;
        Self::new(row, col_s)
    }
}

/// Parse a single alphabetic column letter (`"A"..="Z"`) into a zero-based index.
///
/// Only single-letter columns are accepted; `MaxCol` defaults to 26 so
/// multi-letter columns (`AA`, ...) never occur within range.
pub fn column_to_index(letter: &str) -> Result<u8, AddressError> {
    let mut chars = letter.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return Err(AddressError::InvalidColumnLetter(letter.to_string()));
    };
    if !c.is_ascii_alphabetic() {
        return Err(AddressError::InvalidColumnLetter(letter.to_string()));
    }
    let idx = c.to_ascii_uppercase() as u8 - b'A';
    if idx > MAX_COL_INDEX {
        return Err(AddressError::InvalidColumnLetter(letter.to_string()));
    }
    Ok(idx)
}

/// Inverse of [`column_to_index`].
pub fn index_to_column(index: u8) -> String {
    ((b'A' + index.min(MAX_COL_INDEX)) as char).to_string()
}
