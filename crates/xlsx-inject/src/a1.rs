//! A1-notation address codec.
//!
//! Rows and columns are 1-based throughout: `A1` is row 1, column 1. Column
//! letters are bijective base-26 (`A`..=`Z`, `AA`..=`ZZ`, ...); Excel itself
//! stops at `XFD` (16384) but the scheme is unbounded and this codec does not
//! cap it. Parsing is strict: uppercase letters only, no `$` anchors, no
//! whitespace.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum A1Error {
    #[error("column index must be >= 1, got {0}")]
    ColumnIndex(u32),
    #[error("row index must be >= 1, got {0}")]
    RowIndex(u32),
    #[error("invalid column letters {0:?}")]
    ColumnLetters(String),
    #[error("invalid cell reference {0:?}")]
    CellRef(String),
    #[error("invalid range reference {0:?}")]
    RangeRef(String),
    #[error("range end {end} precedes start {start}")]
    EndBeforeStart { start: CellAddress, end: CellAddress },
}

/// A single cell position, 1-based in both dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellAddress {
    pub row: u32,
    pub col: u32,
}

impl CellAddress {
    pub fn new(row: u32, col: u32) -> Result<Self, A1Error> {
        if row < 1 {
            return Err(A1Error::RowIndex(row));
        }
        if col < 1 {
            return Err(A1Error::ColumnIndex(col));
        }
        Ok(Self { row, col })
    }

    /// Parses strict A1 form: a run of uppercase letters followed by a run of
    /// digits, nothing else. `"AA100"` is row 100, column 27.
    pub fn from_a1(cell_ref: &str) -> Result<Self, A1Error> {
        let bad = || A1Error::CellRef(cell_ref.to_string());
        let letters_end = cell_ref
            .bytes()
            .position(|b| !b.is_ascii_uppercase())
            .unwrap_or(cell_ref.len());
        let (letters, digits) = cell_ref.split_at(letters_end);
        if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        let row: u32 = digits.parse().map_err(|_| bad())?;
        if row < 1 {
            return Err(bad());
        }
        let col = column_letter_to_index(letters).map_err(|_| bad())?;
        Ok(Self { row, col })
    }

    pub fn to_a1(&self) -> String {
        format!("{}{}", encode_column(self.col), self.row)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", encode_column(self.col), self.row)
    }
}

/// An ordered cell pair. The constructor rejects a range whose end precedes
/// its start in row-major order (end row above start row, or same row with
/// the end column left of the start column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RangeAddress {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl RangeAddress {
    pub fn new(start: CellAddress, end: CellAddress) -> Result<Self, A1Error> {
        if end.row < start.row || (end.row == start.row && end.col < start.col) {
            return Err(A1Error::EndBeforeStart { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn to_a1(&self) -> String {
        format!("{}:{}", self.start, self.end)
    }
}

impl fmt::Display for RangeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

/// Converts a 1-based column index to its bijective base-26 letter string
/// (1 → `A`, 26 → `Z`, 27 → `AA`, 16384 → `XFD`).
pub fn column_index_to_letter(index: u32) -> Result<String, A1Error> {
    if index < 1 {
        return Err(A1Error::ColumnIndex(index));
    }
    Ok(encode_column(index))
}

fn encode_column(index: u32) -> String {
    let mut rem = index;
    let mut letters = Vec::new();
    while rem > 0 {
        letters.push(b'A' + ((rem - 1) % 26) as u8);
        rem = (rem - 1) / 26;
    }
    letters.iter().rev().map(|b| *b as char).collect()
}

/// Inverse of [`column_index_to_letter`]. Requires a non-empty string of
/// uppercase `A`-`Z`; anything else (including lowercase) is rejected.
pub fn column_letter_to_index(letters: &str) -> Result<u32, A1Error> {
    let bad = || A1Error::ColumnLetters(letters.to_string());
    if letters.is_empty() {
        return Err(bad());
    }
    let mut index: u32 = 0;
    for b in letters.bytes() {
        if !b.is_ascii_uppercase() {
            return Err(bad());
        }
        let digit = u32::from(b - b'A') + 1;
        index = index
            .checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(bad)?;
    }
    Ok(index)
}

/// Parses `"C10"` into its address. See [`CellAddress::from_a1`].
pub fn parse_a1_cell(cell_ref: &str) -> Result<CellAddress, A1Error> {
    CellAddress::from_a1(cell_ref)
}

pub fn build_a1_cell(row: u32, col: u32) -> Result<String, A1Error> {
    Ok(CellAddress::new(row, col)?.to_a1())
}

/// Splits on the single `:` and parses both sides. The two addresses come
/// back in file order; no start/end normalization is performed.
pub fn parse_a1_range(range_ref: &str) -> Result<(CellAddress, CellAddress), A1Error> {
    let bad = || A1Error::RangeRef(range_ref.to_string());
    let (first, second) = range_ref.split_once(':').ok_or_else(bad)?;
    if second.contains(':') {
        return Err(bad());
    }
    let start = CellAddress::from_a1(first).map_err(|_| bad())?;
    let end = CellAddress::from_a1(second).map_err(|_| bad())?;
    Ok((start, end))
}

pub fn build_a1_range(
    start_row: u32,
    start_col: u32,
    end_row: u32,
    end_col: u32,
) -> Result<String, A1Error> {
    let start = CellAddress::new(start_row, start_col)?;
    let end = CellAddress::new(end_row, end_col)?;
    Ok(RangeAddress::new(start, end)?.to_a1())
}
