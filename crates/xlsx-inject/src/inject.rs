//! Writes typed tabular values into a worksheet tree.
//!
//! Values land as literal cells: numbers in `<v>`, text and dates as inline
//! strings, so no shared-strings bookkeeping is needed. Rows are kept in
//! ascending `r` order and cells within a row in column order, with an
//! existing cell at the same reference replaced outright. Everything else in
//! the worksheet (styles, dimensions, merged cells) is left alone.

use chrono::{NaiveDate, NaiveDateTime};

use crate::a1::{parse_a1_cell, CellAddress};
use crate::error::XlsxError;
use crate::xml::{XmlElement, XmlNode, NS_XML};

/// One typed cell value to inject.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// Produces an empty `<c>` with only its reference.
    #[default]
    Empty,
    Number(f64),
    Int(i64),
    /// Written as an inline `YYYY-MM-DD` string.
    Date(NaiveDate),
    /// Written as an inline `YYYY-MM-DD HH:MM:SS` string.
    DateTime(NaiveDateTime),
    Text(String),
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => Self::Empty,
        }
    }
}

/// Injects a block of rows into `sheet` with its top-left cell at
/// (`start_row`, `start_col`), both 1-based.
///
/// Row `i` of `rows` lands on sheet row `start_row + i`; ragged rows are
/// fine, each writes only the columns it covers. An empty `rows` slice is a
/// no-op.
pub fn inject_rows(
    sheet: &mut XmlElement,
    rows: &[Vec<CellValue>],
    start_row: u32,
    start_col: u32,
) -> Result<(), XlsxError> {
    if start_row < 1 || start_col < 1 {
        return Err(XlsxError::InvalidOrigin {
            row: start_row,
            col: start_col,
        });
    }
    if rows.is_empty() {
        return Ok(());
    }

    let ns = sheet.main_namespace().to_string();
    let sheet_data = sheet
        .child_mut(&ns, "sheetData")
        .ok_or(XlsxError::MissingSheetData)?;

    for (row_offset, values) in rows.iter().enumerate() {
        let row_index = start_row + row_offset as u32;
        let row = row_element_at(sheet_data, &ns, row_index);
        for (col_offset, value) in values.iter().enumerate() {
            let address = CellAddress {
                row: row_index,
                col: start_col + col_offset as u32,
            };
            let cell = build_cell(&ns, address, value);
            match cell_slot(row, &ns, address.col) {
                Ok(idx) => row.children[idx] = XmlNode::Element(cell),
                Err(idx) => row.children.insert(idx, XmlNode::Element(cell)),
            }
        }
    }
    Ok(())
}

/// Returns the `<row r="row_index">` element, creating it at the position
/// that keeps rows in ascending order.
fn row_element_at<'a>(
    sheet_data: &'a mut XmlElement,
    ns: &str,
    row_index: u32,
) -> &'a mut XmlElement {
    let mut slot = Err(sheet_data.children.len());
    for (idx, node) in sheet_data.children.iter().enumerate() {
        let XmlNode::Element(el) = node else { continue };
        if !el.is_named(ns, "row") {
            continue;
        }
        let Some(r) = el.attr("r").and_then(|r| r.parse::<u32>().ok()) else {
            continue;
        };
        if r == row_index {
            slot = Ok(idx);
            break;
        }
        if r > row_index {
            slot = Err(idx);
            break;
        }
    }

    let idx = match slot {
        Ok(idx) => idx,
        Err(idx) => {
            let mut row = XmlElement::in_ns(ns, "row");
            row.set_attr("r", row_index.to_string());
            sheet_data.children.insert(idx, XmlNode::Element(row));
            idx
        }
    };
    match &mut sheet_data.children[idx] {
        XmlNode::Element(el) => el,
        XmlNode::Text(_) => unreachable!("row slot always holds an element"),
    }
}

/// Position of `col` within the row's cells: `Ok` to replace an existing
/// cell, `Err` to insert before the first cell right of it. Cells without a
/// parseable reference keep their place and are skipped in comparisons.
fn cell_slot(row: &XmlElement, ns: &str, col: u32) -> Result<usize, usize> {
    for (idx, node) in row.children.iter().enumerate() {
        let XmlNode::Element(existing) = node else { continue };
        if !existing.is_named(ns, "c") {
            continue;
        }
        let Some(existing_col) = existing
            .attr("r")
            .and_then(|r| parse_a1_cell(r).ok())
            .map(|address| address.col)
        else {
            continue;
        };
        if existing_col == col {
            return Ok(idx);
        }
        if existing_col > col {
            return Err(idx);
        }
    }
    Err(row.children.len())
}

fn build_cell(ns: &str, address: CellAddress, value: &CellValue) -> XmlElement {
    let mut cell = XmlElement::in_ns(ns, "c");
    cell.set_attr("r", address.to_a1());
    match value {
        CellValue::Empty => {}
        CellValue::Number(n) if !n.is_finite() => {}
        CellValue::Number(n) => set_numeric_value(&mut cell, ns, n.to_string()),
        CellValue::Int(i) => set_numeric_value(&mut cell, ns, i.to_string()),
        CellValue::Date(d) => set_inline_str(&mut cell, ns, &d.format("%Y-%m-%d").to_string()),
        CellValue::DateTime(dt) => {
            set_inline_str(&mut cell, ns, &dt.format("%Y-%m-%d %H:%M:%S").to_string())
        }
        CellValue::Text(s) => set_inline_str(&mut cell, ns, s),
    }
    cell
}

fn set_numeric_value(cell: &mut XmlElement, ns: &str, text: String) {
    let mut v = XmlElement::in_ns(ns, "v");
    v.set_text(text);
    cell.push_element(v);
}

fn set_inline_str(cell: &mut XmlElement, ns: &str, text: &str) {
    cell.set_attr("t", "inlineStr");
    let mut t = XmlElement::in_ns(ns, "t");
    if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
        t.set_attr_in(NS_XML, "space", "preserve");
    }
    t.set_text(text);
    let mut is = XmlElement::in_ns(ns, "is");
    is.push_element(t);
    cell.push_element(is);
}
