//! Resolved view of a package's structure.
//!
//! [`WorkbookMap`] is built once by [`crate::workbook::build_workbook_map`]
//! and then treated as an immutable snapshot: it records where the parts
//! live, not their contents, so later edits to the package do not go through
//! it.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// One `<sheet>` entry from the workbook, resolved to its part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorksheetInfo {
    /// Display name as it appears on the sheet tab.
    pub name: String,
    /// The workbook-scoped `sheetId`, distinct from the part name.
    pub sheet_id: u32,
    /// Part name, e.g. `xl/worksheets/sheet1.xml`.
    pub part: String,
    /// Relationship id the workbook used to reference the sheet.
    pub rel_id: String,
}

/// One table definition discovered through a worksheet's relationships.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
    /// Display name of the worksheet hosting the table.
    pub sheet_name: String,
    /// Part name of the table definition, e.g. `xl/tables/table1.xml`.
    pub table_part: String,
    /// Part name of the hosting worksheet.
    pub worksheet_part: String,
    /// The table's `ref` range as stored, e.g. `A1:D10`.
    pub range_ref: String,
}

/// Snapshot of the package's relationship graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkbookMap {
    /// Path of the package this map was resolved from.
    pub template_path: PathBuf,
    /// Worksheets in workbook order.
    pub worksheets: Vec<WorksheetInfo>,
    /// Tables keyed by table name.
    pub tables: BTreeMap<String, TableRef>,
    /// Pivot cache definition parts keyed by workbook relationship id.
    pub pivot_caches: BTreeMap<String, String>,
    /// Shared strings part, when the package has one.
    pub shared_strings_part: Option<String>,
}

impl WorkbookMap {
    /// Looks up a worksheet by its tab name.
    pub fn worksheet(&self, name: &str) -> Option<&WorksheetInfo> {
        self.worksheets.iter().find(|ws| ws.name == name)
    }

    /// Looks up a table by name.
    pub fn table(&self, name: &str) -> Option<&TableRef> {
        self.tables.get(name)
    }
}
