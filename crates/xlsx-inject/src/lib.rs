//! Post-processing for SpreadsheetML (`.xlsx`) packages.
//!
//! The crate does three things to a finished template workbook:
//!
//! - resolve the package's relationship graph (workbook, worksheets, tables,
//!   pivot caches) into an immutable [`WorkbookMap`],
//! - inject typed rows of data into a worksheet part with [`inject_rows`],
//! - bring pivot cache field lists back in step with a grown table via
//!   [`sync_cache_fields`].
//!
//! Parts are edited as parsed XML trees and written back with
//! [`write_package`], which streams the rest of the template through
//! untouched. Nothing here evaluates formulas or renders styles; the target
//! is report generation against a template authored in Excel.

pub mod a1;
pub mod error;
pub mod inject;
pub mod model;
pub mod openxml;
pub mod package;
pub mod pivot_cache;
pub mod tables;
pub mod workbook;
pub mod writer;
pub mod xml;

pub use a1::{
    build_a1_cell, build_a1_range, column_index_to_letter, column_letter_to_index,
    parse_a1_cell, parse_a1_range, CellAddress, RangeAddress,
};
pub use error::{A1Error, XlsxError};
pub use inject::{inject_rows, CellValue};
pub use model::{TableRef, WorkbookMap, WorksheetInfo};
pub use pivot_cache::{ensure_refresh_on_load, sync_cache_fields};
pub use tables::{parse_table, set_table_range, TableMeta};
pub use workbook::{
    build_workbook_map, build_workbook_map_with_options, ResolveOptions, WORKBOOK_PART,
};
pub use writer::write_package;
pub use xml::{XmlElement, NS_MAIN};
