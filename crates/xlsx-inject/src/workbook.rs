//! Resolves a package's relationship graph into a [`WorkbookMap`].
//!
//! Resolution starts at `xl/workbook.xml`, joins each `<sheet>` against the
//! workbook's `.rels` part, then walks every worksheet's own `.rels` to find
//! the table definitions it hosts. Pivot cache definitions and the shared
//! strings part are picked up from the workbook relationships in the same
//! pass. The map records part names only; no part content is retained.

use std::collections::BTreeMap;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::read::ZipArchive;

use crate::error::XlsxError;
use crate::model::{TableRef, WorkbookMap, WorksheetInfo};
use crate::openxml::{
    parse_relationships, rels_part_name, resolve_relationship_target, resolve_target,
    REL_TYPE_PIVOT_CACHE_DEFINITION, REL_TYPE_SHARED_STRINGS,
};
use crate::package::{open_package, read_part_bytes, read_part_bytes_optional, read_xml_part};
use crate::tables::parse_table;
use crate::xml::NS_DOC_RELS;

/// Fixed location of the workbook part.
pub const WORKBOOK_PART: &str = "xl/workbook.xml";

/// Policy knobs for [`build_workbook_map_with_options`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolveOptions {
    /// Fail resolution when a `<sheet>` references a relationship id the
    /// workbook rels do not declare. The default skips such sheets, which
    /// matches how consumers treat packages with stale chartsheet entries.
    pub strict_sheet_rels: bool,
}

/// Resolves the package at `path` with default options.
pub fn build_workbook_map(path: &Path) -> Result<WorkbookMap, XlsxError> {
    build_workbook_map_with_options(path, ResolveOptions::default())
}

/// Resolves the package at `path` into an immutable [`WorkbookMap`].
pub fn build_workbook_map_with_options(
    path: &Path,
    options: ResolveOptions,
) -> Result<WorkbookMap, XlsxError> {
    let mut archive = open_package(path)?;

    let workbook_bytes = read_part_bytes(&mut archive, WORKBOOK_PART)?;
    let sheets = parse_workbook_sheets(&workbook_bytes)?;
    let rels_bytes = read_part_bytes(&mut archive, &rels_part_name(WORKBOOK_PART))?;
    let rels = parse_relationships(&rels_bytes)?;

    let mut worksheets = Vec::new();
    for sheet in sheets {
        match resolve_relationship_target(WORKBOOK_PART, &rels, &sheet.rel_id) {
            Some(part) => worksheets.push(WorksheetInfo {
                name: sheet.name,
                sheet_id: sheet.sheet_id,
                part,
                rel_id: sheet.rel_id,
            }),
            None if options.strict_sheet_rels => {
                return Err(XlsxError::UnresolvedRel {
                    part: WORKBOOK_PART.to_string(),
                    rel_id: sheet.rel_id,
                });
            }
            None => {}
        }
    }

    let mut pivot_caches = BTreeMap::new();
    let mut shared_strings_part = None;
    for rel in &rels {
        if rel.is_external() {
            continue;
        }
        if rel.rel_type == REL_TYPE_PIVOT_CACHE_DEFINITION {
            pivot_caches.insert(rel.id.clone(), resolve_target(WORKBOOK_PART, &rel.target));
        } else if rel.rel_type == REL_TYPE_SHARED_STRINGS && shared_strings_part.is_none() {
            shared_strings_part = Some(resolve_target(WORKBOOK_PART, &rel.target));
        }
    }

    let mut tables = BTreeMap::new();
    for worksheet in &worksheets {
        collect_sheet_tables(&mut archive, worksheet, &mut tables)?;
    }

    Ok(WorkbookMap {
        template_path: path.to_path_buf(),
        worksheets,
        tables,
        pivot_caches,
        shared_strings_part,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SheetEntry {
    name: String,
    sheet_id: u32,
    rel_id: String,
}

/// Pulls the `<sheet>` entries out of the workbook part in document order.
fn parse_workbook_sheets(bytes: &[u8]) -> Result<Vec<SheetEntry>, XlsxError> {
    let text = std::str::from_utf8(bytes)?;
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut sheets = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                sheets.push(parse_sheet_element(&e)?);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(sheets)
}

fn parse_sheet_element(e: &BytesStart<'_>) -> Result<SheetEntry, XlsxError> {
    let mut name = None;
    let mut sheet_id = None;
    let mut rel_id = None;
    for attr in e.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"name" => name = Some(attr.unescape_value()?.into_owned()),
            b"sheetId" => {
                let raw = attr.unescape_value()?;
                let parsed = raw.parse::<u32>().map_err(|_| {
                    XlsxError::Invalid(format!("sheetId {raw:?} is not an integer"))
                })?;
                sheet_id = Some(parsed);
            }
            _ if attr.key.prefix().is_some() && attr.key.local_name().as_ref() == b"id" => {
                rel_id = Some(attr.unescape_value()?.into_owned());
            }
            _ => {}
        }
    }
    Ok(SheetEntry {
        name: name.ok_or(XlsxError::MissingAttr("name"))?,
        sheet_id: sheet_id.ok_or(XlsxError::MissingAttr("sheetId"))?,
        rel_id: rel_id.ok_or(XlsxError::MissingAttr("r:id"))?,
    })
}

/// Adds every table reachable from one worksheet's relationships to `out`.
///
/// A worksheet without a `.rels` sibling, or without a `<tableParts>` block,
/// simply hosts no tables. A `<tablePart>` whose id does not resolve is
/// skipped; a resolved table part that is absent from the archive is a
/// structural failure.
fn collect_sheet_tables<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    worksheet: &WorksheetInfo,
    out: &mut BTreeMap<String, TableRef>,
) -> Result<(), XlsxError> {
    let rels_name = rels_part_name(&worksheet.part);
    let Some(rels_bytes) = read_part_bytes_optional(archive, &rels_name)? else {
        return Ok(());
    };
    let rels = parse_relationships(&rels_bytes)?;

    let sheet_tree = read_xml_part(archive, &worksheet.part)?;
    let ns = sheet_tree.main_namespace().to_string();
    let Some(table_parts) = sheet_tree.descendant(&ns, "tableParts") else {
        return Ok(());
    };

    for table_part in table_parts.children_in(&ns, "tablePart") {
        let Some(rel_id) = table_part.attr_in(NS_DOC_RELS, "id") else {
            continue;
        };
        let Some(part) = resolve_relationship_target(&worksheet.part, &rels, rel_id) else {
            continue;
        };
        let bytes = read_part_bytes(archive, &part)?;
        let table = parse_table(&bytes)?;
        out.insert(
            table.name.clone(),
            TableRef {
                name: table.name,
                sheet_name: worksheet.name.clone(),
                table_part: part,
                worksheet_part: worksheet.part.clone(),
                range_ref: table.range_ref,
            },
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WORKBOOK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Data" sheetId="1" r:id="rId1"/>
    <sheet name="Summary &amp; Notes" sheetId="5" state="hidden" r:id="rId2"/>
  </sheets>
  <pivotCaches>
    <pivotCache cacheId="0" r:id="rId4"/>
  </pivotCaches>
</workbook>"#;

    #[test]
    fn reads_sheets_in_document_order() {
        let sheets = parse_workbook_sheets(WORKBOOK_XML.as_bytes()).unwrap();
        // Entities in names are unescaped and extra attributes are ignored.
        assert_eq!(
            sheets,
            vec![
                SheetEntry {
                    name: "Data".to_string(),
                    sheet_id: 1,
                    rel_id: "rId1".to_string(),
                },
                SheetEntry {
                    name: "Summary & Notes".to_string(),
                    sheet_id: 5,
                    rel_id: "rId2".to_string(),
                },
            ]
        );
    }

    #[test]
    fn sheet_without_rel_id_is_an_error() {
        let xml = br#"<workbook><sheets><sheet name="Data" sheetId="1"/></sheets></workbook>"#;
        let err = parse_workbook_sheets(xml).unwrap_err();
        assert!(matches!(err, XlsxError::MissingAttr("r:id")));
    }

    #[test]
    fn sheet_with_bad_sheet_id_is_an_error() {
        let xml =
            br#"<workbook><sheets><sheet name="Data" sheetId="one" r:id="rId1"/></sheets></workbook>"#;
        let err = parse_workbook_sheets(xml).unwrap_err();
        assert!(matches!(err, XlsxError::Invalid(_)));
    }
}
