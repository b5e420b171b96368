//! Table definition parts (`xl/tables/tableN.xml`).
//!
//! Reading goes through serde so unknown attributes and child elements pass
//! straight through the parser; the write side edits the part's tree in
//! place so everything this module does not understand survives untouched.

use serde::Deserialize;

use crate::error::XlsxError;
use crate::xml::XmlElement;

#[derive(Debug, Deserialize)]
struct TableXml {
    #[serde(rename = "@name")]
    name: Option<String>,
    #[serde(rename = "@displayName")]
    display_name: Option<String>,
    #[serde(rename = "@ref")]
    range_ref: Option<String>,
    #[serde(rename = "tableColumns")]
    table_columns: Option<TableColumnsXml>,
}

#[derive(Debug, Deserialize)]
struct TableColumnsXml {
    #[serde(rename = "tableColumn", default)]
    table_column: Vec<TableColumnXml>,
}

#[derive(Debug, Deserialize)]
struct TableColumnXml {
    #[serde(rename = "@name")]
    name: Option<String>,
}

/// Parsed table definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMeta {
    pub name: String,
    pub range_ref: String,
    /// Column names in definition order. `None` when the part has no
    /// `tableColumns` element at all; columns without a usable name are
    /// skipped.
    pub columns: Option<Vec<String>>,
}

impl TableMeta {
    /// The column list, or an error when the definition cannot drive a field
    /// sync: a missing `tableColumns` container names the part, an empty one
    /// names the table.
    pub fn require_columns(&self, part: &str) -> Result<&[String], XlsxError> {
        match &self.columns {
            None => Err(XlsxError::MissingElement {
                part: part.to_string(),
                element: "tableColumns",
            }),
            Some(columns) if columns.is_empty() => {
                Err(XlsxError::NoTableColumns(self.name.clone()))
            }
            Some(columns) => Ok(columns),
        }
    }
}

/// Parses a table definition part.
pub fn parse_table(bytes: &[u8]) -> Result<TableMeta, XlsxError> {
    let text = std::str::from_utf8(bytes)?;
    let xml: TableXml = quick_xml::de::from_str(text)?;
    let name = xml
        .name
        .or(xml.display_name)
        .ok_or(XlsxError::MissingAttr("name"))?;
    let range_ref = xml.range_ref.ok_or(XlsxError::MissingAttr("ref"))?;
    let columns = xml.table_columns.map(|cols| {
        cols.table_column
            .into_iter()
            .filter_map(|col| col.name.filter(|name| !name.is_empty()))
            .collect()
    });
    Ok(TableMeta {
        name,
        range_ref,
        columns,
    })
}

/// Rewrites the table's `ref` range, keeping `autoFilter` in step when the
/// definition carries one.
pub fn set_table_range(tree: &mut XmlElement, range: &str) -> Result<(), XlsxError> {
    if tree.name.local != "table" {
        return Err(XlsxError::NotATable(tree.name.local.clone()));
    }
    tree.set_attr("ref", range);
    let ns = tree.main_namespace().to_string();
    if let Some(auto_filter) = tree.child_mut(&ns, "autoFilter") {
        auto_filter.set_attr("ref", range);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TABLE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<table xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" id="1" name="Sales" displayName="Sales" ref="A1:C4" totalsRowShown="0">
  <autoFilter ref="A1:C4"/>
  <tableColumns count="3">
    <tableColumn id="1" name="Region"/>
    <tableColumn id="2" name="Units"/>
    <tableColumn id="3" name="Total"/>
  </tableColumns>
  <tableStyleInfo name="TableStyleMedium2" showRowStripes="1"/>
</table>"#;

    #[test]
    fn parses_name_ref_and_columns() {
        let table = parse_table(TABLE_XML.as_bytes()).unwrap();
        assert_eq!(table.name, "Sales");
        assert_eq!(table.range_ref, "A1:C4");
        assert_eq!(
            table.columns,
            Some(vec![
                "Region".to_string(),
                "Units".to_string(),
                "Total".to_string()
            ])
        );
        assert_eq!(
            table.require_columns("xl/tables/table1.xml").unwrap(),
            &["Region", "Units", "Total"]
        );
    }

    #[test]
    fn display_name_backstops_a_missing_name() {
        let xml = r#"<table displayName="Budget" ref="A1:B2"><tableColumns count="1"><tableColumn id="1" name="Amount"/></tableColumns></table>"#;
        let table = parse_table(xml.as_bytes()).unwrap();
        assert_eq!(table.name, "Budget");
    }

    #[test]
    fn absent_table_columns_is_distinguished_from_empty() {
        let no_container = parse_table(br#"<table name="T" ref="A1:B2"/>"#).unwrap();
        assert_eq!(no_container.columns, None);
        let err = no_container
            .require_columns("xl/tables/table1.xml")
            .unwrap_err();
        assert!(matches!(
            err,
            XlsxError::MissingElement {
                element: "tableColumns",
                ..
            }
        ));

        let empty =
            parse_table(br#"<table name="T" ref="A1:B2"><tableColumns count="0"/></table>"#)
                .unwrap();
        assert_eq!(empty.columns, Some(vec![]));
        let err = empty.require_columns("xl/tables/table1.xml").unwrap_err();
        match err {
            XlsxError::NoTableColumns(name) => assert_eq!(name, "T"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unnamed_columns_are_skipped() {
        let xml = r#"<table name="T" ref="A1:C2"><tableColumns count="3"><tableColumn id="1" name="A"/><tableColumn id="2"/><tableColumn id="3" name="C"/></tableColumns></table>"#;
        let table = parse_table(xml.as_bytes()).unwrap();
        assert_eq!(table.columns, Some(vec!["A".to_string(), "C".to_string()]));
    }

    #[test]
    fn range_updates_touch_auto_filter_too() {
        let mut tree = XmlElement::parse(TABLE_XML.as_bytes()).unwrap();
        set_table_range(&mut tree, "A1:C10").unwrap();
        assert_eq!(tree.attr("ref"), Some("A1:C10"));
        let ns = tree.main_namespace().to_string();
        let auto_filter = tree.child(&ns, "autoFilter").unwrap();
        assert_eq!(auto_filter.attr("ref"), Some("A1:C10"));
    }

    #[test]
    fn refuses_to_edit_a_non_table_root() {
        let mut tree = XmlElement::parse(b"<worksheet/>").unwrap();
        let err = set_table_range(&mut tree, "A1:B2").unwrap_err();
        match err {
            XlsxError::NotATable(root) => assert_eq!(root, "worksheet"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
