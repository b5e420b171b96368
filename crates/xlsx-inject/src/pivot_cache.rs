//! Keeps pivot cache definitions in step with their backing table.
//!
//! A pivot cache built from a table names that table in its
//! `<cacheSource><worksheetSource name="..."/></cacheSource>`. When columns
//! are added to the table, the cache's `<cacheFields>` list goes stale and
//! Excel refuses to refresh the pivot. [`sync_cache_fields`] appends the
//! missing field stubs; pairing that with a `refreshOnLoad` flag makes Excel
//! rebuild the cache contents on open.

use std::collections::BTreeMap;

use crate::error::XlsxError;
use crate::model::WorkbookMap;
use crate::package::{open_package, read_part_bytes, read_xml_part};
use crate::tables::parse_table;
use crate::xml::XmlElement;

/// Appends cache fields for any of `table_name`'s columns the caches do not
/// declare yet.
///
/// Caches whose worksheet source names a different table are left alone, as
/// are caches that already declare every column. The returned map holds only
/// the mutated trees, keyed by part name; nothing is written back to the
/// package.
pub fn sync_cache_fields(
    map: &WorkbookMap,
    table_name: &str,
) -> Result<BTreeMap<String, XmlElement>, XlsxError> {
    let table_ref = map
        .table(table_name)
        .ok_or_else(|| XlsxError::TableNotFound(table_name.to_string()))?;

    let mut changed = BTreeMap::new();
    if map.pivot_caches.is_empty() {
        return Ok(changed);
    }

    let mut archive = open_package(&map.template_path)?;
    let table_bytes = read_part_bytes(&mut archive, &table_ref.table_part)?;
    let table = parse_table(&table_bytes)?;
    let columns = table.require_columns(&table_ref.table_part)?.to_vec();

    for part in map.pivot_caches.values() {
        let mut cache = read_xml_part(&mut archive, part)?;
        if cache_source_table_name(&cache) != Some(table_name) {
            continue;
        }
        if append_missing_cache_fields(&mut cache, part, &columns)? {
            changed.insert(part.clone(), cache);
        }
    }
    Ok(changed)
}

/// Sets `refreshOnLoad="1"` on a pivot cache definition root, returning
/// whether the tree changed.
pub fn ensure_refresh_on_load(cache: &mut XmlElement) -> bool {
    match cache.attr("refreshOnLoad") {
        Some("1") | Some("true") => false,
        _ => {
            cache.set_attr("refreshOnLoad", "1");
            true
        }
    }
}

/// The table this cache feeds from, if its source form declares one.
fn cache_source_table_name(cache: &XmlElement) -> Option<&str> {
    let ns = cache.main_namespace();
    cache
        .child(ns, "cacheSource")?
        .child(ns, "worksheetSource")?
        .attr("name")
}

/// Appends one `<cacheField>` stub per missing column, preserving existing
/// fields and their order, and refreshes the container's `count`.
fn append_missing_cache_fields(
    cache: &mut XmlElement,
    part: &str,
    columns: &[String],
) -> Result<bool, XlsxError> {
    let ns = cache.main_namespace().to_string();
    let fields = cache
        .child_mut(&ns, "cacheFields")
        .ok_or_else(|| XlsxError::MissingElement {
            part: part.to_string(),
            element: "cacheFields",
        })?;

    let existing: Vec<String> = fields
        .children_in(&ns, "cacheField")
        .filter_map(|field| field.attr("name").map(str::to_string))
        .collect();

    let mut added = false;
    for column in columns {
        if existing.iter().any(|name| name == column) {
            continue;
        }
        let mut field = XmlElement::in_ns(&ns, "cacheField");
        field.set_attr("name", column.clone());
        let mut shared_items = XmlElement::in_ns(&ns, "sharedItems");
        shared_items.set_attr("count", "0");
        field.push_element(shared_items);
        fields.push_element(field);
        added = true;
    }
    if added {
        let count = fields.children_in(&ns, "cacheField").count();
        fields.set_attr("count", count.to_string());
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use crate::xml::NS_MAIN;

    const CACHE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<pivotCacheDefinition xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" r:id="rId1" recordCount="3">
  <cacheSource type="worksheet">
    <worksheetSource name="Sales"/>
  </cacheSource>
  <cacheFields count="2">
    <cacheField name="Region" numFmtId="0"><sharedItems count="2"/></cacheField>
    <cacheField name="Units" numFmtId="0"><sharedItems containsSemiMixedTypes="0" containsString="0" containsNumber="1"/></cacheField>
  </cacheFields>
</pivotCacheDefinition>"#;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn field_names(cache: &XmlElement) -> Vec<String> {
        cache
            .child(NS_MAIN, "cacheFields")
            .unwrap()
            .children_in(NS_MAIN, "cacheField")
            .map(|f| f.attr("name").unwrap().to_string())
            .collect()
    }

    #[test]
    fn reads_the_worksheet_source_name() {
        let cache = XmlElement::parse(CACHE_XML.as_bytes()).unwrap();
        assert_eq!(cache_source_table_name(&cache), Some("Sales"));
    }

    #[test]
    fn appends_missing_fields_in_column_order() {
        let mut cache = XmlElement::parse(CACHE_XML.as_bytes()).unwrap();
        let added = append_missing_cache_fields(
            &mut cache,
            "xl/pivotCache/pivotCacheDefinition1.xml",
            &columns(&["Region", "Units", "Total", "Margin"]),
        )
        .unwrap();

        assert!(added);
        assert_eq!(field_names(&cache), ["Region", "Units", "Total", "Margin"]);
        let fields = cache.child(NS_MAIN, "cacheFields").unwrap();
        assert_eq!(fields.attr("count"), Some("4"));

        // New stubs carry an empty sharedItems marker.
        let total = fields
            .children_in(NS_MAIN, "cacheField")
            .find(|f| f.attr("name") == Some("Total"))
            .unwrap();
        let shared = total.child(NS_MAIN, "sharedItems").unwrap();
        assert_eq!(shared.attr("count"), Some("0"));

        // Existing fields keep their own sharedItems untouched.
        let region = fields
            .children_in(NS_MAIN, "cacheField")
            .find(|f| f.attr("name") == Some("Region"))
            .unwrap();
        assert_eq!(
            region.child(NS_MAIN, "sharedItems").unwrap().attr("count"),
            Some("2")
        );
    }

    #[test]
    fn complete_caches_report_no_change() {
        let mut cache = XmlElement::parse(CACHE_XML.as_bytes()).unwrap();
        let added = append_missing_cache_fields(
            &mut cache,
            "xl/pivotCache/pivotCacheDefinition1.xml",
            &columns(&["Region", "Units"]),
        )
        .unwrap();
        assert!(!added);
        // count is left exactly as the template had it.
        let fields = cache.child(NS_MAIN, "cacheFields").unwrap();
        assert_eq!(fields.attr("count"), Some("2"));
    }

    #[test]
    fn missing_cache_fields_container_is_structural() {
        let mut cache = XmlElement::parse(
            br#"<pivotCacheDefinition xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><cacheSource type="worksheet"><worksheetSource name="Sales"/></cacheSource></pivotCacheDefinition>"#,
        )
        .unwrap();
        let err = append_missing_cache_fields(
            &mut cache,
            "xl/pivotCache/pivotCacheDefinition1.xml",
            &columns(&["Region"]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            XlsxError::MissingElement {
                element: "cacheFields",
                ..
            }
        ));
    }

    #[test]
    fn refresh_on_load_is_set_once() {
        let mut cache = XmlElement::parse(CACHE_XML.as_bytes()).unwrap();
        assert!(ensure_refresh_on_load(&mut cache));
        assert_eq!(cache.attr("refreshOnLoad"), Some("1"));
        assert!(!ensure_refresh_on_load(&mut cache));

        let mut already = XmlElement::parse(
            br#"<pivotCacheDefinition refreshOnLoad="true"/>"#,
        )
        .unwrap();
        assert!(!ensure_refresh_on_load(&mut already));
        assert_eq!(already.attr("refreshOnLoad"), Some("true"));
    }
}
