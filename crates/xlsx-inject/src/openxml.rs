//! OPC relationship plumbing: `.rels` parsing and part-name resolution.
//!
//! Every part may carry a sibling relationships part under `_rels/`; targets
//! in it are zip part names expressed relative to the source part's
//! directory. This module turns those targets back into absolute part names
//! so the rest of the crate only ever deals in full names like
//! `xl/worksheets/sheet1.xml`.

use crate::error::XlsxError;

/// Namespace of `.rels` documents.
pub const NS_PACKAGE_RELS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships";

pub const REL_TYPE_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
pub const REL_TYPE_TABLE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/table";
pub const REL_TYPE_PIVOT_CACHE_DEFINITION: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/pivotCacheDefinition";
pub const REL_TYPE_SHARED_STRINGS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings";

/// One `<Relationship>` entry from a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub target_mode: Option<String>,
}

impl Relationship {
    /// External targets (hyperlinks, linked workbooks) point outside the
    /// package and never resolve to a part name.
    pub fn is_external(&self) -> bool {
        self.target_mode.as_deref() == Some("External")
    }
}

/// Name of the relationships part attached to `part`, whether or not the
/// package contains one.
pub fn rels_part_name(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolves a relationship target against its source part's directory.
///
/// Fragments are stripped (a fragment-only target names the source part
/// itself), a leading `/` marks an already-absolute name, and `.`/`..`
/// segments are folded away. The result is a zip part name with no leading
/// slash.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    let target = match target.split_once('#') {
        Some((body, _)) => body,
        None => target,
    };
    if target.is_empty() {
        return source_part.to_string();
    }
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Parses a `.rels` part. `Id`, `Type` and `Target` are required on every
/// entry; anything else in the document is ignored.
pub fn parse_relationships(bytes: &[u8]) -> Result<Vec<Relationship>, XlsxError> {
    let text = std::str::from_utf8(bytes)?;
    let doc = roxmltree::Document::parse(text)?;
    let mut rels = Vec::new();
    for node in doc.root_element().children() {
        if !node.is_element() || node.tag_name().name() != "Relationship" {
            continue;
        }
        let id = node.attribute("Id").ok_or(XlsxError::MissingAttr("Id"))?;
        let rel_type = node
            .attribute("Type")
            .ok_or(XlsxError::MissingAttr("Type"))?;
        let target = node
            .attribute("Target")
            .ok_or(XlsxError::MissingAttr("Target"))?;
        rels.push(Relationship {
            id: id.to_string(),
            rel_type: rel_type.to_string(),
            target: target.to_string(),
            target_mode: node.attribute("TargetMode").map(str::to_string),
        });
    }
    Ok(rels)
}

/// Looks up `rel_id` and resolves its target to an absolute part name.
/// Returns `None` when the id is unknown or the target is external.
pub fn resolve_relationship_target(
    source_part: &str,
    rels: &[Relationship],
    rel_id: &str,
) -> Option<String> {
    let rel = rels.iter().find(|r| r.id == rel_id)?;
    if rel.is_external() {
        return None;
    }
    Some(resolve_target(source_part, &rel.target))
}
