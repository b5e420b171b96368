use thiserror::Error;

pub use crate::a1::A1Error;

/// Errors surfaced by package resolution, cell injection, and cache sync.
#[derive(Debug, Error)]
pub enum XlsxError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("xml parse error: {0}")]
    XmlParse(#[from] roxmltree::Error),
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("xml attribute error: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),
    #[error("xml deserialize error: {0}")]
    XmlDe(#[from] quick_xml::DeError),
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error(transparent)]
    A1(#[from] A1Error),

    /// A required archive member is absent.
    #[error("missing xlsx part: {0}")]
    MissingPart(String),
    /// A part is reachable but lacks a required child element.
    #[error("{part}: missing <{element}> element")]
    MissingElement {
        part: String,
        element: &'static str,
    },
    /// The column container exists but declares no usable column names.
    #[error("table {0}: <tableColumns> declares no named columns")]
    NoTableColumns(String),
    #[error("expected a <table> part, found <{0}> root")]
    NotATable(String),
    #[error("table not found: {0}")]
    TableNotFound(String),
    /// Strict-mode resolution failure: a sheet points at a relationship id
    /// the rels part does not declare (or declares as external).
    #[error("{part}: relationship {rel_id} does not resolve to a worksheet part")]
    UnresolvedRel { part: String, rel_id: String },
    #[error("worksheet has no <sheetData> element")]
    MissingSheetData,
    #[error("injection origin must be 1-based, got row {row}, column {col}")]
    InvalidOrigin { row: u32, col: u32 },
    #[error("missing required attribute: {0}")]
    MissingAttr(&'static str),
    #[error("invalid xlsx data: {0}")]
    Invalid(String),
}
