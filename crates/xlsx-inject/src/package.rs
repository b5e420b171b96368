//! Zip-level access to package parts.
//!
//! Parts are addressed by their full zip entry name (`xl/workbook.xml`).
//! Lookups scan the archive's name table once and then read by index, which
//! avoids holding a borrow of the archive across the read. A leading-slash
//! entry name, which some producers emit, is accepted as a fallback match.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use zip::read::ZipArchive;

use crate::error::XlsxError;
use crate::xml::XmlElement;

/// Opens the package at `path` for reading.
pub fn open_package(path: &Path) -> Result<ZipArchive<File>, XlsxError> {
    let file = File::open(path)?;
    Ok(ZipArchive::new(file)?)
}

fn part_index<R: Read + Seek>(archive: &ZipArchive<R>, name: &str) -> Option<usize> {
    let mut slash_variant = None;
    for (idx, entry_name) in archive.file_names().enumerate() {
        if entry_name == name {
            return Some(idx);
        }
        if slash_variant.is_none() && entry_name.strip_prefix('/') == Some(name) {
            slash_variant = Some(idx);
        }
    }
    slash_variant
}

/// Reads one part's raw bytes. Fails with [`XlsxError::MissingPart`] when the
/// archive has no entry with that name.
pub fn read_part_bytes<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Vec<u8>, XlsxError> {
    match read_part_bytes_optional(archive, name)? {
        Some(bytes) => Ok(bytes),
        None => Err(XlsxError::MissingPart(name.to_string())),
    }
}

/// Reads one part's raw bytes, or `None` when the part is absent. Used for
/// parts the format makes optional, like a worksheet's `.rels` sibling.
pub fn read_part_bytes_optional<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, XlsxError> {
    let Some(idx) = part_index(archive, name) else {
        return Ok(None);
    };
    let mut entry = archive.by_index(idx)?;
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

/// Reads and parses one XML part.
pub fn read_xml_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<XmlElement, XlsxError> {
    let bytes = read_part_bytes(archive, name)?;
    XmlElement::parse(&bytes)
}
