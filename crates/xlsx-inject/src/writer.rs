//! Streams an edited copy of a package to disk.
//!
//! The template archive is copied member by member in its original order.
//! Members with a replacement are re-deflated from the new bytes; everything
//! else is copied raw, compressed payload and all, so untouched parts come
//! through bit-identical. Replacements that name a part the template lacks
//! are appended after the copied members.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::error::XlsxError;
use crate::package::open_package;

/// Writes `template_path` to `output_path` with `replacements` (part name to
/// serialized bytes) substituted in.
pub fn write_package(
    template_path: &Path,
    output_path: &Path,
    replacements: &BTreeMap<String, Vec<u8>>,
) -> Result<(), XlsxError> {
    let mut archive = open_package(template_path)?;
    let file = File::create(output_path)?;
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);

    let mut pending: BTreeMap<&str, &[u8]> = replacements
        .iter()
        .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
        .collect();

    for idx in 0..archive.len() {
        let entry = archive.by_index_raw(idx)?;
        let name = entry.name().to_string();
        match pending.remove(name.as_str()) {
            Some(bytes) => {
                drop(entry);
                writer.start_file(name, options)?;
                writer.write_all(bytes)?;
            }
            None => writer.raw_copy_file(entry)?,
        }
    }
    // Parts the template never had, in name order.
    for (name, bytes) in pending {
        writer.start_file(name, options)?;
        writer.write_all(bytes)?;
    }
    writer.finish()?;
    Ok(())
}
