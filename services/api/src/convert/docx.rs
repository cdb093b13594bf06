//! services/api/src/convert/docx.rs

use super::{collect_tagged_text, Extraction};
use std::io::Read;
use std::path::Path;

/// Pulls text out of `word/document.xml`. Runs (`<w:t>`) within a paragraph
/// concatenate, each closed `<w:p>` becomes a newline.
pub(super) fn extract(path: &Path) -> Extraction {
    let xml = match read_document_xml(path) {
        Ok(xml) => xml,
        Err(e) => return Extraction::failed(format!("Failed to read DOCX file: {}", e)),
    };
    Extraction {
        text: collect_tagged_text(&xml, "w:t", "w:p"),
        warning: None,
    }
}

fn read_document_xml(path: &Path) -> std::io::Result<String> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let mut entry = archive
        .by_name("word/document.xml")
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e))?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(xml)
}
