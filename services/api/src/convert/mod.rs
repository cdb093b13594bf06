//! services/api/src/convert/mod.rs
//!
//! Document format conversion. Text extraction is best-effort: a malformed
//! document yields empty (or partial) text plus a warning instead of an
//! error, and the caller decides whether to surface it. Markdown to DOCX is
//! the one conversion that propagates failures, since a binary document has
//! no meaningful partial output.

mod docx;
mod markdown;
mod pdf;
mod pptx;

pub use markdown::markdown_to_docx;

use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::Write;
use std::path::Path;
use tempfile::TempPath;

/// MIME type of generated DOCX downloads.
pub const DOCX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Errors from the Markdown to DOCX conversion.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("Failed to assemble DOCX package: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The document formats the text extractors accept. Anything outside this
/// set is rejected upstream before a converter (or a storage download) runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Pdf,
    Docx,
    Pptx,
    Txt,
}

impl SourceFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "pdf" => Some(SourceFormat::Pdf),
            "docx" => Some(SourceFormat::Docx),
            "pptx" => Some(SourceFormat::Pptx),
            "txt" => Some(SourceFormat::Txt),
            _ => None,
        }
    }
}

/// What a text extractor produced. `warning` distinguishes "empty because
/// the document is empty" from "empty because extraction failed".
#[derive(Debug, Default)]
pub struct Extraction {
    pub text: String,
    pub warning: Option<String>,
}

impl Extraction {
    fn failed(warning: String) -> Self {
        Self {
            text: String::new(),
            warning: Some(warning),
        }
    }
}

/// Extracts plain text from the file at `path`. Never fails.
pub fn extract_text(path: &Path, format: SourceFormat) -> Extraction {
    match format {
        SourceFormat::Pdf => pdf::extract(path),
        SourceFormat::Docx => docx::extract(path),
        SourceFormat::Pptx => pptx::extract(path),
        SourceFormat::Txt => extract_txt(path),
    }
}

fn extract_txt(path: &Path) -> Extraction {
    match std::fs::read(path) {
        Ok(bytes) => Extraction {
            text: String::from_utf8_lossy(&bytes).into_owned(),
            warning: None,
        },
        Err(e) => Extraction::failed(format!("Failed to read TXT file: {}", e)),
    }
}

/// Writes `content` to a fresh temp file named after the triggering file id,
/// so concurrent requests for different files never collide. The returned
/// guard deletes the file when dropped, on every exit path.
pub fn write_temp(file_id: &str, extension: &str, content: &[u8]) -> std::io::Result<TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix(&format!("{}-", file_id))
        .suffix(&format!(".{}", extension))
        .tempfile()?;
    file.write_all(content)?;
    Ok(file.into_temp_path())
}

// Shared by the DOCX and PPTX extractors: both package text as runs inside
// <w:t>/<a:t> elements grouped into paragraph elements.
fn collect_tagged_text(xml: &str, text_tag: &str, paragraph_tag: &str) -> String {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_text_run = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == text_tag.as_bytes() => {
                in_text_run = true;
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == text_tag.as_bytes() => {
                in_text_run = false;
            }
            Ok(Event::Text(t)) if in_text_run => {
                if let Ok(run) = t.unescape() {
                    text.push_str(&run);
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == paragraph_tag.as_bytes() => {
                text.push('\n');
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_mapping_covers_exactly_the_supported_set() {
        assert_eq!(SourceFormat::from_extension("pdf"), Some(SourceFormat::Pdf));
        assert_eq!(SourceFormat::from_extension("docx"), Some(SourceFormat::Docx));
        assert_eq!(SourceFormat::from_extension("pptx"), Some(SourceFormat::Pptx));
        assert_eq!(SourceFormat::from_extension("txt"), Some(SourceFormat::Txt));
        assert_eq!(SourceFormat::from_extension("csv"), None);
        assert_eq!(SourceFormat::from_extension("md"), None);
    }

    #[test]
    fn txt_extraction_reads_the_file_verbatim() {
        let path = write_temp("t1", "txt", "hello\nworld".as_bytes()).unwrap();
        let extraction = extract_text(&path, SourceFormat::Txt);
        assert_eq!(extraction.text, "hello\nworld");
        assert!(extraction.warning.is_none());
    }

    #[test]
    fn txt_extraction_is_lossy_on_invalid_utf8() {
        let path = write_temp("t2", "txt", &[0x68, 0x69, 0xFF, 0x21]).unwrap();
        let extraction = extract_text(&path, SourceFormat::Txt);
        assert!(extraction.text.starts_with("hi"));
        assert!(extraction.warning.is_none());
    }

    #[test]
    fn malformed_documents_yield_empty_text_and_a_warning_not_an_error() {
        let path = write_temp("t3", "pdf", b"this is not a pdf").unwrap();
        for format in [SourceFormat::Pdf, SourceFormat::Docx, SourceFormat::Pptx] {
            let extraction = extract_text(&path, format);
            assert_eq!(extraction.text, "");
            assert!(extraction.warning.is_some());
        }
    }

    #[test]
    fn temp_files_disappear_when_the_guard_drops() {
        let path_buf;
        {
            let guard = write_temp("cleanup", "txt", b"x").unwrap();
            path_buf = guard.to_path_buf();
            assert!(path_buf.exists());
        }
        assert!(!path_buf.exists());
    }

    #[test]
    fn temp_file_names_carry_the_file_id() {
        let guard = write_temp("abc123", "pdf", b"x").unwrap();
        let name = guard.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("abc123-"));
        assert!(name.ends_with(".pdf"));
    }

    #[test]
    fn tagged_text_collects_runs_and_paragraph_breaks() {
        let xml = r#"<doc><w:p><w:r><w:t>Hello </w:t></w:r><w:r><w:t>world</w:t></w:r></w:p><w:p><w:r><w:t>Next &amp; more</w:t></w:r></w:p></doc>"#;
        assert_eq!(
            collect_tagged_text(xml, "w:t", "w:p"),
            "Hello world\nNext & more\n"
        );
    }
}
