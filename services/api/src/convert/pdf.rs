//! services/api/src/convert/pdf.rs

use super::Extraction;
use lopdf::Document;
use std::path::Path;

/// Extracts text page by page. A page that fails to decode is skipped and
/// reported through the warning, so one corrupt page does not discard the
/// rest of the document.
pub(super) fn extract(path: &Path) -> Extraction {
    let doc = match Document::load(path) {
        Ok(doc) => doc,
        Err(e) => return Extraction::failed(format!("Failed to read PDF file: {}", e)),
    };

    let pages = doc.get_pages();
    let page_count = pages.len();
    let mut text = String::new();
    let mut failed_pages = Vec::new();

    for (page_number, _) in pages {
        match doc.extract_text(&[page_number]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(_) => failed_pages.push(page_number.to_string()),
        }
    }

    let warning = if failed_pages.is_empty() {
        None
    } else {
        Some(format!(
            "Text extraction failed for {} of {} pages (pages {})",
            failed_pages.len(),
            page_count,
            failed_pages.join(", ")
        ))
    };

    Extraction { text, warning }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;
    use std::io::Write;

    // Minimal one-page PDF with "Hello World" in the content stream.
    fn sample_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(lopdf::dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(lopdf::dictionary! {
            "Font" => lopdf::dictionary! { "F1" => font_id },
        });
        let content = lopdf::content::Content {
            operations: vec![
                lopdf::content::Operation::new("BT", vec![]),
                lopdf::content::Operation::new("Tf", vec!["F1".into(), 24.into()]),
                lopdf::content::Operation::new("Td", vec![100.into(), 600.into()]),
                lopdf::content::Operation::new(
                    "Tj",
                    vec![lopdf::Object::string_literal("Hello World")],
                ),
                lopdf::content::Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(lopdf::Stream::new(
            lopdf::dictionary! {},
            content.encode().unwrap(),
        ));
        let page_id = doc.add_object(lopdf::dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            lopdf::Object::Dictionary(lopdf::dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(lopdf::dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn extracts_text_from_a_valid_pdf() {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(&sample_pdf()).unwrap();
        let extraction = extract(file.path());
        assert!(extraction.text.contains("Hello World"));
        assert!(extraction.warning.is_none());
    }

    #[test]
    fn garbage_input_produces_a_warning() {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(b"%PDF-nope").unwrap();
        let extraction = extract(file.path());
        assert_eq!(extraction.text, "");
        assert!(extraction.warning.unwrap().contains("Failed to read PDF"));
    }
}
