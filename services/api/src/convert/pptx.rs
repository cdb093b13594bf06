//! services/api/src/convert/pptx.rs

use super::{collect_tagged_text, Extraction};
use std::io::Read;
use std::path::Path;

/// Pulls text out of `ppt/slides/slideN.xml` parts, in slide-number order.
/// Archive entry order is not slide order, and lexicographic order puts
/// slide10 before slide2, so the numbers are parsed out of the entry names.
pub(super) fn extract(path: &Path) -> Extraction {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) => return Extraction::failed(format!("Failed to read PPTX file: {}", e)),
    };
    let mut archive = match zip::ZipArchive::new(file) {
        Ok(archive) => archive,
        Err(e) => return Extraction::failed(format!("Failed to read PPTX file: {}", e)),
    };

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| Some((slide_number(name)?, name.to_string())))
        .collect();
    slides.sort_by_key(|(number, _)| *number);

    let mut text = String::new();
    let mut unreadable = 0usize;
    for (_, name) in &slides {
        let mut xml = String::new();
        match archive.by_name(name) {
            Ok(mut entry) => {
                if entry.read_to_string(&mut xml).is_err() {
                    unreadable += 1;
                    continue;
                }
            }
            Err(_) => {
                unreadable += 1;
                continue;
            }
        }
        text.push_str(&collect_tagged_text(&xml, "a:t", "a:p"));
    }

    let warning = if unreadable > 0 {
        Some(format!("{} of {} slides could not be read", unreadable, slides.len()))
    } else {
        None
    };
    Extraction { text, warning }
}

fn slide_number(entry_name: &str) -> Option<u32> {
    let rest = entry_name.strip_prefix("ppt/slides/slide")?;
    rest.strip_suffix(".xml")?.parse().ok()
}
