//! services/api/src/convert/markdown.rs
//!
//! Renders the Markdown dialect the reviewer generator emits (headings,
//! bullet and numbered lists, fenced code, bold/italic/inline code, links)
//! into a WordprocessingML package built in memory. Unsupported syntax
//! degrades to plain paragraph text rather than being rejected.

use super::ConvertError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:pPr><w:spacing w:before="240" w:after="120"/></w:pPr><w:rPr><w:b/><w:sz w:val="48"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:pPr><w:spacing w:before="200" w:after="100"/></w:pPr><w:rPr><w:b/><w:sz w:val="36"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading3"><w:name w:val="heading 3"/><w:basedOn w:val="Normal"/><w:pPr><w:spacing w:before="160" w:after="80"/></w:pPr><w:rPr><w:b/><w:sz w:val="28"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="ListParagraph"><w:name w:val="List Paragraph"/><w:basedOn w:val="Normal"/><w:pPr><w:ind w:left="720"/></w:pPr></w:style><w:style w:type="paragraph" w:styleId="Code"><w:name w:val="Code"/><w:basedOn w:val="Normal"/><w:rPr><w:rFonts w:ascii="Consolas" w:hAnsi="Consolas"/></w:rPr></w:style></w:styles>"#;

const WORDPROCESSINGML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Converts Markdown text to DOCX bytes. Fails on package assembly errors
/// only; the Markdown itself always parses.
pub fn markdown_to_docx(markdown: &str) -> Result<Vec<u8>, ConvertError> {
    let blocks = parse_blocks(markdown);
    let document_xml = build_document_xml(&blocks)?;

    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, body) in [
        ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes()),
        ("_rels/.rels", PACKAGE_RELS_XML.as_bytes()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS_XML.as_bytes()),
        ("word/styles.xml", STYLES_XML.as_bytes()),
        ("word/document.xml", document_xml.as_slice()),
    ] {
        zip.start_file(name, options)?;
        zip.write_all(body)?;
    }
    Ok(zip.finish()?.into_inner())
}

//==============================================================================
// Block parsing
//==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Heading1,
    Heading2,
    Heading3,
    ListItem,
    CodeLine,
    Paragraph,
}

impl BlockKind {
    fn style_id(self) -> Option<&'static str> {
        match self {
            BlockKind::Heading1 => Some("Heading1"),
            BlockKind::Heading2 => Some("Heading2"),
            BlockKind::Heading3 => Some("Heading3"),
            BlockKind::ListItem => Some("ListParagraph"),
            BlockKind::CodeLine => Some("Code"),
            BlockKind::Paragraph => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Run {
    text: String,
    bold: bool,
    italic: bool,
    code: bool,
}

impl Run {
    fn plain(text: impl Into<String>) -> Self {
        Run {
            text: text.into(),
            bold: false,
            italic: false,
            code: false,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Block {
    kind: BlockKind,
    runs: Vec<Run>,
}

fn parse_blocks(markdown: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut in_code_fence = false;

    for line in markdown.lines() {
        let line = line.trim_end();
        if line.trim_start().starts_with("```") {
            in_code_fence = !in_code_fence;
            continue;
        }
        if in_code_fence {
            blocks.push(Block {
                kind: BlockKind::CodeLine,
                runs: vec![Run::plain(line)],
            });
            continue;
        }
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            continue;
        }

        if let Some((kind, rest)) = heading(trimmed) {
            blocks.push(Block {
                kind,
                runs: parse_inline(rest),
            });
        } else if let Some(rest) = bullet_item(trimmed) {
            let mut runs = vec![Run::plain("\u{2022} ")];
            runs.extend(parse_inline(rest));
            blocks.push(Block {
                kind: BlockKind::ListItem,
                runs,
            });
        } else if let Some((number, rest)) = ordered_item(trimmed) {
            let mut runs = vec![Run::plain(format!("{}. ", number))];
            runs.extend(parse_inline(rest));
            blocks.push(Block {
                kind: BlockKind::ListItem,
                runs,
            });
        } else {
            blocks.push(Block {
                kind: BlockKind::Paragraph,
                runs: parse_inline(trimmed),
            });
        }
    }
    blocks
}

// Levels past three exist in model output occasionally; they all map to the
// deepest heading style rather than being dropped.
fn heading(line: &str) -> Option<(BlockKind, &str)> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = line[hashes..].strip_prefix(' ')?;
    let kind = match hashes {
        1 => BlockKind::Heading1,
        2 => BlockKind::Heading2,
        _ => BlockKind::Heading3,
    };
    Some((kind, rest))
}

fn bullet_item(line: &str) -> Option<&str> {
    for marker in ["- ", "* ", "+ "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return Some(rest);
        }
    }
    None
}

fn ordered_item(line: &str) -> Option<(&str, &str)> {
    let digits_end = line.find(|c: char| !c.is_ascii_digit())?;
    if digits_end == 0 {
        return None;
    }
    let after = &line[digits_end..];
    let rest = after
        .strip_prefix(". ")
        .or_else(|| after.strip_prefix(") "))?;
    Some((&line[..digits_end], rest))
}

//==============================================================================
// Inline parsing
//==============================================================================

fn parse_inline(text: &str) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut buffer = String::new();
    let mut bold = false;
    let mut italic = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' => {
                let double = chars.peek() == Some(&'*');
                if double {
                    chars.next();
                }
                flush(&mut runs, &mut buffer, bold, italic);
                if double {
                    bold = !bold;
                } else {
                    italic = !italic;
                }
            }
            '`' => {
                flush(&mut runs, &mut buffer, bold, italic);
                let mut code = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == '`' {
                        closed = true;
                        break;
                    }
                    code.push(next);
                }
                if closed {
                    if !code.is_empty() {
                        runs.push(Run {
                            text: code,
                            bold: false,
                            italic: false,
                            code: true,
                        });
                    }
                } else {
                    // Unmatched backtick: keep the text literal.
                    buffer.push('`');
                    buffer.push_str(&code);
                }
            }
            '[' => {
                // Link (or image alt): keep the label, drop the target.
                let remainder: String = chars.clone().collect();
                if let Some((label, consumed)) = link_label(&remainder) {
                    buffer.push_str(&label);
                    for _ in 0..consumed {
                        chars.next();
                    }
                } else {
                    buffer.push('[');
                }
            }
            '!' if chars.peek() == Some(&'[') => {}
            _ => buffer.push(c),
        }
    }
    flush(&mut runs, &mut buffer, bold, italic);
    runs
}

fn flush(runs: &mut Vec<Run>, buffer: &mut String, bold: bool, italic: bool) {
    if buffer.is_empty() {
        return;
    }
    runs.push(Run {
        text: std::mem::take(buffer),
        bold,
        italic,
        code: false,
    });
}

/// Given the text after a `[`, returns the link label and how many chars the
/// whole `label](target)` tail occupies. `None` when it is not a link.
fn link_label(after_bracket: &str) -> Option<(String, usize)> {
    let close = after_bracket.find(']')?;
    let label: String = after_bracket[..close].to_string();
    let after_close = &after_bracket[close + 1..];
    if !after_close.starts_with('(') {
        return None;
    }
    let paren = after_close.find(')')?;
    let consumed = after_bracket[..close + 1 + paren + 1].chars().count();
    Some((label, consumed))
}

//==============================================================================
// Document XML
//==============================================================================

fn build_document_xml(blocks: &[Block]) -> Result<Vec<u8>, std::io::Error> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;

    let mut document = BytesStart::new("w:document");
    document.push_attribute(("xmlns:w", WORDPROCESSINGML_NS));
    writer.write_event(Event::Start(document))?;
    writer.write_event(Event::Start(BytesStart::new("w:body")))?;
    for block in blocks {
        write_paragraph(&mut writer, block)?;
    }
    writer.write_event(Event::End(BytesEnd::new("w:body")))?;
    writer.write_event(Event::End(BytesEnd::new("w:document")))?;
    Ok(writer.into_inner())
}

fn write_paragraph(writer: &mut Writer<Vec<u8>>, block: &Block) -> Result<(), std::io::Error> {
    writer.write_event(Event::Start(BytesStart::new("w:p")))?;
    if let Some(style_id) = block.kind.style_id() {
        writer.write_event(Event::Start(BytesStart::new("w:pPr")))?;
        let mut style = BytesStart::new("w:pStyle");
        style.push_attribute(("w:val", style_id));
        writer.write_event(Event::Empty(style))?;
        writer.write_event(Event::End(BytesEnd::new("w:pPr")))?;
    }
    for run in &block.runs {
        write_run(writer, run)?;
    }
    writer.write_event(Event::End(BytesEnd::new("w:p")))?;
    Ok(())
}

fn write_run(writer: &mut Writer<Vec<u8>>, run: &Run) -> Result<(), std::io::Error> {
    writer.write_event(Event::Start(BytesStart::new("w:r")))?;
    if run.bold || run.italic || run.code {
        writer.write_event(Event::Start(BytesStart::new("w:rPr")))?;
        if run.code {
            let mut fonts = BytesStart::new("w:rFonts");
            fonts.push_attribute(("w:ascii", "Consolas"));
            fonts.push_attribute(("w:hAnsi", "Consolas"));
            writer.write_event(Event::Empty(fonts))?;
        }
        if run.bold {
            writer.write_event(Event::Empty(BytesStart::new("w:b")))?;
        }
        if run.italic {
            writer.write_event(Event::Empty(BytesStart::new("w:i")))?;
        }
        writer.write_event(Event::End(BytesEnd::new("w:rPr")))?;
    }
    let mut text = BytesStart::new("w:t");
    text.push_attribute(("xml:space", "preserve"));
    writer.write_event(Event::Start(text))?;
    writer.write_event(Event::Text(BytesText::new(&run.text)))?;
    writer.write_event(Event::End(BytesEnd::new("w:t")))?;
    writer.write_event(Event::End(BytesEnd::new("w:r")))?;
    Ok(())
}
