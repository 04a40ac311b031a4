//! Text extraction from Word documents.
//!
//! A `.docx` file is a ZIP container; the body text lives in the
//! WordprocessingML part `word/document.xml`. Only the paragraphs that are
//! direct children of `w:body` are read, in document order. Paragraphs
//! nested in tables, text boxes or content controls are not body paragraphs
//! and are skipped.
//!
//! Within a paragraph the text of every run is concatenated, including runs
//! wrapped in hyperlinks, smart tags, simple fields and tracked insertions.
//! Deleted text is stored as `w:delText` and therefore never appears.

use crate::error::Docx2SpeechError;
use roxmltree::Node;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

/// WordprocessingML main namespace.
pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Path of the main document part inside the container.
pub const DOCUMENT_PART: &str = "word/document.xml";

/// Extract the document's paragraphs joined with `\n`.
///
/// Empty paragraphs contribute empty segments, so `["Intro", "$x^2$", ""]`
/// becomes `"Intro\n$x^2$\n"`. A document without paragraphs yields `""`.
pub fn extract_text(bytes: &[u8]) -> Result<String, Docx2SpeechError> {
    Ok(extract_paragraphs(bytes)?.join("\n"))
}

/// Read `path` and extract its text.
pub async fn extract_text_from_path(path: impl AsRef<Path>) -> Result<String, Docx2SpeechError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Docx2SpeechError::parse(format!("cannot read '{}': {e}", path.display())))?;
    extract_text(&bytes)
}

/// Extract the plain text of every body-level paragraph, in order.
pub fn extract_paragraphs(bytes: &[u8]) -> Result<Vec<String>, Docx2SpeechError> {
    let xml = read_document_part(bytes)?;
    let doc = roxmltree::Document::parse(&xml)
        .map_err(|e| Docx2SpeechError::parse(format!("malformed {DOCUMENT_PART}: {e}")))?;

    let body = doc
        .root_element()
        .children()
        .find(|n| is_w(n, "body"))
        .ok_or_else(|| Docx2SpeechError::parse(format!("{DOCUMENT_PART} has no w:body")))?;

    let paragraphs: Vec<String> = body
        .children()
        .filter(|n| is_w(n, "p"))
        .map(|p| {
            let mut text = String::new();
            collect_runs(p, &mut text);
            text
        })
        .collect();

    debug!("Extracted {} paragraphs", paragraphs.len());
    Ok(paragraphs)
}

fn read_document_part(bytes: &[u8]) -> Result<String, Docx2SpeechError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Docx2SpeechError::parse(format!("not a valid .docx container: {e}")))?;

    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| Docx2SpeechError::parse(format!("missing {DOCUMENT_PART}: {e}")))?;

    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| Docx2SpeechError::parse(format!("cannot read {DOCUMENT_PART}: {e}")))?;
    Ok(xml)
}

fn is_w(node: &Node, local: &str) -> bool {
    node.is_element() && node.tag_name().name() == local && node.tag_name().namespace() == Some(W_NS)
}

/// Walk the run containers of a paragraph (or of a wrapper inside it).
fn collect_runs(node: Node, out: &mut String) {
    for child in node.children().filter(|n| n.is_element()) {
        if child.tag_name().namespace() != Some(W_NS) {
            continue;
        }
        match child.tag_name().name() {
            "r" => run_text(child, out),
            "hyperlink" | "ins" | "smartTag" | "fldSimple" | "customXml" | "dir" | "bdo" => {
                collect_runs(child, out)
            }
            _ => {}
        }
    }
}

fn run_text(run: Node, out: &mut String) {
    for child in run.children().filter(|n| n.is_element()) {
        if child.tag_name().namespace() != Some(W_NS) {
            continue;
        }
        match child.tag_name().name() {
            "t" => out.push_str(child.text().unwrap_or("")),
            "tab" => out.push('\t'),
            "cr" => out.push('\n'),
            // Page and column breaks carry no text.
            "br" => match child.attribute((W_NS, "type")) {
                None | Some("textWrapping") => out.push('\n'),
                Some(_) => {}
            },
            "noBreakHyphen" => out.push('-'),
            _ => {}
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn stored() -> SimpleFileOptions {
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored)
    }

    /// Package `body_xml` as a minimal .docx.
    pub(crate) fn docx_with_body(body_xml: &str) -> Vec<u8> {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{W_NS}"><w:body>{body_xml}</w:body></w:document>"#
        );
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = stored();
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(b"<Types/>").unwrap();
        zip.start_file(DOCUMENT_PART, options).unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    pub(crate) fn docx_from_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
        let body: String = paragraphs
            .iter()
            .map(|p| {
                if p.is_empty() {
                    "<w:p/>".to_string()
                } else {
                    format!(r#"<w:p><w:r><w:t xml:space="preserve">{p}</w:t></w:r></w:p>"#)
                }
            })
            .collect();
        docx_with_body(&body)
    }

    #[test]
    fn paragraphs_keep_order_and_empty_slots() {
        let bytes = docx_from_paragraphs(&["Intro", "$x^2$", ""]);
        assert_eq!(extract_text(&bytes).unwrap(), "Intro\n$x^2$\n");
    }

    #[test]
    fn n_paragraphs_give_n_segments() {
        let paras = ["one", "two", "three", "four"];
        let bytes = docx_from_paragraphs(&paras);
        let text = extract_text(&bytes).unwrap();
        assert_eq!(text.split('\n').collect::<Vec<_>>(), paras);
    }

    #[test]
    fn zero_paragraphs_yield_empty_string() {
        let bytes = docx_with_body("");
        assert_eq!(extract_text(&bytes).unwrap(), "");
        assert!(extract_paragraphs(&bytes).unwrap().is_empty());
    }

    #[test]
    fn runs_are_concatenated() {
        let bytes = docx_with_body(
            r#"<w:p><w:r><w:t>Hello, </w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>world</w:t></w:r></w:p>"#,
        );
        assert_eq!(extract_text(&bytes).unwrap(), "Hello, world");
    }

    #[test]
    fn hyperlinks_and_insertions_are_included_deletions_are_not() {
        let bytes = docx_with_body(
            r#"<w:p>
                 <w:r><w:t xml:space="preserve">See </w:t></w:r>
                 <w:hyperlink><w:r><w:t>docs</w:t></w:r></w:hyperlink>
                 <w:del><w:r><w:delText> removed</w:delText></w:r></w:del>
                 <w:ins><w:r><w:t> now</w:t></w:r></w:ins>
               </w:p>"#,
        );
        assert_eq!(extract_text(&bytes).unwrap(), "See docs now");
    }

    #[test]
    fn tabs_and_line_breaks() {
        let bytes = docx_with_body(
            r#"<w:p><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/><w:t>c</w:t><w:br w:type="page"/></w:r></w:p>"#,
        );
        assert_eq!(extract_text(&bytes).unwrap(), "a\tb\nc");
    }

    #[test]
    fn table_paragraphs_are_not_body_paragraphs() {
        let bytes = docx_with_body(
            r#"<w:p><w:r><w:t>before</w:t></w:r></w:p>
               <w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
               <w:p><w:r><w:t>after</w:t></w:r></w:p>"#,
        );
        assert_eq!(extract_text(&bytes).unwrap(), "before\nafter");
    }

    #[test]
    fn xml_entities_are_decoded() {
        let bytes = docx_with_body(r#"<w:p><w:r><w:t>a &lt; b &amp; c</w:t></w:r></w:p>"#);
        assert_eq!(extract_text(&bytes).unwrap(), "a < b & c");
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = extract_text(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, Docx2SpeechError::Parse { .. }));
    }

    #[test]
    fn zip_without_document_part_is_a_parse_error() {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("hello.txt", stored()).unwrap();
        zip.write_all(b"hi").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let err = extract_text(&bytes).unwrap_err();
        assert!(err.to_string().contains(DOCUMENT_PART), "got: {err}");
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file(DOCUMENT_PART, stored()).unwrap();
        zip.write_all(b"<w:document><w:body>").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        assert!(matches!(
            extract_text(&bytes),
            Err(Docx2SpeechError::Parse { .. })
        ));
    }
}
