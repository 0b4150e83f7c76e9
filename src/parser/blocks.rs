use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::DocumentError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Read a `.docx` and return its text blocks in traversal order.
pub fn read_docx(path: &Path) -> Result<Vec<String>, DocumentError> {
    let mut container = zip::ZipArchive::new(File::open(path)?)?;
    let mut xml = String::new();
    container.by_name(DOCUMENT_PART)?.read_to_string(&mut xml)?;
    parse_document_xml(&xml)
}

/// Flatten WordprocessingML into blocks: one per body paragraph, one per
/// top-level table cell (its paragraphs joined with newlines).
pub fn parse_document_xml(xml: &str) -> Result<Vec<String>, DocumentError> {
    let mut reader = Reader::from_str(xml);
    let mut blocks = Vec::new();
    let mut buf = Vec::new();

    let mut table_depth = 0usize;
    let mut cell: Option<Vec<String>> = None;
    let mut paras: Vec<String> = Vec::new();
    let mut in_text = false;
    // tab stops in paragraph properties are also `w:tab`
    let mut run_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:tbl" => table_depth += 1,
                b"w:tc" if table_depth == 1 => cell = Some(Vec::new()),
                b"w:p" => paras.push(String::new()),
                b"w:r" => run_depth += 1,
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" => route_paragraph(String::new(), table_depth, &mut cell, &mut blocks),
                b"w:tab" if run_depth > 0 => push_text(&mut paras, "\t"),
                b"w:br" | b"w:cr" if run_depth > 0 => push_text(&mut paras, "\n"),
                _ => {}
            },
            Event::Text(e) if in_text => {
                let text = e.unescape()?;
                push_text(&mut paras, &text);
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:r" => run_depth = run_depth.saturating_sub(1),
                b"w:p" => {
                    if let Some(p) = paras.pop() {
                        route_paragraph(p, table_depth, &mut cell, &mut blocks);
                    }
                }
                b"w:tc" if table_depth == 1 => {
                    if let Some(c) = cell.take() {
                        blocks.push(c.join("\n"));
                    }
                }
                b"w:tbl" => table_depth = table_depth.saturating_sub(1),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(blocks)
}

fn push_text(paras: &mut [String], text: &str) {
    if let Some(p) = paras.last_mut() {
        p.push_str(text);
    }
}

fn route_paragraph(
    text: String,
    table_depth: usize,
    cell: &mut Option<Vec<String>>,
    blocks: &mut Vec<String>,
) {
    if table_depth == 0 {
        blocks.push(text);
    } else if let Some(c) = cell.as_mut() {
        c.push(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(inner: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            inner
        )
    }

    #[test]
    fn paragraphs_in_order() {
        let xml = body(
            "<w:p><w:r><w:t>First</w:t></w:r><w:r><w:t xml:space=\"preserve\"> part</w:t></w:r></w:p>\
             <w:p/>\
             <w:p><w:r><w:t>A &amp; B</w:t></w:r></w:p>",
        );
        let blocks = parse_document_xml(&xml).unwrap();
        assert_eq!(blocks, vec!["First part", "", "A & B"]);
    }

    #[test]
    fn table_cells_become_blocks() {
        let xml = body(
            "<w:p><w:r><w:t>Intro</w:t></w:r></w:p>\
             <w:tbl><w:tr>\
               <w:tc><w:p><w:r><w:t>Clauses affected:</w:t></w:r></w:p></w:tc>\
               <w:tc><w:p><w:r><w:t>6.4.2</w:t></w:r></w:p><w:p><w:r><w:t>F.5</w:t></w:r></w:p></w:tc>\
             </w:tr></w:tbl>\
             <w:p><w:r><w:t>Outro</w:t></w:r></w:p>",
        );
        let blocks = parse_document_xml(&xml).unwrap();
        assert_eq!(blocks, vec!["Intro", "Clauses affected:", "6.4.2\nF.5", "Outro"]);
    }

    #[test]
    fn nested_table_folds_into_outer_cell() {
        let xml = body(
            "<w:tbl><w:tr><w:tc>\
               <w:p><w:r><w:t>outer</w:t></w:r></w:p>\
               <w:tbl><w:tr><w:tc><w:p><w:r><w:t>inner</w:t></w:r></w:p></w:tc></w:tr></w:tbl>\
             </w:tc></w:tr></w:tbl>",
        );
        let blocks = parse_document_xml(&xml).unwrap();
        assert_eq!(blocks, vec!["outer\ninner"]);
    }

    #[test]
    fn tabs_and_breaks() {
        let xml = body("<w:p><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/><w:t>c</w:t></w:r></w:p>");
        assert_eq!(parse_document_xml(&xml).unwrap(), vec!["a\tb\nc"]);
    }

    #[test]
    fn tab_stop_definitions_are_not_text() {
        let xml = body(
            "<w:p><w:pPr><w:tabs><w:tab w:val=\"left\" w:pos=\"1701\"/></w:tabs></w:pPr>\
             <w:r><w:rPr><w:b/></w:rPr><w:t>Clauses affected:</w:t></w:r></w:p>",
        );
        assert_eq!(parse_document_xml(&xml).unwrap(), vec!["Clauses affected:"]);
    }

    #[test]
    fn deleted_text_is_ignored() {
        let xml = body(
            "<w:p><w:del><w:r><w:delText>old</w:delText></w:r></w:del><w:r><w:t>new</w:t></w:r></w:p>",
        );
        assert_eq!(parse_document_xml(&xml).unwrap(), vec!["new"]);
    }
}
