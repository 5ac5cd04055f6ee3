use std::path::Path;

use xml::reader::XmlEvent;

use super::ReadError;
use super::ooxml::{self, WORDML_NS};

/// Paragraph text of a `.docx` body, one paragraph per line.
pub(super) fn read_docx(path: &Path) -> Result<String, ReadError> {
    let mut package = ooxml::open_package(path)?;
    let xml = ooxml::read_part(&mut package, "word/document.xml")?;
    document_text(&xml)
}

fn document_text(xml: &str) -> Result<String, ReadError> {
    let mut paragraphs = Vec::new();
    // Text boxes nest paragraphs inside paragraphs.
    let mut open: Vec<String> = Vec::new();
    let mut run_depth = 0usize;
    let mut in_text = false;

    for event in ooxml::parser(xml) {
        match event? {
            XmlEvent::StartElement { name, .. } if name.namespace.as_deref() == Some(WORDML_NS) => {
                match name.local_name.as_str() {
                    "p" => open.push(String::new()),
                    "r" => run_depth += 1,
                    "t" => in_text = true,
                    // Tab stops in paragraph properties are also `w:tab`; only run content counts.
                    "tab" if run_depth > 0 => push_char(&mut open, '\t'),
                    "br" | "cr" if run_depth > 0 => push_char(&mut open, '\n'),
                    _ => {}
                }
            }
            XmlEvent::EndElement { name } if name.namespace.as_deref() == Some(WORDML_NS) => {
                match name.local_name.as_str() {
                    "p" => {
                        if let Some(text) = open.pop() {
                            paragraphs.push(text);
                        }
                    }
                    "r" => run_depth = run_depth.saturating_sub(1),
                    "t" => in_text = false,
                    _ => {}
                }
            }
            XmlEvent::Characters(text) if in_text => {
                if let Some(current) = open.last_mut() {
                    current.push_str(&text);
                }
            }
            _ => {}
        }
    }

    Ok(paragraphs.join("\n"))
}

fn push_char(open: &mut [String], c: char) {
    if let Some(current) = open.last_mut() {
        current.push(c);
    }
}

#[cfg(test)]
mod tests {
    use super::super::ooxml::fixtures::write_package;
    use super::*;

    fn body(inner: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{WORDML_NS}"><w:body>{inner}</w:body></w:document>"#
        )
    }

    #[test]
    fn joins_paragraphs_with_newlines() {
        let xml = body(
            r#"<w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:t xml:space="preserve"> world</w:t></w:r></w:p>
               <w:p/>
               <w:p><w:r><w:t>Second</w:t></w:r></w:p>"#,
        );
        assert_eq!(document_text(&xml).unwrap(), "Hello world\n\nSecond");
    }

    #[test]
    fn run_tabs_and_breaks_become_whitespace() {
        let xml = body(
            r#"<w:p>
                 <w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr>
                 <w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/><w:t>c</w:t></w:r>
               </w:p>"#,
        );
        assert_eq!(document_text(&xml).unwrap(), "a\tb\nc");
    }

    #[test]
    fn table_cell_paragraphs_are_included() {
        let xml = body(
            r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
        );
        assert_eq!(document_text(&xml).unwrap(), "cell");
    }

    #[test]
    fn reads_docx_package() {
        let dir = tempfile::tempdir().unwrap();
        let xml = body(r#"<w:p><w:r><w:t>これはテストです</w:t></w:r></w:p>"#);
        let path = write_package(&dir, "doc.docx", &[("word/document.xml", &xml)]);

        assert_eq!(read_docx(&path).unwrap(), "これはテストです");
    }

    #[test]
    fn package_without_body_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_package(&dir, "doc.docx", &[("[Content_Types].xml", "<Types/>")]);
        assert!(matches!(read_docx(&path), Err(ReadError::MissingPart(_))));
    }
}
