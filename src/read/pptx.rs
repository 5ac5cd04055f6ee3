use std::path::Path;

use xml::reader::XmlEvent;

use super::ReadError;
use super::ooxml::{self, DRAWINGML_NS, PRESENTATIONML_NS};

/// Text of every text-bearing shape, slide by slide, one shape per line.
pub(super) fn read_pptx(path: &Path) -> Result<String, ReadError> {
    let mut package = ooxml::open_package(path)?;

    let slides = match ooxml::ordered_parts(
        &mut package,
        "ppt/presentation.xml",
        PRESENTATIONML_NS,
        "sldId",
    )? {
        Some(slides) => slides,
        None => ooxml::numbered_parts(&package, "ppt/slides/slide", ".xml"),
    };

    let mut shapes = Vec::new();
    for slide in slides {
        let xml = ooxml::read_part(&mut package, &slide)?;
        shapes.extend(slide_shapes(&xml)?);
    }
    Ok(shapes.join("\n"))
}

#[derive(Default)]
struct Shape {
    has_text_body: bool,
    paragraphs: Vec<String>,
}

/// Shapes (`p:sp`) with a text body, each rendered as its paragraphs joined by newlines.
fn slide_shapes(xml: &str) -> Result<Vec<String>, ReadError> {
    let mut shapes = Vec::new();
    let mut open: Vec<Shape> = Vec::new();
    let mut paragraph: Option<String> = None;
    let mut in_text = false;

    for event in ooxml::parser(xml) {
        match event? {
            XmlEvent::StartElement { name, .. } => {
                if ooxml::is(&name, PRESENTATIONML_NS, "sp") {
                    open.push(Shape::default());
                } else if ooxml::is(&name, PRESENTATIONML_NS, "txBody") {
                    if let Some(shape) = open.last_mut() {
                        shape.has_text_body = true;
                    }
                } else if ooxml::is(&name, DRAWINGML_NS, "p") && !open.is_empty() {
                    paragraph = Some(String::new());
                } else if ooxml::is(&name, DRAWINGML_NS, "t") {
                    in_text = paragraph.is_some();
                } else if ooxml::is(&name, DRAWINGML_NS, "br")
                    && let Some(p) = paragraph.as_mut()
                {
                    p.push('\n');
                }
            }
            XmlEvent::EndElement { name } => {
                if ooxml::is(&name, DRAWINGML_NS, "t") {
                    in_text = false;
                } else if ooxml::is(&name, DRAWINGML_NS, "p") {
                    if let (Some(text), Some(shape)) = (paragraph.take(), open.last_mut()) {
                        shape.paragraphs.push(text);
                    }
                } else if ooxml::is(&name, PRESENTATIONML_NS, "sp")
                    && let Some(shape) = open.pop()
                    && shape.has_text_body
                {
                    shapes.push(shape.paragraphs.join("\n"));
                }
            }
            XmlEvent::Characters(text) if in_text => {
                if let Some(p) = paragraph.as_mut() {
                    p.push_str(&text);
                }
            }
            _ => {}
        }
    }
    Ok(shapes)
}

#[cfg(test)]
mod tests {
    use super::super::ooxml::RELATIONSHIPS_NS;
    use super::super::ooxml::fixtures::write_package;
    use super::*;

    fn slide(shapes: &str) -> String {
        format!(
            r#"<p:sld xmlns:p="{PRESENTATIONML_NS}" xmlns:a="{DRAWINGML_NS}"><p:cSld><p:spTree>{shapes}</p:spTree></p:cSld></p:sld>"#
        )
    }

    fn text_shape(paragraphs: &[&str]) -> String {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<a:p><a:r><a:t>{p}</a:t></a:r></a:p>"))
            .collect();
        format!("<p:sp><p:nvSpPr/><p:txBody><a:bodyPr/>{body}</p:txBody></p:sp>")
    }

    #[test]
    fn shapes_join_paragraphs() {
        let xml = slide(&format!(
            "{}{}<p:pic><p:blipFill/></p:pic>",
            text_shape(&["Title"]),
            text_shape(&["line one", "line two"])
        ));
        assert_eq!(slide_shapes(&xml).unwrap(), ["Title", "line one\nline two"]);
    }

    #[test]
    fn shapes_without_text_body_are_skipped() {
        let xml = slide("<p:sp><p:nvSpPr/><p:spPr/></p:sp>");
        assert!(slide_shapes(&xml).unwrap().is_empty());
    }

    #[test]
    fn reads_slides_in_numeric_order_without_presentation_part() {
        let dir = tempfile::tempdir().unwrap();
        let s1 = slide(&text_shape(&["one"]));
        let s2 = slide(&text_shape(&["two"]));
        let s10 = slide(&text_shape(&["ten"]));
        let path = write_package(
            &dir,
            "deck.pptx",
            &[
                ("ppt/slides/slide10.xml", &s10),
                ("ppt/slides/slide2.xml", &s2),
                ("ppt/slides/slide1.xml", &s1),
            ],
        );

        assert_eq!(read_pptx(&path).unwrap(), "one\ntwo\nten");
    }

    #[test]
    fn reads_slides_in_presentation_order() {
        let dir = tempfile::tempdir().unwrap();
        let presentation = format!(
            r#"<p:presentation xmlns:p="{PRESENTATIONML_NS}" xmlns:r="{RELATIONSHIPS_NS}">
                 <p:sldIdLst><p:sldId id="257" r:id="rId3"/><p:sldId id="256" r:id="rId2"/></p:sldIdLst>
               </p:presentation>"#
        );
        let rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
              <Relationship Id="rId2" Type="slide" Target="slides/slide1.xml"/>
              <Relationship Id="rId3" Type="slide" Target="slides/slide2.xml"/>
            </Relationships>"#;
        let s1 = slide(&text_shape(&["first file"]));
        let s2 = slide(&text_shape(&["shown first"]));
        let path = write_package(
            &dir,
            "deck.pptx",
            &[
                ("ppt/presentation.xml", &presentation),
                ("ppt/_rels/presentation.xml.rels", rels),
                ("ppt/slides/slide1.xml", &s1),
                ("ppt/slides/slide2.xml", &s2),
            ],
        );

        assert_eq!(read_pptx(&path).unwrap(), "shown first\nfirst file");
    }
}
