use std::path::Path;

use xml::attribute::OwnedAttribute;
use xml::reader::XmlEvent;

use super::ReadError;
use super::ooxml::{self, SPREADSHEETML_NS};

/// Sheet limits of the format: rows 1..=1048576, columns A..=XFD.
const MAX_ROWS: usize = 1_048_576;
const MAX_COLUMNS: usize = 16_384;

/// Upper bound on cells rendered for one sheet after gap padding.
const MAX_RENDERED_CELLS: usize = 1 << 24;

/// Every sheet's rows, cells tab-joined, rows newline-joined, sheets in workbook order.
pub(super) fn read_xlsx(path: &Path) -> Result<String, ReadError> {
    let mut package = ooxml::open_package(path)?;

    let shared = match ooxml::read_optional_part(&mut package, "xl/sharedStrings.xml")? {
        Some(xml) => shared_strings(&xml)?,
        None => Vec::new(),
    };

    let sheets = match ooxml::ordered_parts(&mut package, "xl/workbook.xml", SPREADSHEETML_NS, "sheet")? {
        Some(sheets) => sheets,
        None => ooxml::numbered_parts(&package, "xl/worksheets/sheet", ".xml"),
    };

    let mut rows = Vec::new();
    for sheet in sheets {
        let xml = ooxml::read_part(&mut package, &sheet)?;
        rows.extend(sheet_rows(&xml, &shared)?);
    }
    Ok(rows.join("\n"))
}

/// The shared string table; rich-text runs are concatenated, phonetic hints skipped.
fn shared_strings(xml: &str) -> Result<Vec<String>, ReadError> {
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut phonetic_depth = 0usize;
    let mut in_text = false;

    for event in ooxml::parser(xml) {
        match event? {
            XmlEvent::StartElement { name, .. } if ooxml::is(&name, SPREADSHEETML_NS, "si") => {
                current = Some(String::new());
            }
            XmlEvent::StartElement { name, .. } if ooxml::is(&name, SPREADSHEETML_NS, "rPh") => {
                phonetic_depth += 1;
            }
            XmlEvent::StartElement { name, .. } if ooxml::is(&name, SPREADSHEETML_NS, "t") => {
                in_text = phonetic_depth == 0;
            }
            XmlEvent::EndElement { name } if ooxml::is(&name, SPREADSHEETML_NS, "t") => {
                in_text = false;
            }
            XmlEvent::EndElement { name } if ooxml::is(&name, SPREADSHEETML_NS, "rPh") => {
                phonetic_depth = phonetic_depth.saturating_sub(1);
            }
            XmlEvent::EndElement { name } if ooxml::is(&name, SPREADSHEETML_NS, "si") => {
                strings.push(current.take().unwrap_or_default());
            }
            XmlEvent::Characters(text) if in_text => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&text);
                }
            }
            _ => {}
        }
    }
    Ok(strings)
}

#[derive(Default)]
struct Cell {
    column: Option<usize>,
    kind: Option<String>,
    value: String,
    inline: String,
}

impl Cell {
    fn render(self, shared: &[String]) -> Result<String, ReadError> {
        Ok(match self.kind.as_deref() {
            Some("s") => {
                let index: usize = self
                    .value
                    .trim()
                    .parse()
                    .map_err(|_| ReadError::InvalidCell(self.value.clone()))?;
                shared
                    .get(index)
                    .cloned()
                    .ok_or_else(|| ReadError::InvalidCell(format!("shared string {index}")))?
            }
            Some("inlineStr") => self.inline,
            Some("b") => match self.value.trim() {
                "1" => "True".to_string(),
                _ => "False".to_string(),
            },
            _ => self.value,
        })
    }
}

fn sheet_rows(xml: &str, shared: &[String]) -> Result<Vec<String>, ReadError> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Option<Vec<String>> = None;
    let mut cell: Option<Cell> = None;
    let mut in_value = false;
    let mut in_inline_text = false;

    for event in ooxml::parser(xml) {
        match event? {
            XmlEvent::StartElement {
                name, attributes, ..
            } if name.namespace.as_deref() == Some(SPREADSHEETML_NS) => {
                match name.local_name.as_str() {
                    "row" => {
                        if let Some(number) = attribute(&attributes, "r") {
                            // Rows absent from the sheet render as empty lines.
                            let index = row_index(&number)?;
                            if rows.len() < index {
                                rows.resize_with(index, Vec::new);
                            }
                        }
                        row = Some(Vec::new());
                    }
                    "c" => {
                        let column = match attribute(&attributes, "r") {
                            Some(reference) => column_index(&reference)?,
                            None => None,
                        };
                        cell = Some(Cell {
                            column,
                            kind: attribute(&attributes, "t"),
                            ..Default::default()
                        });
                    }
                    "v" => in_value = cell.is_some(),
                    "t" => in_inline_text = cell.is_some(),
                    _ => {}
                }
            }
            XmlEvent::EndElement { name } if name.namespace.as_deref() == Some(SPREADSHEETML_NS) => {
                match name.local_name.as_str() {
                    "v" => in_value = false,
                    "t" => in_inline_text = false,
                    "c" => {
                        if let (Some(done), Some(cells)) = (cell.take(), row.as_mut()) {
                            // Missing cells before this one render as empty strings.
                            if let Some(column) = done.column
                                && cells.len() < column
                            {
                                cells.resize(column, String::new());
                            }
                            cells.push(done.render(shared)?);
                        }
                    }
                    "row" => {
                        if let Some(cells) = row.take() {
                            rows.push(cells);
                        }
                    }
                    _ => {}
                }
            }
            XmlEvent::Characters(text) => {
                if let Some(c) = cell.as_mut() {
                    if in_value {
                        c.value.push_str(&text);
                    } else if in_inline_text {
                        c.inline.push_str(&text);
                    }
                }
            }
            _ => {}
        }
    }

    // Every row is padded to the widest row of the sheet.
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if rows.len().saturating_mul(width) > MAX_RENDERED_CELLS {
        return Err(ReadError::SheetTooLarge {
            rows: rows.len(),
            columns: width,
        });
    }
    Ok(rows
        .into_iter()
        .map(|mut cells| {
            cells.resize(width, String::new());
            cells.join("\t")
        })
        .collect())
}

fn attribute(attributes: &[OwnedAttribute], key: &str) -> Option<String> {
    attributes
        .iter()
        .find(|a| a.name.local_name == key)
        .map(|a| a.value.clone())
}

/// Zero-based row of a `row/@r` number (`"1"` → 0).
fn row_index(number: &str) -> Result<usize, ReadError> {
    match number.trim().parse::<usize>() {
        Ok(n @ 1..=MAX_ROWS) => Ok(n - 1),
        _ => Err(ReadError::InvalidCell(format!("row number {number}"))),
    }
}

/// Zero-based column of an A1-style reference (`"C7"` → 2); `None` without letters.
fn column_index(reference: &str) -> Result<Option<usize>, ReadError> {
    let mut one_based = 0usize;
    for letter in reference.bytes().take_while(u8::is_ascii_alphabetic) {
        let digit = usize::from(letter.to_ascii_uppercase() - b'A') + 1;
        one_based = one_based
            .checked_mul(26)
            .and_then(|n| n.checked_add(digit))
            .filter(|&n| n <= MAX_COLUMNS)
            .ok_or_else(|| ReadError::InvalidCell(format!("column out of range: {reference}")))?;
    }
    Ok((one_based > 0).then(|| one_based - 1))
}
