//! Shared plumbing for Office Open XML packages (zip archives of XML parts).

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use xml::name::OwnedName;
use xml::reader::{EventReader, ParserConfig, XmlEvent};
use zip::ZipArchive;
use zip::result::ZipError;

use super::ReadError;

pub(super) const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub(super) const SPREADSHEETML_NS: &str =
    "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
pub(super) const PRESENTATIONML_NS: &str =
    "http://schemas.openxmlformats.org/presentationml/2006/main";
pub(super) const DRAWINGML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub(super) const RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PACKAGE_RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

pub(super) type Package = ZipArchive<File>;

pub(super) fn open_package(path: &Path) -> Result<Package, ReadError> {
    let file = File::open(path)?;
    Ok(ZipArchive::new(file)?)
}

pub(super) fn read_part(package: &mut Package, name: &str) -> Result<String, ReadError> {
    read_optional_part(package, name)?.ok_or_else(|| ReadError::MissingPart(name.to_string()))
}

pub(super) fn read_optional_part(
    package: &mut Package,
    name: &str,
) -> Result<Option<String>, ReadError> {
    let mut part = match package.by_name(name) {
        Ok(part) => part,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    part.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

/// Parts named `{prefix}{N}{suffix}`, ordered by `N`.
pub(super) fn numbered_parts(package: &Package, prefix: &str, suffix: &str) -> Vec<String> {
    let mut parts: Vec<(u32, String)> = package
        .file_names()
        .filter_map(|name| {
            let n = name.strip_prefix(prefix)?.strip_suffix(suffix)?.parse().ok()?;
            Some((n, name.to_string()))
        })
        .collect();
    parts.sort_unstable_by_key(|(n, _)| *n);
    parts.into_iter().map(|(_, name)| name).collect()
}

/// Resolve the parts listed by relationship id in `main_part`, in document order.
///
/// `list_ns`/`item` name the listing element (e.g. SpreadsheetML `sheet`);
/// each item carries an `r:id` pointing into the main part's `.rels` file.
/// Returns `None` when the main part or its relationships are absent.
pub(super) fn ordered_parts(
    package: &mut Package,
    main_part: &str,
    list_ns: &str,
    item: &str,
) -> Result<Option<Vec<String>>, ReadError> {
    let Some(main_xml) = read_optional_part(package, main_part)? else {
        return Ok(None);
    };
    let (dir, file) = main_part.rsplit_once('/').unwrap_or(("", main_part));
    let rels_name = if dir.is_empty() {
        format!("_rels/{file}.rels")
    } else {
        format!("{dir}/_rels/{file}.rels")
    };
    let Some(rels_xml) = read_optional_part(package, &rels_name)? else {
        return Ok(None);
    };

    let targets = relationship_targets(&rels_xml)?;
    let mut parts = Vec::new();
    for event in parser(&main_xml) {
        if let XmlEvent::StartElement {
            name, attributes, ..
        } = event?
            && is(&name, list_ns, item)
            && let Some(id) = attributes.iter().find(|a| {
                a.name.local_name == "id"
                    && (a.name.namespace.as_deref() == Some(RELATIONSHIPS_NS)
                        || a.name.prefix.as_deref() == Some("r"))
            })
            && let Some(target) = targets.get(&id.value)
        {
            parts.push(resolve_target(dir, target));
        }
    }
    Ok(Some(parts))
}

fn relationship_targets(xml: &str) -> Result<HashMap<String, String>, ReadError> {
    let mut targets = HashMap::new();
    for event in parser(xml) {
        if let XmlEvent::StartElement {
            name, attributes, ..
        } = event?
            && is(&name, PACKAGE_RELS_NS, "Relationship")
        {
            let attr = |key: &str| {
                attributes
                    .iter()
                    .find(|a| a.name.local_name == key)
                    .map(|a| a.value.clone())
            };
            if let (Some(id), Some(target)) = (attr("Id"), attr("Target")) {
                targets.insert(id, target);
            }
        }
    }
    Ok(targets)
}

/// Relationship targets are relative to the source part's directory unless absolute.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            ".." => {
                segments.pop();
            }
            "." | "" => {}
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Streaming parser that reports whitespace-only text (e.g. `<w:t> </w:t>`) as characters.
pub(super) fn parser(xml: &str) -> EventReader<&[u8]> {
    ParserConfig::new()
        .trim_whitespace(false)
        .whitespace_to_characters(true)
        .cdata_to_characters(true)
        .ignore_comments(true)
        .create_reader(xml.as_bytes())
}

pub(super) fn is(name: &OwnedName, namespace: &str, local: &str) -> bool {
    name.local_name == local && name.namespace.as_deref() == Some(namespace)
}
