//! macOS Spotlight via `mdfind` with a raw metadata-query predicate.

use std::path::{Path, PathBuf};

use crate::process::{CommandOutput, NativeCommand};

use super::{QueryDialect, SearchError, SearchRequest, SearchResultEntry};

/// Prefix `mdfind` prints when the predicate does not parse.
const QUERY_PARSE_FAILURE: &str = "Failed to create query";

#[derive(Debug, Clone, Copy, Default)]
pub struct MacSpotlightDialect;

impl QueryDialect for MacSpotlightDialect {
    fn name(&self) -> &'static str {
        "spotlight"
    }

    fn build_query(&self, request: &SearchRequest) -> String {
        let mut parts = vec![format!(
            r#"kMDItemTextContent == "*{}*"wc"#,
            escape_value(&request.query)
        )];

        if let Some(ext) = &request.extension {
            parts.push(format!(r#"kMDItemFSName == "*.{}"c"#, escape_value(ext)));
        }
        if let Some(after) = request.modified_after {
            parts.push(format!(
                "kMDItemFSContentChangeDate >= $time.iso({})",
                after.format("%Y-%m-%dT%H:%M:%SZ")
            ));
        }
        if let Some(min) = request.min_size_bytes() {
            parts.push(format!("kMDItemFSSize >= {min}"));
        }
        if let Some(max) = request.max_size_bytes() {
            parts.push(format!("kMDItemFSSize <= {max}"));
        }

        parts.join(" && ")
    }

    fn command(&self, query: &str) -> NativeCommand {
        // -0: NUL-separated paths, so newlines in file names survive.
        NativeCommand::new("mdfind").arg("-0").arg(query)
    }

    fn row_separator(&self) -> char {
        '\0'
    }

    fn extract_entry(&self, row: &str) -> Option<SearchResultEntry> {
        let row = row.trim_matches('\n');
        if row.is_empty() {
            return None;
        }
        let name = Path::new(row).file_name()?.to_string_lossy().into_owned();
        Some(SearchResultEntry {
            name,
            path: format!("file://{row}"),
            local_path: PathBuf::from(row),
        })
    }

    fn classify_failure(&self, output: &CommandOutput) -> Option<SearchError> {
        if output.stderr.contains(QUERY_PARSE_FAILURE) {
            return Some(SearchError::QueryConstructionFailed(output.failure_message()));
        }
        if !output.success() {
            return Some(SearchError::IndexUnavailable(output.failure_message()));
        }
        None
    }
}

/// Escape a value for a double-quoted Spotlight string literal.
fn escape_value(value: &str) -> String {
    value.replace('\\', r"\\").replace('"', r#"\""#)
}
