use crate::process::{CommandOutput, NativeCommand};

use super::spotlight::MacSpotlightDialect;
use super::windows::WindowsIndexDialect;
use super::{SearchError, SearchRequest, SearchResultEntry};

/// Platform-specific query syntax and result shape for an OS content index.
///
/// Implementations are stateless; one native query is built and executed per
/// search.
pub trait QueryDialect: Send + Sync {
    fn name(&self) -> &'static str;

    /// Translate the request into the index's native query language.
    /// Every filter the language can express is pushed into the query.
    fn build_query(&self, request: &SearchRequest) -> String;

    /// The child process that executes `query` against the index.
    fn command(&self, query: &str) -> NativeCommand;

    /// Separator between result rows on the command's stdout.
    fn row_separator(&self) -> char;

    /// Map one result row to an entry; `None` skips malformed rows.
    fn extract_entry(&self, row: &str) -> Option<SearchResultEntry>;

    /// Classify a finished command. `None` means the rows can be trusted.
    fn classify_failure(&self, output: &CommandOutput) -> Option<SearchError>;
}

static WINDOWS: WindowsIndexDialect = WindowsIndexDialect;
static SPOTLIGHT: MacSpotlightDialect = MacSpotlightDialect;

/// Select the dialect for an OS name as reported by `std::env::consts::OS`.
pub fn dialect_for(os: &str) -> Result<&'static dyn QueryDialect, SearchError> {
    match os {
        "windows" => Ok(&WINDOWS),
        "macos" => Ok(&SPOTLIGHT),
        other => Err(SearchError::UnsupportedPlatform(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_dialect_by_os() {
        assert_eq!(dialect_for("windows").unwrap().name(), "windows-search");
        assert_eq!(dialect_for("macos").unwrap().name(), "spotlight");
    }

    #[test]
    fn other_platforms_are_unsupported() {
        for os in ["linux", "freebsd", "android", ""] {
            assert!(matches!(
                dialect_for(os),
                Err(SearchError::UnsupportedPlatform(_))
            ));
        }
    }
}
