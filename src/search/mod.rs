//! Index search: request validation, dialect selection, native execution, and result rendering.

mod dialect;
mod request;
mod spotlight;
mod windows;

pub use dialect::{QueryDialect, dialect_for};
pub use request::SearchRequest;

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::process::CommandRunner;

/// Rendered in place of an empty result list.
pub const NO_MATCHES: &str = "No matching files found.";

/// One matched file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResultEntry {
    pub name: String,
    /// Native absolute path or file URI, as shown to callers.
    pub path: String,
    /// On-disk location used for size checks.
    pub local_path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error("Invalid date format. Use ISO 8601 (e.g., 2024-01-01T00:00:00)")]
    InvalidDateFormat(String),

    #[error("Invalid size range: max_size_kb ({max}) is smaller than min_size_kb ({min})")]
    InvalidSizeRange { min: u64, max: u64 },

    #[error("Unsupported operating system")]
    UnsupportedPlatform(String),

    #[error("Failed to create search query: {0}")]
    QueryConstructionFailed(String),

    #[error("Search index unavailable: {0}")]
    IndexUnavailable(String),
}

/// Run `request` against the index described by `dialect`.
///
/// Entries keep the index's order. When size bounds are set, each candidate
/// is also checked on disk; files that vanished or changed size since
/// indexing are dropped.
pub async fn search_files(
    request: &SearchRequest,
    dialect: &dyn QueryDialect,
    runner: &impl CommandRunner,
) -> Result<Vec<SearchResultEntry>, SearchError> {
    let query = dialect.build_query(request);
    debug!(dialect = dialect.name(), %query, "native query built");

    let command = dialect.command(&query);
    let output = runner.run(&command).await.map_err(|e| {
        SearchError::IndexUnavailable(format!("failed to launch {}: {e}", command.program))
    })?;

    if let Some(err) = dialect.classify_failure(&output) {
        warn!(dialect = dialect.name(), error = %err, "native query failed");
        return Err(err);
    }

    let candidates: Vec<_> = output
        .stdout
        .split(dialect.row_separator())
        .filter_map(|row| dialect.extract_entry(row))
        .collect();

    if !request.has_size_bounds() {
        return Ok(candidates);
    }

    let total = candidates.len();
    let mut entries = Vec::with_capacity(total);
    for entry in candidates {
        match tokio::fs::metadata(&entry.local_path).await {
            Ok(meta) if request.size_matches(meta.len()) => entries.push(entry),
            Ok(_) => {}
            Err(e) => {
                debug!(path = %entry.local_path.display(), error = %e, "dropping unreadable candidate");
            }
        }
    }
    debug!(candidates = total, kept = entries.len(), "size filter applied");
    Ok(entries)
}

/// One `"{name} - {path}"` line per entry, or [`NO_MATCHES`].
pub fn render_entries(entries: &[SearchResultEntry]) -> String {
    if entries.is_empty() {
        return NO_MATCHES.to_string();
    }
    entries
        .iter()
        .map(|e| format!("{} - {}", e.name, e.path))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::CommandOutput;
    use crate::process::mock::MockRunner;

    fn write_file(dir: &tempfile::TempDir, name: &str, bytes: usize) -> String {
        let path = dir.path().join(name);
        std::fs::write(&path, vec![b'x'; bytes]).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn spotlight() -> &'static dyn QueryDialect {
        dialect_for("macos").unwrap()
    }

    #[tokio::test]
    async fn runs_exactly_one_native_query() {
        let runner = MockRunner::with_stdout("");
        let req = SearchRequest::new("budget").unwrap();

        let entries = search_files(&req, spotlight(), &runner).await.unwrap();

        assert!(entries.is_empty());
        let calls = runner.captured();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "mdfind");
        assert!(calls[0].args[1].contains("*budget*"));
    }

    #[tokio::test]
    async fn preserves_index_order() {
        let runner = MockRunner::with_stdout("/b/zeta.txt\0/a/alpha.txt\0/c/mid.txt\0");
        let req = SearchRequest::new("q").unwrap();

        let entries = search_files(&req, spotlight(), &runner).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["zeta.txt", "alpha.txt", "mid.txt"]);
    }

    #[tokio::test]
    async fn size_bounds_are_checked_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let small = write_file(&dir, "small.txt", 100);
        let fits = write_file(&dir, "fits.txt", 1536);
        let large = write_file(&dir, "large.txt", 4096);
        let gone = dir.path().join("gone.txt").to_string_lossy().into_owned();

        let runner = MockRunner::with_stdout(format!("{small}\0{fits}\0{gone}\0{large}\0"));
        let req = SearchRequest::new("q")
            .unwrap()
            .with_size_range(Some(1), Some(2))
            .unwrap();

        let entries = search_files(&req, spotlight(), &runner).await.unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "fits.txt");
        for entry in &entries {
            let len = std::fs::metadata(&entry.local_path).unwrap().len();
            assert!((1024..=2048).contains(&len));
        }
    }

    #[tokio::test]
    async fn zero_max_size_keeps_only_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let empty = write_file(&dir, "empty.txt", 0);
        let one = write_file(&dir, "one.txt", 1);

        let runner = MockRunner::with_stdout(format!("{empty}\0{one}\0"));
        let req = SearchRequest::new("q")
            .unwrap()
            .with_size_range(None, Some(0))
            .unwrap();

        let entries = search_files(&req, spotlight(), &runner).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "empty.txt");
        assert!(runner.captured()[0].args[1].contains("kMDItemFSSize <= 0"));
    }

    #[tokio::test]
    async fn without_size_bounds_missing_files_are_kept() {
        let runner = MockRunner::with_stdout("/nonexistent/report.pdf\0");
        let req = SearchRequest::new("q").unwrap().with_extension(Some("pdf"));

        let entries = search_files(&req, spotlight(), &runner).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].path.to_lowercase().ends_with(".pdf"));
    }

    #[tokio::test]
    async fn windows_rows_are_parsed() {
        let runner = MockRunner::with_stdout(
            "a.docx\tfile:C:/a.docx\tC:\\a.docx\r\nb.docx\tfile:C:/b.docx\tC:\\b.docx\r\n",
        );
        let req = SearchRequest::new("q").unwrap().with_extension(Some("docx"));
        let dialect = dialect_for("windows").unwrap();

        let entries = search_files(&req, dialect, &runner).await.unwrap();
        assert_eq!(
            render_entries(&entries),
            "a.docx - file:C:/a.docx\nb.docx - file:C:/b.docx"
        );
        let sql = runner.captured()[0].env_value("LOCALFIND_SQL").unwrap().to_string();
        assert!(sql.contains("System.FileExtension = '.docx'"));
    }

    #[tokio::test]
    async fn launch_failure_is_index_unavailable() {
        let runner = MockRunner::launch_failure();
        let req = SearchRequest::new("q").unwrap();

        let err = search_files(&req, spotlight(), &runner).await.unwrap_err();
        assert!(matches!(err, SearchError::IndexUnavailable(ref m) if m.contains("mdfind")));
    }

    #[tokio::test]
    async fn native_failure_is_propagated() {
        let runner = MockRunner::with_output(CommandOutput {
            status: Some(3),
            stdout: String::new(),
            stderr: "syntax error near WHERE".into(),
        });
        let req = SearchRequest::new("q").unwrap();

        let err = search_files(&req, dialect_for("windows").unwrap(), &runner)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::QueryConstructionFailed(_)));
        assert!(err.to_string().contains("syntax error"));
    }

    #[test]
    fn empty_results_render_sentinel() {
        assert_eq!(render_entries(&[]), "No matching files found.");
    }

    #[test]
    fn entries_render_one_per_line() {
        let entries = vec![
            SearchResultEntry {
                name: "a.txt".into(),
                path: "file:///tmp/a.txt".into(),
                local_path: "/tmp/a.txt".into(),
            },
            SearchResultEntry {
                name: "b.txt".into(),
                path: "file:///tmp/b.txt".into(),
                local_path: "/tmp/b.txt".into(),
            },
        ];
        assert_eq!(
            render_entries(&entries),
            "a.txt - file:///tmp/a.txt\nb.txt - file:///tmp/b.txt"
        );
    }

    #[test]
    fn sentinel_messages_match_tool_contract() {
        assert_eq!(
            SearchError::UnsupportedPlatform("linux".into()).to_string(),
            "Unsupported operating system"
        );
        assert_eq!(
            SearchError::InvalidDateFormat("x".into()).to_string(),
            "Invalid date format. Use ISO 8601 (e.g., 2024-01-01T00:00:00)"
        );
    }
}
