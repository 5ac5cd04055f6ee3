mod errors;
mod params;

pub use params::{LocalReadFileParams, SearchLocalFilesParams};

use std::path::Path;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};

use tracing::info;

use errors::search_error_response;

use crate::process::{CommandRunner, ProcessRunner};
use crate::read;
use crate::search::{self, SearchError, SearchRequest, SearchResultEntry};

/// MCP server handler providing local index search and file reading.
///
/// The host OS picks the index: Windows Search on Windows, Spotlight on macOS.
#[derive(Clone)]
pub struct LocalFind {
    runner: ProcessRunner,
    host_os: &'static str,
    tool_router: ToolRouter<Self>,
}

impl Default for LocalFind {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_router]
impl LocalFind {
    pub fn new() -> Self {
        Self {
            runner: ProcessRunner,
            host_os: std::env::consts::OS,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        name = "search_local_files",
        description = "Search indexed files on Windows (Windows Search) or macOS (Spotlight) by content. Optionally filter by file extension, modified date (ISO 8601), and file size range (KB). Returns one \"name - path\" line per match."
    )]
    async fn search_local_files(
        &self,
        Parameters(params): Parameters<SearchLocalFilesParams>,
    ) -> Result<CallToolResult, McpError> {
        if params.query.trim().is_empty() {
            return Err(McpError::invalid_params("query must not be empty", None));
        }

        info!(
            query = %params.query,
            extension = ?params.extension,
            modified_after = ?params.modified_after,
            min_size_kb = ?params.min_size_kb,
            max_size_kb = ?params.max_size_kb,
            os = self.host_os,
            "tool:search_local_files"
        );

        search_on(params, self.host_os, &self.runner).await
    }

    #[tool(
        name = "local_read_file",
        description = "Read a local file and return its text. UTF-8 text files are returned as-is; Word (.docx), Excel (.xlsx, tab-separated rows), and PowerPoint (.pptx) files are converted to plain text. Legacy .doc/.xls/.ppt use Microsoft Office on Windows. Unsupported types return a [SKIP] note; read failures return an [ERROR] note."
    )]
    async fn local_read_file(
        &self,
        Parameters(params): Parameters<LocalReadFileParams>,
    ) -> Result<CallToolResult, McpError> {
        if params.path.trim().is_empty() {
            return Err(McpError::invalid_params("path must not be empty", None));
        }

        info!(path = %params.path, "tool:local_read_file");

        let text = read::read_local_file(Path::new(&params.path), &self.runner, self.host_os).await;

        info!(path = %params.path, chars = text.chars().count(), "local_read_file complete");
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

/// Run one search on `host_os` and shape the outcome as the tool result.
async fn search_on(
    params: SearchLocalFilesParams,
    host_os: &str,
    runner: &impl CommandRunner,
) -> Result<CallToolResult, McpError> {
    let entries = match run_search(params, host_os, runner).await {
        Ok(entries) => entries,
        Err(e) => return search_error_response(e),
    };

    info!(matches = entries.len(), "search_local_files complete");
    Ok(CallToolResult::success(vec![Content::text(
        search::render_entries(&entries),
    )]))
}

/// The host is checked first; filters are validated only on a supported platform.
async fn run_search(
    params: SearchLocalFilesParams,
    host_os: &str,
    runner: &impl CommandRunner,
) -> Result<Vec<SearchResultEntry>, SearchError> {
    let dialect = search::dialect_for(host_os)?;

    // Blank optional strings mean "no filter".
    let modified_after = params
        .modified_after
        .as_deref()
        .filter(|s| !s.trim().is_empty());

    let request = SearchRequest::new(&params.query)?
        .with_extension(params.extension.as_deref())
        .with_modified_after(modified_after)?
        .with_size_range(params.min_size_kb, params.max_size_kb)?;

    search::search_files(&request, dialect, runner).await
}

#[tool_handler]
impl ServerHandler for LocalFind {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "localfind".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(
                "localfind searches the operating system's file index (search_local_files) and reads local documents as text (local_read_file)."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
