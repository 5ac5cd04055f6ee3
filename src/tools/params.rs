use schemars::JsonSchema;
use serde::Deserialize;

#[derive(Deserialize, JsonSchema)]
pub struct SearchLocalFilesParams {
    /// Full-text search query matched against indexed file contents
    pub query: String,
    /// File extension filter without the leading dot (e.g., "pdf", "docx")
    pub extension: Option<String>,
    /// Only files modified at or after this ISO 8601 date-time (e.g., "2024-01-01T00:00:00")
    pub modified_after: Option<String>,
    /// Minimum file size in KB (inclusive)
    pub min_size_kb: Option<u64>,
    /// Maximum file size in KB (inclusive)
    pub max_size_kb: Option<u64>,
}

#[derive(Deserialize, JsonSchema)]
pub struct LocalReadFileParams {
    /// Absolute path of the file to read. Plain text is returned as-is; .docx, .xlsx, and .pptx are converted to text.
    pub path: String,
}
