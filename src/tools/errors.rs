use rmcp::ErrorData as McpError;
use rmcp::model::{CallToolResult, Content};
use tracing::warn;

use crate::search::SearchError;

/// Map a search failure onto the tool result.
///
/// Caller mistakes and unsupported hosts answer with descriptive text, which
/// is the tool's contract; index faults become MCP errors.
pub(super) fn search_error_response(e: SearchError) -> Result<CallToolResult, McpError> {
    match &e {
        SearchError::EmptyQuery => Err(McpError::invalid_params(e.to_string(), None)),
        SearchError::InvalidDateFormat(raw) => {
            warn!(modified_after = %raw, "rejected modified_after");
            Ok(CallToolResult::success(vec![Content::text(e.to_string())]))
        }
        SearchError::InvalidSizeRange { .. } => {
            warn!(error = %e, "rejected size range");
            Ok(CallToolResult::success(vec![Content::text(e.to_string())]))
        }
        SearchError::UnsupportedPlatform(os) => {
            warn!(%os, "search requested on unsupported platform");
            Ok(CallToolResult::success(vec![Content::text(e.to_string())]))
        }
        SearchError::QueryConstructionFailed(_) | SearchError::IndexUnavailable(_) => {
            Err(McpError::internal_error(e.to_string(), None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(result: CallToolResult) -> String {
        result.content[0].as_text().unwrap().text.clone()
    }

    #[test]
    fn empty_query_is_invalid_params() {
        let err = search_error_response(SearchError::EmptyQuery).unwrap_err();
        assert_eq!(err.code, rmcp::model::ErrorCode(-32602));
    }

    #[test]
    fn validation_failures_are_text() {
        let result = search_error_response(SearchError::InvalidDateFormat("x".into())).unwrap();
        assert!(text(result).starts_with("Invalid date format"));

        let result =
            search_error_response(SearchError::InvalidSizeRange { min: 5, max: 1 }).unwrap();
        assert!(text(result).contains("max_size_kb"));
    }

    #[test]
    fn unsupported_platform_is_text() {
        let result =
            search_error_response(SearchError::UnsupportedPlatform("linux".into())).unwrap();
        assert_eq!(text(result), "Unsupported operating system");
    }

    #[test]
    fn index_faults_are_internal_errors() {
        for e in [
            SearchError::QueryConstructionFailed("bad".into()),
            SearchError::IndexUnavailable("down".into()),
        ] {
            let err = search_error_response(e).unwrap_err();
            assert_eq!(err.code, rmcp::model::ErrorCode(-32603));
        }
    }
}
