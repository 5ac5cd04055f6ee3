//! Windows Search (`SYSTEMINDEX`) over ADODB, driven through PowerShell.

use std::path::PathBuf;

use crate::process::{self, CommandOutput, NativeCommand};

use super::{QueryDialect, SearchError, SearchRequest, SearchResultEntry};

/// Environment variable carrying the SQL statement into the script.
pub(crate) const SQL_ENV: &str = "LOCALFIND_SQL";

const EXIT_CONNECT_FAILED: i32 = 2;
const EXIT_QUERY_FAILED: i32 = 3;

/// Opens one ADODB connection, runs the statement, prints
/// `name<TAB>url<TAB>path` per row, and closes recordset and connection on
/// every exit path.
const QUERY_SCRIPT: &str = r#"
$ErrorActionPreference = 'Stop'
[Console]::OutputEncoding = [System.Text.Encoding]::UTF8
$conn = New-Object -ComObject ADODB.Connection
try {
    $conn.Open("Provider=Search.CollatorDSO;Extended Properties='Application=Windows';")
} catch {
    [Console]::Error.WriteLine($_.Exception.Message)
    exit 2
}
try {
    try {
        $rs = $conn.Execute($env:LOCALFIND_SQL)
    } catch {
        [Console]::Error.WriteLine($_.Exception.Message)
        exit 3
    }
    try {
        while (-not $rs.EOF) {
            $name = $rs.Fields.Item('System.ItemName').Value
            $url = $rs.Fields.Item('System.ItemUrl').Value
            $path = $rs.Fields.Item('System.ItemPathDisplay').Value
            [Console]::Out.WriteLine("$name`t$url`t$path")
            $rs.MoveNext()
        }
    } finally {
        $rs.Close()
    }
} finally {
    $conn.Close()
}
"#;

#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsIndexDialect;

impl QueryDialect for WindowsIndexDialect {
    fn name(&self) -> &'static str {
        "windows-search"
    }

    fn build_query(&self, request: &SearchRequest) -> String {
        let mut conditions = vec![format!("CONTAINS('{}')", escape_sql(&request.query))];

        if let Some(ext) = &request.extension {
            // System.FileExtension includes the dot.
            conditions.push(format!("System.FileExtension = '.{}'", escape_sql(ext)));
        }
        if let Some(after) = request.modified_after {
            conditions.push(format!(
                "System.DateModified >= '{}'",
                after.format("%Y-%m-%dT%H:%M:%S")
            ));
        }
        if let Some(min) = request.min_size_bytes() {
            conditions.push(format!("System.Size >= {min}"));
        }
        if let Some(max) = request.max_size_bytes() {
            conditions.push(format!("System.Size <= {max}"));
        }

        format!(
            "SELECT System.ItemName, System.ItemUrl, System.ItemPathDisplay FROM SYSTEMINDEX WHERE {}",
            conditions.join(" AND ")
        )
    }

    fn command(&self, query: &str) -> NativeCommand {
        process::powershell(QUERY_SCRIPT).env(SQL_ENV, query)
    }

    fn row_separator(&self) -> char {
        '\n'
    }

    fn extract_entry(&self, row: &str) -> Option<SearchResultEntry> {
        let mut fields = row.trim_end_matches('\r').split('\t');
        let name = fields.next()?.trim();
        let url = fields.next()?.trim();
        let display = fields.next().unwrap_or("").trim();
        if name.is_empty() || url.is_empty() {
            return None;
        }

        let local_path = if display.is_empty() {
            PathBuf::from(url.strip_prefix("file:").unwrap_or(url))
        } else {
            PathBuf::from(display)
        };

        Some(SearchResultEntry {
            name: name.to_string(),
            path: url.to_string(),
            local_path,
        })
    }

    fn classify_failure(&self, output: &CommandOutput) -> Option<SearchError> {
        match output.status {
            Some(0) => None,
            Some(EXIT_QUERY_FAILED) => {
                Some(SearchError::QueryConstructionFailed(output.failure_message()))
            }
            // EXIT_CONNECT_FAILED, a missing ADODB provider, or a crashed host.
            _ => Some(SearchError::IndexUnavailable(output.failure_message())),
        }
    }
}

/// Escape a value for a single-quoted Windows Search SQL literal.
fn escape_sql(value: &str) -> String {
    value.replace('\'', "''")
}
