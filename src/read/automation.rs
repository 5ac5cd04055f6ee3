//! Legacy binary Office formats (`.doc`, `.xls`, `.ppt`) through Office COM automation.
//!
//! Each read starts its own Office instance in a PowerShell child and quits it
//! in a `finally` block; nothing is shared between calls.

use std::path::Path;

use tracing::debug;

use crate::process::{self, CommandRunner};

use super::{DocumentKind, ReadError};

/// Environment variable carrying the document path into the script.
const DOCUMENT_ENV: &str = "LOCALFIND_DOCUMENT";

const PRELUDE: &str = r#"
$ErrorActionPreference = 'Stop'
[Console]::OutputEncoding = [System.Text.Encoding]::UTF8
"#;

const WORD_SCRIPT: &str = r#"
$app = New-Object -ComObject Word.Application
try {
    $app.Visible = $false
    $doc = $app.Documents.Open($env:LOCALFIND_DOCUMENT, $false, $true)
    try {
        [Console]::Out.Write($doc.Content.Text)
    } finally {
        $doc.Close($false)
    }
} finally {
    $app.Quit()
    [void][System.Runtime.InteropServices.Marshal]::ReleaseComObject($app)
}
"#;

const EXCEL_SCRIPT: &str = r#"
$app = New-Object -ComObject Excel.Application
try {
    $app.Visible = $false
    $app.DisplayAlerts = $false
    $wb = $app.Workbooks.Open($env:LOCALFIND_DOCUMENT, 0, $true)
    try {
        foreach ($ws in $wb.Worksheets) {
            $range = $ws.UsedRange
            for ($r = 1; $r -le $range.Rows.Count; $r++) {
                $cells = for ($c = 1; $c -le $range.Columns.Count; $c++) {
                    [string]$range.Cells.Item($r, $c).Value2
                }
                [Console]::Out.WriteLine(($cells -join "`t"))
            }
        }
    } finally {
        $wb.Close($false)
    }
} finally {
    $app.Quit()
    [void][System.Runtime.InteropServices.Marshal]::ReleaseComObject($app)
}
"#;

const POWERPOINT_SCRIPT: &str = r#"
$app = New-Object -ComObject PowerPoint.Application
try {
    $pres = $app.Presentations.Open($env:LOCALFIND_DOCUMENT, $true, $false, $false)
    try {
        foreach ($slide in $pres.Slides) {
            foreach ($shape in $slide.Shapes) {
                if ($shape.HasTextFrame) {
                    [Console]::Out.WriteLine($shape.TextFrame.TextRange.Text)
                }
            }
        }
    } finally {
        $pres.Close()
    }
} finally {
    $app.Quit()
    [void][System.Runtime.InteropServices.Marshal]::ReleaseComObject($app)
}
"#;

fn script_for(kind: DocumentKind) -> String {
    let body = match kind {
        DocumentKind::Word => WORD_SCRIPT,
        DocumentKind::Excel => EXCEL_SCRIPT,
        DocumentKind::PowerPoint => POWERPOINT_SCRIPT,
    };
    format!("{PRELUDE}{body}")
}

pub(super) async fn read_with_office(
    path: &Path,
    kind: DocumentKind,
    runner: &impl CommandRunner,
) -> Result<String, ReadError> {
    let command =
        process::powershell(&script_for(kind)).env(DOCUMENT_ENV, path.to_string_lossy());
    let output = runner
        .run(&command)
        .await
        .map_err(|e| ReadError::Automation(format!("failed to launch PowerShell: {e}")))?;

    if !output.success() {
        return Err(ReadError::Automation(output.failure_message()));
    }
    debug!(path = %path.display(), ?kind, "office automation read complete");
    Ok(normalize_newlines(&output.stdout))
}

/// Office uses bare `\r` between paragraphs; callers expect `\n`.
fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .trim_end_matches('\n')
        .to_string()
}
