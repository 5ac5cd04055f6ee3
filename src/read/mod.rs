//! Local file reading: plain UTF-8 first, then an Office reader chosen by extension.
//!
//! Failures never propagate; they become `[SKIP]` / `[ERROR]` sentinel text so
//! one unreadable file cannot fail a batch of reads.

mod automation;
mod docx;
mod ooxml;
mod pptx;
mod xlsx;

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::process::CommandRunner;

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("malformed XML: {0}")]
    Xml(#[from] xml::reader::Error),

    #[error("missing document part: {0}")]
    MissingPart(String),

    #[error("invalid cell value: {0}")]
    InvalidCell(String),

    #[error("sheet too large: {rows} rows x {columns} columns")]
    SheetTooLarge { rows: usize, columns: usize },

    #[error("Office automation failed: {0}")]
    Automation(String),

    #[error("reader task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DocumentKind {
    Word,
    Excel,
    PowerPoint,
}

impl DocumentKind {
    /// Kind and whether the extension is a legacy binary format.
    fn from_extension(ext: &str) -> Option<(Self, bool)> {
        match ext {
            ".docx" => Some((Self::Word, false)),
            ".doc" => Some((Self::Word, true)),
            ".xlsx" => Some((Self::Excel, false)),
            ".xls" => Some((Self::Excel, true)),
            ".pptx" => Some((Self::PowerPoint, false)),
            ".ppt" => Some((Self::PowerPoint, true)),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Word => "Word",
            Self::Excel => "Excel",
            Self::PowerPoint => "PowerPoint",
        }
    }

    fn read_package(self, path: &Path) -> Result<String, ReadError> {
        match self {
            Self::Word => docx::read_docx(path),
            Self::Excel => xlsx::read_xlsx(path),
            Self::PowerPoint => pptx::read_pptx(path),
        }
    }
}

/// Lower-cased extension including the dot, or `""`.
fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Read `path` as text. Always returns a string; see the module docs.
///
/// `host_os` decides whether legacy formats go through Office automation
/// (Windows only) or the zip-based reader of the same family.
pub async fn read_local_file(path: &Path, runner: &impl CommandRunner, host_os: &str) -> String {
    match tokio::fs::read(path).await {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) => return text,
            Err(_) => debug!(path = %path.display(), "not UTF-8 text; dispatching by extension"),
        },
        Err(e) => debug!(path = %path.display(), error = %e, "plain read failed; dispatching by extension"),
    }

    let ext = extension_of(path);
    let Some((kind, legacy)) = DocumentKind::from_extension(&ext) else {
        return format!("[SKIP] Unsupported file type: {ext}");
    };

    let result = if legacy && host_os == "windows" {
        automation::read_with_office(path, kind, runner).await
    } else {
        let owned: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || kind.read_package(&owned))
            .await
            .map_err(ReadError::from)
            .and_then(|r| r)
    };

    match result {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %path.display(), kind = kind.label(), error = %e, "document read failed");
            format!("[ERROR] Failed to read {} file: {e}", kind.label())
        }
    }
}
