// src/export.rs

//! Saving the visible log to a file.
//!
//! The caller chooses the path (a save prompt, a CLI flag). A `None` path
//! means the user cancelled and is not an error.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use crate::errors::Result;
use crate::fs::FileSystem;

/// Suggested file name, e.g. `checkpoint-log-20250304-050607.txt`.
pub fn default_file_name(at: DateTime<Local>) -> String {
    format!("checkpoint-log-{}.txt", at.format("%Y%m%d-%H%M%S"))
}

/// Write `content` to `path`. Returns the path written, or `None` when the
/// user cancelled.
pub fn export_logs(
    fs: &dyn FileSystem,
    content: &str,
    path: Option<&Path>,
) -> Result<Option<PathBuf>> {
    let Some(path) = path else {
        info!("log export cancelled");
        return Ok(None);
    };

    fs.write(path, content.as_bytes())?;
    info!(path = ?path, bytes = content.len(), "logs exported");
    Ok(Some(path.to_path_buf()))
}

/// Accumulates sink lines in arrival order for later export.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    lines: Vec<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }
}
