use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Operating-system family a feature resolves commands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Macos,
    Linux,
}

impl Platform {
    /// The platform this binary was compiled for.
    ///
    /// Anything that is neither Windows nor macOS is treated as Linux.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::Macos
        } else {
            Platform::Linux
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Macos => "macos",
            Platform::Linux => "linux",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "windows" => Ok(Platform::Windows),
            "macos" | "darwin" | "mac" => Ok(Platform::Macos),
            "linux" => Ok(Platform::Linux),
            other => Err(format!(
                "invalid platform: {other} (expected \"windows\", \"macos\" or \"linux\")"
            )),
        }
    }
}

/// Which child output pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    /// Prefix applied to every line forwarded from this stream.
    pub fn line_prefix(self) -> &'static str {
        match self {
            StreamKind::Stdout => "",
            StreamKind::Stderr => "[ERR] ",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => f.write_str("stdout"),
            StreamKind::Stderr => f.write_str("stderr"),
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Succeeded,
    Failed,
}
