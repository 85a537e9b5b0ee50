// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::types::{Platform, StreamKind};

#[derive(Error, Debug)]
pub enum CheckpointError {
    /// One of the child's output pipes could not be attached.
    #[error("Failed to get {stream} pipeline: {reason}")]
    PipeSetupFailure { stream: StreamKind, reason: String },

    /// The executable could not be launched at all.
    #[error("Failed to start command: {source}")]
    StartFailure {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Non-zero / abnormal exit, or the wait itself failed.
    #[error("Process finished with error: {0}")]
    ProcessExitError(String),

    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    #[error("Feature '{feature}' is not available on {platform}")]
    Unsupported { feature: String, platform: Platform },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("no Tokio runtime available to run sessions on")]
    RuntimeUnavailable,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CheckpointError {
    /// The line written to the log sink when this error ends a session early.
    pub fn sink_line(&self) -> String {
        match self {
            CheckpointError::ProcessExitError(_) => format!("[STOP] {self}"),
            _ => format!("[ERROR] {self}"),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CheckpointError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipe_failure_renders_stream_name() {
        let err = CheckpointError::PipeSetupFailure {
            stream: StreamKind::Stdout,
            reason: "no handle".to_string(),
        };
        assert_eq!(
            err.sink_line(),
            "[ERROR] Failed to get stdout pipeline: no handle"
        );
    }

    #[test]
    fn exit_error_renders_as_stop_line() {
        let err = CheckpointError::ProcessExitError("exit status: 2".to_string());
        assert_eq!(
            err.sink_line(),
            "[STOP] Process finished with error: exit status: 2"
        );
    }
}
