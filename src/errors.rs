// src/errors.rs

//! Crate-wide error types.

use thiserror::Error;

/// Failure of a single command execution.
///
/// `captured_output` is the tail of the combined stdout/stderr stream, bounded
/// by [`crate::exec::CAPTURE_CAPACITY`].
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Failed to initialize pipe for output: {0}")]
    PipeSetup(#[source] std::io::Error),

    #[error("{exit_detail}\nStdout/err:\n{captured_output}")]
    CommandFailed {
        exit_detail: String,
        captured_output: String,
    },

    #[error("cancelled before the command exited\nStdout/err:\n{captured_output}")]
    Cancelled { captured_output: String },
}

impl ExecutionError {
    /// Captured combined output attached to this error, if any.
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            ExecutionError::PipeSetup(_) => None,
            ExecutionError::CommandFailed {
                captured_output, ..
            }
            | ExecutionError::Cancelled { captured_output } => Some(captured_output.as_str()),
        }
    }
}

#[derive(Error, Debug)]
pub enum LocalrunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Step not found: {0}")]
    StepNotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, LocalrunError>;
