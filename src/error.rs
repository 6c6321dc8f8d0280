//! Error types for the installer analysis engine.
//!
//! Only `Io` is fatal for a single file's analysis. Every other variant is
//! recovered by the pipeline and surfaced as an `AnalysisWarning`.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for unattend operations.
#[derive(Debug, Error)]
pub enum UnattendError {
    /// Input unreadable or too short to classify
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Corrupt metadata region
    #[error("Parse error at offset {offset:#x}: {message}")]
    Parse { offset: u64, message: String },

    /// Child process could not be started
    #[error("Failed to launch {program}: {source}")]
    ProcessLaunch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Child process exceeded its wall-clock budget
    #[error("Process timeout after {millis}ms")]
    ProcessTimeout { millis: u64 },

    /// Extraction tool is not installed or not on PATH
    #[error("External tool not found: {0}")]
    ExternalToolMissing(String),

    /// Extraction tool ran but failed
    #[error("External tool {tool} failed: {message}")]
    ExternalTool { tool: String, message: String },

    /// Community database could not be reached or answered garbage
    #[error("Community database unavailable: {0}")]
    CommunityUnavailable(String),

    /// The session cancelled the analysis
    #[error("Analysis cancelled")]
    Cancelled,

    /// Configuration rejected by validation
    #[error("Invalid configuration: {field} - {message}")]
    InvalidConfig { field: String, message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for unattend operations
pub type Result<T> = std::result::Result<T, UnattendError>;

impl UnattendError {
    pub fn parse(offset: u64, message: impl Into<String>) -> Self {
        Self::Parse {
            offset,
            message: message.into(),
        }
    }

    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(feature = "community-http")]
impl From<reqwest::Error> for UnattendError {
    fn from(err: reqwest::Error) -> Self {
        Self::CommunityUnavailable(err.to_string())
    }
}
