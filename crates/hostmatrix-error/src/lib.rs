use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for hostmatrix operations.
///
/// Only fatal conditions live here. Per-cell problems such as a missing source
/// file for a snippet are modeled by the engine and never surface as a
/// `MatrixError`.
#[derive(Error, Debug)]
pub enum MatrixError {
    // === Input Errors ===
    /// The report payload is missing required fields or is not valid JSON.
    #[error("malformed report payload: {detail}")]
    MalformedInput { detail: String },

    // === Storage Errors ===
    /// No stored report has this identifier.
    #[error("report not found: '{id}'")]
    ReportNotFound { id: String },

    /// The identifier is not a bare `*.json` file name.
    #[error("invalid report identifier: '{id}'")]
    InvalidReportId { id: String },

    /// The reports directory does not exist or is not a directory.
    #[error("reports directory unavailable: '{path}'")]
    ReportsDirUnavailable { path: PathBuf },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure encoding engine output.
    #[error("serialization error: {detail}")]
    Serialization { detail: String },
}

/// Result type alias using `MatrixError`.
pub type Result<T> = std::result::Result<T, MatrixError>;

impl MatrixError {
    /// Create a malformed-input error.
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedInput {
            detail: detail.into(),
        }
    }

    /// Create a serialization error.
    pub fn serialization(detail: impl Into<String>) -> Self {
        Self::Serialization {
            detail: detail.into(),
        }
    }

    /// Process exit code for CLI front-ends.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::ReportNotFound { .. } => 1,
            _ => 2,
        }
    }
}
