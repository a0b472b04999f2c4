//! Input payload model: hosts, their executed examples, and optional sources.
//!
//! Field names follow the RSpec JSON formatter (`full_description`,
//! `file_path`, `line_number`); camelCase spellings are accepted as aliases.

use std::collections::BTreeMap;
use std::fmt;

use hostmatrix_error::{MatrixError, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// Outcome recorded for one example.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExampleStatus {
    Passed,
    Failed,
    Pending,
    /// Placeholder for a canonical test the host never ran.
    Missing,
    #[serde(other)]
    Unknown,
}

impl ExampleStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Pending => "pending",
            Self::Missing => "missing",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ExampleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One executed (or attempted) example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleRecord {
    #[serde(default)]
    pub description: String,
    #[serde(alias = "fullDescription")]
    pub full_description: String,
    #[serde(alias = "filePath")]
    pub file_path: String,
    #[serde(alias = "lineNumber")]
    pub line_number: u32,
    #[serde(deserialize_with = "observed_status")]
    pub status: ExampleStatus,
}

/// `missing` is reserved for backfilled cells; an input record claiming it is
/// treated like any other unrecognised status.
fn observed_status<'de, D>(deserializer: D) -> std::result::Result<ExampleStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match ExampleStatus::deserialize(deserializer)? {
        ExampleStatus::Missing => ExampleStatus::Unknown,
        status => status,
    })
}

/// One host's full execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRun {
    pub hostname: String,
    pub examples: Vec<ExampleRecord>,
}

/// Complete collected report consumed by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPayload {
    pub tests: Vec<HostRun>,
    /// Source text keyed by the example `file_path`, one entry per line.
    #[serde(default)]
    pub sources: BTreeMap<String, Vec<String>>,
}

impl ReportPayload {
    /// Parse and validate a payload from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let payload: Self = serde_json::from_str(text)
            .map_err(|error| MatrixError::malformed(error.to_string()))?;
        payload.validate()?;
        Ok(payload)
    }

    /// Parse and validate a payload from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let payload: Self = serde_json::from_slice(bytes)
            .map_err(|error| MatrixError::malformed(error.to_string()))?;
        payload.validate()?;
        Ok(payload)
    }

    /// Reject payloads the pivot cannot represent faithfully.
    pub fn validate(&self) -> Result<()> {
        for (index, host) in self.tests.iter().enumerate() {
            if host.hostname.trim().is_empty() {
                return Err(MatrixError::malformed(format!(
                    "tests[{index}].hostname is empty"
                )));
            }
        }
        Ok(())
    }
}
