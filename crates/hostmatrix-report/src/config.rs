//! Front-end configuration shared by the CLI and any embedding service.

use std::path::PathBuf;

use hostmatrix_core::PivotOptions;

use crate::store::{DEFAULT_REPORTS_DIR, REPORTS_DIR_ENV};

/// Settings for serving pivots out of a report store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub reports_dir: PathBuf,
    /// Checkout root used to read spec sources for snippets; when absent the
    /// payload's embedded `sources` are used.
    pub source_root: Option<PathBuf>,
    pub use_cache: bool,
    pub options: PivotOptions,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            reports_dir: PathBuf::from(DEFAULT_REPORTS_DIR),
            source_root: None,
            use_cache: true,
            options: PivotOptions::default(),
        }
    }
}

/// Pick the reports root: explicit flag, then environment value, then default.
#[must_use]
pub fn resolve_reports_dir(flag: Option<PathBuf>, env_value: Option<String>) -> PathBuf {
    flag.or_else(|| {
        env_value
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
    })
    .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORTS_DIR))
}

/// [`resolve_reports_dir`] reading `HOSTMATRIX_REPORTS_DIR` from the process environment.
#[must_use]
pub fn reports_dir_from_env(flag: Option<PathBuf>) -> PathBuf {
    resolve_reports_dir(flag, std::env::var(REPORTS_DIR_ENV).ok())
}
