//! On-disk report storage and pivot cache.
//!
//! Reports are `*.json` files directly under a root directory; the file name
//! is the report identifier. Pivot output is cached next to each report in a
//! `<stem>.parsed` file stamped with a SHA-256 fingerprint of the raw report
//! bytes and the pivot options. A cache file whose fingerprint does not match
//! is a miss and is overwritten.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use hostmatrix_core::{
    PayloadSources, PivotOptions, PivotReport, ReportPayload, SourceLookup, natural_cmp,
};
use hostmatrix_error::{MatrixError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

/// Extension of stored reports.
pub const REPORT_EXTENSION: &str = "json";
/// Extension of cached pivot output.
pub const CACHE_EXTENSION: &str = "parsed";
/// Serialization schema version for [`CachedPivots`].
pub const CACHE_SCHEMA_VERSION: u32 = 1;
/// Reports root used when neither flag nor environment names one.
pub const DEFAULT_REPORTS_DIR: &str = "./reports";
/// Environment variable overriding the reports root.
pub const REPORTS_DIR_ENV: &str = "HOSTMATRIX_REPORTS_DIR";

/// One stored report as seen by a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub id: String,
    pub modified_unix_ms: u64,
    pub size_bytes: u64,
}

/// Contents of a `.parsed` cache file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPivots {
    pub schema_version: u32,
    pub fingerprint: String,
    pub pivots: Vec<PivotReport>,
}

/// Whether [`ReportStore::pivots`] was served from cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    Hit,
    Miss,
    /// Computed fresh, but the cache file could not be written.
    WriteFailed,
    Bypassed,
}

/// Where snippet source text comes from when pivoting a stored report.
#[derive(Clone, Copy)]
pub enum SnippetSources<'a> {
    /// The `sources` map embedded in the report payload.
    Embedded,
    /// An external lookup; `tag` names it in the cache fingerprint so output
    /// produced from different source trees is never confused.
    Lookup {
        sources: &'a dyn SourceLookup,
        tag: &'a str,
    },
}

impl SnippetSources<'_> {
    fn cache_tag(&self) -> String {
        match self {
            Self::Embedded => "embedded".to_owned(),
            Self::Lookup { tag, .. } => format!("lookup:{tag}"),
        }
    }

    pub(crate) fn pivot(self, payload: &ReportPayload, options: &PivotOptions) -> Result<Vec<PivotReport>> {
        match self {
            Self::Embedded => hostmatrix_core::pivot_report(
                payload,
                &PayloadSources(&payload.sources),
                options,
            ),
            Self::Lookup { sources, .. } => {
                hostmatrix_core::pivot_report(payload, sources, options)
            }
        }
    }
}

/// Pivot output for a stored report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotLoad {
    pub pivots: Vec<PivotReport>,
    pub cache: CacheStatus,
}

/// Directory of stored reports.
#[derive(Debug, Clone)]
pub struct ReportStore {
    root: PathBuf,
}

impl ReportStore {
    /// Open a store rooted at `root`, which must be an existing directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(MatrixError::ReportsDirUnavailable { path: root });
        }
        Ok(Self { root })
    }

    /// Directory the store lists and reads reports from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stored reports, most recently modified first.
    pub fn list(&self) -> Result<Vec<ReportEntry>> {
        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&self.root)? {
            let dir_entry = dir_entry?;
            let path = dir_entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(REPORT_EXTENSION) {
                continue;
            }
            let Some(id) = path.file_name().and_then(|name| name.to_str()) else {
                warn!(path = %path.display(), "skipping report with non UTF-8 name");
                continue;
            };
            let metadata = dir_entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            let modified_unix_ms = metadata
                .modified()
                .ok()
                .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
                .map_or(0, |duration| {
                    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
                });
            entries.push(ReportEntry {
                id: id.to_owned(),
                modified_unix_ms,
                size_bytes: metadata.len(),
            });
        }

        entries.sort_by(|a, b| {
            b.modified_unix_ms
                .cmp(&a.modified_unix_ms)
                .then_with(|| natural_cmp(&a.id, &b.id))
        });
        debug!(root = %self.root.display(), reports = entries.len(), "reports listed");
        Ok(entries)
    }

    /// Path of the report named `id`, after checking the identifier shape.
    pub fn report_path(&self, id: &str) -> Result<PathBuf> {
        validate_report_id(id)?;
        Ok(self.root.join(id))
    }

    /// Path of the pivot cache belonging to report `id`.
    pub fn cache_path(&self, id: &str) -> Result<PathBuf> {
        Ok(self.report_path(id)?.with_extension(CACHE_EXTENSION))
    }

    /// Raw bytes of report `id`.
    pub fn read_raw(&self, id: &str) -> Result<Vec<u8>> {
        let path = self.report_path(id)?;
        fs::read(&path).map_err(|error| match error.kind() {
            io::ErrorKind::NotFound => MatrixError::ReportNotFound { id: id.to_owned() },
            _ => MatrixError::Io(error),
        })
    }

    /// Parsed payload of report `id`.
    pub fn load(&self, id: &str) -> Result<ReportPayload> {
        ReportPayload::from_slice(&self.read_raw(id)?)
    }

    /// Pivot report `id`, reusing the cache when its fingerprint still matches.
    ///
    /// Read raw bytes, fingerprint, return a valid cache entry if present,
    /// otherwise compute, persist, and return.
    pub fn pivots(
        &self,
        id: &str,
        sources: SnippetSources<'_>,
        options: &PivotOptions,
    ) -> Result<PivotLoad> {
        let raw = self.read_raw(id)?;
        let fingerprint = fingerprint(&raw, options, &sources.cache_tag())?;
        let cache_path = self.cache_path(id)?;

        if let Some(cached) = read_cache(&cache_path, &fingerprint) {
            debug!(report = id, "pivot cache hit");
            return Ok(PivotLoad {
                pivots: cached.pivots,
                cache: CacheStatus::Hit,
            });
        }

        let payload = ReportPayload::from_slice(&raw)?;
        let pivots = sources.pivot(&payload, options)?;
        let cached = CachedPivots {
            schema_version: CACHE_SCHEMA_VERSION,
            fingerprint,
            pivots,
        };
        let cache = match write_cache(&cache_path, &cached) {
            Ok(()) => {
                info!(report = id, cache = %cache_path.display(), "pivot cache refreshed");
                CacheStatus::Miss
            }
            Err(error) => {
                warn!(
                    report = id,
                    cache = %cache_path.display(),
                    error = %error,
                    "pivot cache not written"
                );
                CacheStatus::WriteFailed
            }
        };

        Ok(PivotLoad {
            pivots: cached.pivots,
            cache,
        })
    }

    /// Pivot report `id` without reading or writing the cache.
    pub fn pivots_uncached(
        &self,
        id: &str,
        sources: SnippetSources<'_>,
        options: &PivotOptions,
    ) -> Result<PivotLoad> {
        let payload = self.load(id)?;
        let pivots = sources.pivot(&payload, options)?;
        Ok(PivotLoad {
            pivots,
            cache: CacheStatus::Bypassed,
        })
    }
}

/// Reject identifiers that are not a bare `*.json` file name.
pub fn validate_report_id(id: &str) -> Result<()> {
    let invalid = || MatrixError::InvalidReportId { id: id.to_owned() };
    let Some(stem) = id.strip_suffix(&format!(".{REPORT_EXTENSION}")) else {
        return Err(invalid());
    };
    if stem.is_empty() || id.starts_with('.') || id.contains(['/', '\\', '\0']) {
        return Err(invalid());
    }
    Ok(())
}

/// SHA-256 over the raw report bytes and everything else that shapes the output.
pub fn fingerprint(raw: &[u8], options: &PivotOptions, source_tag: &str) -> Result<String> {
    let options_json = serde_json::to_vec(options)
        .map_err(|error| MatrixError::serialization(error.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(raw);
    hasher.update([0u8]);
    hasher.update(&options_json);
    hasher.update([0u8]);
    hasher.update(source_tag.as_bytes());
    let digest = hasher.finalize();
    Ok(format!("{digest:x}"))
}

fn read_cache(path: &Path, fingerprint: &str) -> Option<CachedPivots> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return None,
        Err(error) => {
            warn!(cache = %path.display(), error = %error, "pivot cache unreadable");
            return None;
        }
    };
    let cached: CachedPivots = match serde_json::from_slice(&bytes) {
        Ok(cached) => cached,
        Err(error) => {
            warn!(cache = %path.display(), error = %error, "pivot cache corrupt");
            return None;
        }
    };
    if cached.schema_version != CACHE_SCHEMA_VERSION || cached.fingerprint != fingerprint {
        debug!(cache = %path.display(), "pivot cache stale");
        return None;
    }
    Some(cached)
}

/// Persist `cached` at `path` via a sibling temp file; the temp file never
/// outlives a failed write.
fn write_cache(path: &Path, cached: &CachedPivots) -> Result<()> {
    let bytes = serde_json::to_vec(cached)
        .map_err(|error| MatrixError::serialization(error.to_string()))?;
    let tmp_path = path.with_extension(format!("{CACHE_EXTENSION}.tmp"));
    let written = fs::write(&tmp_path, bytes).and_then(|()| fs::rename(&tmp_path, path));
    if let Err(error) = written {
        if let Err(cleanup) = fs::remove_file(&tmp_path) {
            if cleanup.kind() != io::ErrorKind::NotFound {
                debug!(tmp = %tmp_path.display(), error = %cleanup, "stale cache temp file left");
            }
        }
        return Err(MatrixError::Io(error));
    }
    Ok(())
}
