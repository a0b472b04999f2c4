//! Storage, caching and rendering around the hostmatrix pivot engine.
//!
//! - [`store`]: `*.json` report discovery, loading, and the `.parsed` pivot cache
//! - [`sources`]: filesystem source lookup for failure snippets
//! - [`render`]: Markdown output that preserves engine ordering
//! - [`config`] and [`logging`]: front-end settings and `tracing` setup

pub mod config;
pub mod logging;
pub mod render;
pub mod sources;
pub mod store;

use std::path::Path;

use hostmatrix_core::{PivotReport, ReportPayload};
use hostmatrix_error::{MatrixError, Result};

pub use config::ServiceConfig;
pub use render::{render_pivots_markdown, render_report_list};
pub use sources::DirectorySources;
pub use store::{CacheStatus, PivotLoad, ReportEntry, ReportStore, SnippetSources};

/// Pivot a stored report according to `config`.
///
/// Snippets come from `config.source_root` when set, otherwise from the
/// payload's embedded sources.
pub fn pivot_stored_report(
    store: &ReportStore,
    id: &str,
    config: &ServiceConfig,
) -> Result<PivotLoad> {
    with_snippet_sources(config, |sources| {
        if config.use_cache {
            store.pivots(id, sources, &config.options)
        } else {
            store.pivots_uncached(id, sources, &config.options)
        }
    })
}

/// Pivot a report file outside any store. Never cached.
pub fn pivot_report_file(path: &Path, config: &ServiceConfig) -> Result<Vec<PivotReport>> {
    let payload = ReportPayload::from_slice(&std::fs::read(path)?)?;
    with_snippet_sources(config, |sources| sources.pivot(&payload, &config.options))
}

fn with_snippet_sources<T>(
    config: &ServiceConfig,
    f: impl FnOnce(SnippetSources<'_>) -> Result<T>,
) -> Result<T> {
    match &config.source_root {
        Some(root) => {
            let lookup = DirectorySources::new(root);
            let tag = lookup.root().display().to_string();
            f(SnippetSources::Lookup {
                sources: &lookup,
                tag: &tag,
            })
        }
        None => f(SnippetSources::Embedded),
    }
}

/// Render pivots as pretty JSON.
pub fn pivots_to_json(pivots: &[PivotReport]) -> Result<String> {
    serde_json::to_string_pretty(pivots)
        .map_err(|error| MatrixError::serialization(error.to_string()))
}
