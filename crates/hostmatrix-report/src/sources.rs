//! Filesystem-backed source lookup for snippet extraction.

use std::borrow::Cow;
use std::fs;
use std::path::{Component, Path, PathBuf};

use hostmatrix_core::{SnippetUnavailable, SourceLookup};

/// Reads spec sources relative to a checkout root.
///
/// Paths that would escape the root (absolute paths, `..`) are treated as
/// missing rather than read.
#[derive(Debug, Clone)]
pub struct DirectorySources {
    root: PathBuf,
}

impl DirectorySources {
    /// Lookup resolving example paths against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Checkout root that example paths are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, file_path: &str) -> Option<PathBuf> {
        let relative = Path::new(file_path);
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::CurDir => {}
                Component::Normal(part) => resolved.push(part),
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        Some(resolved)
    }
}

impl SourceLookup for DirectorySources {
    fn lines(&self, file_path: &str) -> Result<Cow<'_, [String]>, SnippetUnavailable> {
        let missing = || SnippetUnavailable::SourceMissing {
            path: file_path.to_owned(),
        };
        let path = self.resolve(file_path).ok_or_else(missing)?;
        let text = fs::read_to_string(&path).map_err(|error| match error.kind() {
            std::io::ErrorKind::NotFound => missing(),
            _ => SnippetUnavailable::Unreadable {
                path: file_path.to_owned(),
                detail: error.to_string(),
            },
        })?;
        Ok(Cow::Owned(text.lines().map(str::to_owned).collect()))
    }
}
