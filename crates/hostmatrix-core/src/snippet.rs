//! Source snippet extraction around a failing example.
//!
//! Source text is reached through the [`SourceLookup`] capability so the
//! engine never touches the filesystem itself. A lookup failure only costs the
//! affected cell its snippet.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a failing cell has no snippet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnippetUnavailable {
    #[error("no source available for '{path}'")]
    SourceMissing { path: String },

    #[error("source for '{path}' could not be read: {detail}")]
    Unreadable { path: String, detail: String },

    #[error("line {line} is outside the {len}-line source")]
    LineOutOfRange { line: u32, len: usize },
}

/// Source lines for a file path, 1-indexed by position.
pub trait SourceLookup {
    fn lines(&self, file_path: &str) -> Result<Cow<'_, [String]>, SnippetUnavailable>;
}

/// Lookup that never has source; every snippet degrades to empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSources;

impl SourceLookup for NoSources {
    fn lines(&self, file_path: &str) -> Result<Cow<'_, [String]>, SnippetUnavailable> {
        Err(SnippetUnavailable::SourceMissing {
            path: file_path.to_owned(),
        })
    }
}

/// Lookup over the `sources` map carried inside a report payload.
#[derive(Debug, Clone, Copy)]
pub struct PayloadSources<'a>(pub &'a BTreeMap<String, Vec<String>>);

impl SourceLookup for PayloadSources<'_> {
    fn lines(&self, file_path: &str) -> Result<Cow<'_, [String]>, SnippetUnavailable> {
        self.0
            .get(file_path)
            .map(|lines| Cow::Borrowed(lines.as_slice()))
            .ok_or_else(|| SnippetUnavailable::SourceMissing {
                path: file_path.to_owned(),
            })
    }
}

/// A contiguous block of source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    /// 1-indexed line number of the first line in `text`.
    pub start_line: u32,
    pub text: String,
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn is_indented(line: &str) -> bool {
    line.starts_with(char::is_whitespace)
}

/// Expand around `line_number` to the enclosing logical block.
///
/// Walking stops at a blank line unless the line on the near side of it is
/// indented, so blank lines inside a block are crossed but blank lines between
/// top-level blocks are not. Blank boundary lines are trimmed from the result.
pub fn extract_snippet(lines: &[String], line_number: u32) -> Result<Snippet, SnippetUnavailable> {
    let out_of_range = || SnippetUnavailable::LineOutOfRange {
        line: line_number,
        len: lines.len(),
    };
    let index = usize::try_from(line_number)
        .ok()
        .and_then(|line| line.checked_sub(1))
        .filter(|&index| index < lines.len())
        .ok_or_else(out_of_range)?;

    let mut start = index;
    while start > 0 && (!is_blank(&lines[start - 1]) || is_indented(&lines[start])) {
        start -= 1;
    }
    let mut end = index;
    while end + 1 < lines.len() && (!is_blank(&lines[end + 1]) || is_indented(&lines[end])) {
        end += 1;
    }

    while start < end && is_blank(&lines[start]) {
        start += 1;
    }
    while end > start && is_blank(&lines[end]) {
        end -= 1;
    }

    Ok(Snippet {
        start_line: u32::try_from(start + 1).map_err(|_| out_of_range())?,
        text: lines[start..=end].join("\n"),
    })
}
