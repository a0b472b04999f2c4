//! Host x test pivot engine for multi-host RSpec/Serverspec reports.
//!
//! The pipeline runs strictly forward:
//! 1. [`identity`] resolves each example's file path to a [`TestIdentity`].
//! 2. [`classify`] groups hosts by the set of roles their examples touch.
//! 3. [`pivot`] builds a column-aligned matrix per role-set, backfilling
//!    tests a host never ran as `missing`.
//! 4. [`annotate`] colors hosts, hides specs without failures, attaches source
//!    snippets to failing cells and sorts hosts naturally.
//!
//! [`engine`] wires the stages together. The engine is pure: source text is
//! reached only through the injected [`SourceLookup`].

pub mod annotate;
pub mod classify;
pub mod color;
pub mod engine;
pub mod identity;
pub mod model;
pub mod natural;
pub mod pivot;
pub mod snippet;

pub use annotate::{HostResult, PivotOptions, PivotReport, ResultCell, SpecSummary, annotate};
pub use classify::{EMPTY_ROLE_SET_LABEL, ResolvedHost, RoleSet, classify, classify_resolved};
pub use color::{ColorScale, NEUTRAL_COLOR, Rgb, success_color};
pub use engine::{pivot_json, pivot_payload, pivot_report};
pub use identity::{PathConvention, Resolution, TestIdentity, resolve};
pub use model::{ExampleRecord, ExampleStatus, HostRun, ReportPayload};
pub use natural::natural_cmp;
pub use pivot::{Cell, HostRow, RawPivot, RoleSummary, SpecGroup, build, success_percent};
pub use snippet::{
    NoSources, PayloadSources, Snippet, SnippetUnavailable, SourceLookup, extract_snippet,
};
