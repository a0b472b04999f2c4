//! Presentation pass: colors, failing-spec filter, snippets and host order.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::color::ColorScale;
use crate::model::{ExampleRecord, ExampleStatus};
use crate::natural::natural_cmp;
use crate::pivot::{Cell, RawPivot, RoleSummary};
use crate::snippet::{Snippet, SnippetUnavailable, SourceLookup, extract_snippet};

/// Tunables for the presentation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotOptions {
    pub colors: ColorScale,
    /// Extract source snippets for failing cells.
    pub snippets: bool,
}

impl Default for PivotOptions {
    fn default() -> Self {
        Self {
            colors: ColorScale::default(),
            snippets: true,
        }
    }
}

/// A spec with at least one failing cell in its role-set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecSummary {
    pub role: String,
    pub spec: String,
    /// Distinct namespaces among the spec's columns, sorted; empty for
    /// two-segment paths.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub namespaces: Vec<String>,
    pub tests: usize,
    pub failures: usize,
}

/// One rendered cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultCell {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub namespace: Option<String>,
    pub role: String,
    pub spec: String,
    pub line_number: u32,
    pub full_description: String,
    pub status: ExampleStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub example: Option<ExampleRecord>,
    /// Only failing cells carry source.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source: Option<Snippet>,
}

/// One host's row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostResult {
    pub name: String,
    pub success: usize,
    pub failure: usize,
    pub color: String,
    pub cells: Vec<ResultCell>,
}

/// Fully annotated pivot for one role-set, ready to render as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotReport {
    pub name: String,
    pub roles: BTreeMap<String, RoleSummary>,
    pub specs: Vec<SpecSummary>,
    pub results: Vec<HostResult>,
    /// Canonical test count before the failing-spec filter.
    pub tests: usize,
    pub percent: Option<u8>,
}

struct SnippetSource<'s> {
    sources: &'s dyn SourceLookup,
    loaded: HashMap<String, Result<Cow<'s, [String]>, SnippetUnavailable>>,
}

impl<'s> SnippetSource<'s> {
    fn new(sources: &'s dyn SourceLookup) -> Self {
        Self {
            sources,
            loaded: HashMap::new(),
        }
    }

    fn snippet(&mut self, example: &ExampleRecord) -> Option<Snippet> {
        let sources = self.sources;
        let lines = self
            .loaded
            .entry(example.file_path.clone())
            .or_insert_with(|| sources.lines(&example.file_path));
        let result = match lines {
            Ok(lines) => extract_snippet(lines, example.line_number),
            Err(unavailable) => Err(unavailable.clone()),
        };
        match result {
            Ok(snippet) => Some(snippet),
            Err(unavailable) => {
                tracing::debug!(
                    file_path = %example.file_path,
                    line = example.line_number,
                    reason = %unavailable,
                    "snippet unavailable"
                );
                None
            }
        }
    }
}

/// Apply colors, the failing-spec filter, snippets and natural host order.
///
/// Counts, `tests` and `percent` describe the unfiltered pivot.
#[must_use]
pub fn annotate(raw: RawPivot, sources: &dyn SourceLookup, options: &PivotOptions) -> PivotReport {
    let group_failures = raw.group_failures();
    let percent = raw.percent();
    let RawPivot {
        label,
        tests,
        groups,
        roles,
        hosts,
    } = raw;

    let mut visible_columns = vec![false; tests.len()];
    let mut specs = Vec::new();
    for (group, failures) in groups.iter().zip(group_failures) {
        if failures == 0 {
            continue;
        }
        visible_columns[group.columns.clone()].fill(true);
        let namespaces: BTreeSet<&str> = tests[group.columns.clone()]
            .iter()
            .filter_map(|test| test.namespace.as_deref())
            .collect();
        specs.push(SpecSummary {
            role: group.role.clone(),
            spec: group.spec.clone(),
            namespaces: namespaces.into_iter().map(str::to_owned).collect(),
            tests: group.columns.len(),
            failures,
        });
    }

    let mut snippets = SnippetSource::new(sources);
    let mut results: Vec<HostResult> = hosts
        .into_iter()
        .map(|row| {
            let cells = row
                .cells
                .into_iter()
                .zip(&tests)
                .zip(&visible_columns)
                .filter(|(_, visible)| **visible)
                .map(|((Cell { status, example }, identity), _)| {
                    let source = match (&example, status) {
                        (Some(example), ExampleStatus::Failed) if options.snippets => {
                            snippets.snippet(example)
                        }
                        _ => None,
                    };
                    ResultCell {
                        namespace: identity.namespace.clone(),
                        role: identity.role.clone(),
                        spec: identity.spec.clone(),
                        line_number: identity.line_number,
                        full_description: identity.full_description.clone(),
                        status,
                        example,
                        source,
                    }
                })
                .collect();
            HostResult {
                color: options.colors.color(row.success, row.failure),
                name: row.hostname,
                success: row.success,
                failure: row.failure,
                cells,
            }
        })
        .collect();
    results.sort_by(|a, b| natural_cmp(&a.name, &b.name));

    PivotReport {
        name: label,
        roles,
        specs,
        results,
        tests: tests.len(),
        percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ResolvedHost, classify_resolved};
    use crate::model::HostRun;
    use crate::pivot::build;
    use crate::snippet::{NoSources, PayloadSources};

    fn record(path: &str, line: u32, status: ExampleStatus) -> ExampleRecord {
        ExampleRecord {
            description: String::new(),
            full_description: format!("{path}:{line}"),
            file_path: path.to_owned(),
            line_number: line,
            status,
        }
    }

    fn pivot(runs: &[HostRun], sources: &dyn SourceLookup) -> PivotReport {
        let hosts: Vec<ResolvedHost<'_>> = runs.iter().map(ResolvedHost::new).collect();
        let sets = classify_resolved(&hosts);
        annotate(build(&sets[0], &hosts), sources, &PivotOptions::default())
    }

    fn runs() -> Vec<HostRun> {
        vec![
            HostRun {
                hostname: "web10".to_owned(),
                examples: vec![
                    record("spec/web/nginx_spec.rb", 2, ExampleStatus::Failed),
                    record("spec/web/php_spec.rb", 1, ExampleStatus::Passed),
                ],
            },
            HostRun {
                hostname: "web9".to_owned(),
                examples: vec![
                    record("spec/web/nginx_spec.rb", 2, ExampleStatus::Passed),
                    record("spec/web/php_spec.rb", 1, ExampleStatus::Passed),
                ],
            },
        ]
    }

    #[test]
    fn specs_without_failures_are_hidden_but_counted() {
        let report = pivot(&runs(), &NoSources);
        assert_eq!(report.tests, 2);
        assert_eq!(report.specs.len(), 1);
        assert_eq!(report.specs[0].spec, "nginx");
        assert_eq!(report.specs[0].failures, 1);
        assert_eq!(report.roles["web"].specs.len(), 2);
        for host in &report.results {
            assert_eq!(host.cells.len(), 1);
            assert_eq!(host.cells[0].spec, "nginx");
        }
        assert_eq!(report.percent, Some(75));
    }

    #[test]
    fn hosts_are_naturally_sorted_with_colors() {
        let report = pivot(&runs(), &NoSources);
        let names: Vec<&str> = report.results.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["web9", "web10"]);
        assert_eq!(report.results[0].color, "#32cd32");
        assert_eq!((report.results[1].success, report.results[1].failure), (1, 1));
    }

    #[test]
    fn failing_cells_get_snippets_passing_cells_do_not() {
        let mut map = BTreeMap::new();
        map.insert(
            "spec/web/nginx_spec.rb".to_owned(),
            vec![
                "describe service('nginx') do".to_owned(),
                "  it { should be_running }".to_owned(),
                "end".to_owned(),
            ],
        );
        let report = pivot(&runs(), &PayloadSources(&map));
        let web10 = &report.results[1];
        let snippet = web10.cells[0].source.as_ref().expect("failing cell has a snippet");
        assert_eq!(snippet.start_line, 1);
        assert!(snippet.text.contains("should be_running"));
        assert!(report.results[0].cells[0].source.is_none());
    }

    #[test]
    fn missing_source_degrades_to_empty_snippet() {
        let report = pivot(&runs(), &NoSources);
        assert_eq!(report.results[1].cells[0].status, ExampleStatus::Failed);
        assert!(report.results[1].cells[0].source.is_none());
    }

    #[test]
    fn all_passing_role_set_has_no_visible_specs() {
        let runs = vec![HostRun {
            hostname: "db1".to_owned(),
            examples: vec![record("spec/db/mysql_spec.rb", 3, ExampleStatus::Passed)],
        }];
        let report = pivot(&runs, &NoSources);
        assert!(report.specs.is_empty());
        assert!(report.results[0].cells.is_empty());
        assert_eq!(report.results[0].success, 1);
        assert_eq!(report.percent, Some(100));
    }

    #[test]
    fn namespaces_keep_same_line_columns_apart() {
        let mut prod = record("spec/prod/db/mysql_spec.rb", 1, ExampleStatus::Failed);
        prod.full_description = "mysql running".to_owned();
        let mut stage = record("spec/stage/db/mysql_spec.rb", 1, ExampleStatus::Passed);
        stage.full_description = "mysql running".to_owned();
        let runs = vec![
            HostRun {
                hostname: "a".to_owned(),
                examples: vec![prod],
            },
            HostRun {
                hostname: "b".to_owned(),
                examples: vec![stage],
            },
        ];
        let report = pivot(&runs, &NoSources);
        assert_eq!(report.specs.len(), 1);
        assert_eq!(report.specs[0].namespaces, vec!["prod", "stage"]);
        assert_eq!(report.specs[0].tests, 2);

        let host_b = &report.results[1];
        let namespaces: Vec<Option<&str>> = host_b
            .cells
            .iter()
            .map(|cell| cell.namespace.as_deref())
            .collect();
        assert_eq!(namespaces, vec![Some("prod"), Some("stage")]);
        assert_eq!(host_b.cells[0].status, ExampleStatus::Missing);
        let json = serde_json::to_value(&host_b.cells[0]).expect("serialize cell");
        assert_eq!(json["namespace"], "prod");
    }

    #[test]
    fn missing_cells_serialize_as_bare_status() {
        let runs = vec![
            HostRun {
                hostname: "a".to_owned(),
                examples: vec![record("spec/web/x_spec.rb", 1, ExampleStatus::Failed)],
            },
            HostRun {
                hostname: "b".to_owned(),
                examples: vec![record("spec/web/x_spec.rb", 2, ExampleStatus::Passed)],
            },
        ];
        let report = pivot(&runs, &NoSources);
        let cell = &report.results[1].cells[0];
        assert_eq!(cell.status, ExampleStatus::Missing);
        let json = serde_json::to_value(cell).expect("serialize cell");
        assert_eq!(json["status"], "missing");
        assert!(json.get("example").is_none());
        assert!(json.get("source").is_none());
        assert!(json.get("namespace").is_none());
    }
}
