//! Pivot construction for one role-set.
//!
//! The canonical test list is the contract that keeps columns aligned: every
//! host row is emitted by walking the same list in the same order, so column
//! `i` names the same test for every host. Counts are accumulated during that
//! walk, never in a separate pass.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::classify::{ResolvedHost, RoleSet};
use crate::identity::TestIdentity;
use crate::model::{ExampleRecord, ExampleStatus};

/// Test counts for one role, with per-spec counts nested inside.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSummary {
    pub tests: usize,
    pub specs: BTreeMap<String, usize>,
}

/// A contiguous run of canonical tests sharing `(role, spec)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecGroup {
    pub role: String,
    pub spec: String,
    /// Positions in the canonical test list.
    pub columns: Range<usize>,
}

/// One host's outcome for one canonical test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub status: ExampleStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub example: Option<ExampleRecord>,
}

impl Cell {
    /// Placeholder for a canonical test the host never ran.
    #[must_use]
    pub const fn missing() -> Self {
        Self {
            status: ExampleStatus::Missing,
            example: None,
        }
    }

    fn observed(example: &ExampleRecord) -> Self {
        Self {
            status: example.status,
            example: Some(example.clone()),
        }
    }
}

/// One host's cells, in canonical column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRow {
    pub hostname: String,
    pub success: usize,
    pub failure: usize,
    pub cells: Vec<Cell>,
}

/// Unfiltered pivot for one role-set, before presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPivot {
    pub label: String,
    pub tests: Vec<TestIdentity>,
    pub groups: Vec<SpecGroup>,
    pub roles: BTreeMap<String, RoleSummary>,
    /// Hosts in role-set input order.
    pub hosts: Vec<HostRow>,
}

impl RawPivot {
    #[must_use]
    pub fn total_success(&self) -> usize {
        self.hosts.iter().map(|host| host.success).sum()
    }

    #[must_use]
    pub fn total_failure(&self) -> usize {
        self.hosts.iter().map(|host| host.failure).sum()
    }

    /// Integer success rate, floored; `None` when nothing passed or failed.
    #[must_use]
    pub fn percent(&self) -> Option<u8> {
        success_percent(self.total_success(), self.total_failure())
    }

    /// Failed cells per spec group, aligned with `groups`.
    #[must_use]
    pub fn group_failures(&self) -> Vec<usize> {
        self.groups
            .iter()
            .map(|group| {
                self.hosts
                    .iter()
                    .flat_map(|host| &host.cells[group.columns.clone()])
                    .filter(|cell| cell.status == ExampleStatus::Failed)
                    .count()
            })
            .collect()
    }
}

/// `floor(100 * success / (success + failure))`, or `None` for an empty denominator.
#[must_use]
pub fn success_percent(success: usize, failure: usize) -> Option<u8> {
    let total = success as u128 + failure as u128;
    if total == 0 {
        return None;
    }
    u8::try_from(success as u128 * 100 / total).ok()
}

/// Deduplicated tests of the role-set's hosts, sorted by `(role, spec, line)`.
#[must_use]
pub fn canonical_tests(role_set: &RoleSet, hosts: &[ResolvedHost<'_>]) -> Vec<TestIdentity> {
    let mut seen: HashSet<&TestIdentity> = HashSet::new();
    let mut tests: Vec<TestIdentity> = Vec::new();
    for &index in &role_set.hosts {
        for (identity, _) in &hosts[index].tests {
            if role_set.contains(&identity.role) && seen.insert(identity) {
                tests.push(identity.clone());
            }
        }
    }
    tests.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    tests
}

/// Split a sorted canonical list into `(role, spec)` runs.
#[must_use]
pub fn spec_groups(tests: &[TestIdentity]) -> Vec<SpecGroup> {
    let mut groups: Vec<SpecGroup> = Vec::new();
    for (column, test) in tests.iter().enumerate() {
        if let Some(group) = groups.last_mut() {
            if group.role == test.role && group.spec == test.spec {
                group.columns.end = column + 1;
                continue;
            }
        }
        groups.push(SpecGroup {
            role: test.role.clone(),
            spec: test.spec.clone(),
            columns: column..column + 1,
        });
    }
    groups
}

fn summarize_roles(groups: &[SpecGroup]) -> BTreeMap<String, RoleSummary> {
    let mut roles: BTreeMap<String, RoleSummary> = BTreeMap::new();
    for group in groups {
        let count = group.columns.len();
        let summary = roles.entry(group.role.clone()).or_default();
        summary.tests += count;
        *summary.specs.entry(group.spec.clone()).or_default() += count;
    }
    roles
}

fn host_row(host: &ResolvedHost<'_>, tests: &[TestIdentity], groups: &[SpecGroup]) -> HostRow {
    let mut by_identity: HashMap<&TestIdentity, &ExampleRecord> = HashMap::new();
    for (identity, example) in &host.tests {
        by_identity.entry(identity).or_insert(*example);
    }

    let mut row = HostRow {
        hostname: host.run.hostname.clone(),
        success: 0,
        failure: 0,
        cells: Vec::with_capacity(tests.len()),
    };
    for group in groups {
        for test in &tests[group.columns.clone()] {
            let cell = by_identity
                .get(test)
                .map_or_else(Cell::missing, |example| Cell::observed(example));
            match cell.status {
                ExampleStatus::Passed => row.success += 1,
                ExampleStatus::Failed => row.failure += 1,
                _ => {}
            }
            row.cells.push(cell);
        }
    }
    row
}

/// Build the unfiltered pivot for the hosts assigned to `role_set`.
#[must_use]
pub fn build(role_set: &RoleSet, hosts: &[ResolvedHost<'_>]) -> RawPivot {
    let tests = canonical_tests(role_set, hosts);
    let groups = spec_groups(&tests);
    let roles = summarize_roles(&groups);
    let rows = role_set
        .hosts
        .iter()
        .map(|&index| host_row(&hosts[index], &tests, &groups))
        .collect();

    let pivot = RawPivot {
        label: role_set.label.clone(),
        tests,
        groups,
        roles,
        hosts: rows,
    };
    tracing::debug!(
        role_set = %pivot.label,
        hosts = pivot.hosts.len(),
        tests = pivot.tests.len(),
        success = pivot.total_success(),
        failure = pivot.total_failure(),
        "pivot built"
    );
    pivot
}
