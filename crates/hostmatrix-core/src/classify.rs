//! Role-set classification: hosts are grouped by the exact set of roles their
//! resolvable examples touch.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::identity::{TestIdentity, resolve};
use crate::model::{ExampleRecord, HostRun};

/// Label used for hosts whose examples resolve to no role at all.
pub const EMPTY_ROLE_SET_LABEL: &str = "(no roles)";

/// A host run paired with the identities of its resolvable examples, in
/// execution order.
#[derive(Debug, Clone)]
pub struct ResolvedHost<'a> {
    pub run: &'a HostRun,
    pub tests: Vec<(TestIdentity, &'a ExampleRecord)>,
}

impl<'a> ResolvedHost<'a> {
    /// Resolve every example of `run`, dropping those without an identity.
    #[must_use]
    pub fn new(run: &'a HostRun) -> Self {
        let tests = run
            .examples
            .iter()
            .filter_map(|example| resolve(example).into_identity().map(|id| (id, example)))
            .collect();
        Self { run, tests }
    }

    /// Roles touched by this host, deduplicated in first-seen order.
    #[must_use]
    pub fn roles(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut roles = Vec::new();
        for (identity, _) in &self.tests {
            if seen.insert(identity.role.as_str()) {
                roles.push(identity.role.clone());
            }
        }
        roles
    }
}

/// A distinct combination of roles and the hosts that exhibit it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSet {
    /// Roles in first-seen order of the first host classified into this set.
    pub roles: Vec<String>,
    pub label: String,
    /// Indices into the classified host slice, in input order.
    pub hosts: Vec<usize>,
}

impl RoleSet {
    fn new(roles: Vec<String>) -> Self {
        let label = if roles.is_empty() {
            EMPTY_ROLE_SET_LABEL.to_owned()
        } else {
            roles.join(", ")
        };
        Self {
            roles,
            label,
            hosts: Vec::new(),
        }
    }

    #[must_use]
    pub fn contains(&self, role: &str) -> bool {
        self.roles.iter().any(|candidate| candidate == role)
    }

    fn key(&self) -> BTreeSet<&str> {
        self.roles.iter().map(String::as_str).collect()
    }
}

/// Classify already-resolved hosts into role-sets, most roles first.
#[must_use]
pub fn classify_resolved(hosts: &[ResolvedHost<'_>]) -> Vec<RoleSet> {
    let mut role_sets: Vec<RoleSet> = Vec::new();

    for (index, host) in hosts.iter().enumerate() {
        let roles = host.roles();
        let key: BTreeSet<&str> = roles.iter().map(String::as_str).collect();
        let position = role_sets.iter().position(|set| set.key() == key);
        let set = match position {
            Some(position) => &mut role_sets[position],
            None => {
                role_sets.push(RoleSet::new(roles.clone()));
                let last = role_sets.len() - 1;
                &mut role_sets[last]
            }
        };
        set.hosts.push(index);
        tracing::trace!(
            host = %host.run.hostname,
            role_set = %set.label,
            "host classified"
        );
    }

    role_sets.sort_by_key(|set| Reverse(set.roles.len()));
    role_sets
}

/// Classify raw host runs into role-sets, most roles first.
#[must_use]
pub fn classify(hosts: &[HostRun]) -> Vec<RoleSet> {
    let resolved: Vec<ResolvedHost<'_>> = hosts.iter().map(ResolvedHost::new).collect();
    classify_resolved(&resolved)
}
