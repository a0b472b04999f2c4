//! Test identity resolution from example file paths.
//!
//! Two directory conventions are recognised, anchored on a `spec` directory:
//! - two-segment: `.../spec/<role>/<spec>_spec.<ext>`
//! - three-segment: `.../spec/<namespace>/<role>/<spec>_spec.<ext>`
//!
//! The shapes cannot be told apart by content, so the resolver dispatches on
//! depth: a `spec` directory immediately above the role directory wins over one
//! a level higher. Producers that use namespaces must not also nest a `spec`
//! directory directly under the namespace.

use serde::{Deserialize, Serialize};

use crate::model::ExampleRecord;

const SPEC_DIR: &str = "spec";
const SPEC_SUFFIX: &str = "_spec";

/// Which directory convention a path matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathConvention {
    TwoSegment,
    ThreeSegment,
}

/// Canonical key identifying one logical test across hosts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestIdentity {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub namespace: Option<String>,
    pub role: String,
    pub spec: String,
    pub line_number: u32,
    pub full_description: String,
}

impl TestIdentity {
    /// Column ordering key. The namespace and description only break equality,
    /// never order; ties keep encounter order under a stable sort.
    #[must_use]
    pub fn sort_key(&self) -> (&str, &str, u32) {
        (&self.role, &self.spec, self.line_number)
    }

    /// The directory shape this identity was resolved from.
    #[must_use]
    pub const fn convention(&self) -> PathConvention {
        if self.namespace.is_some() {
            PathConvention::ThreeSegment
        } else {
            PathConvention::TwoSegment
        }
    }
}

/// Outcome of resolving an example's file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Test(TestIdentity),
    /// The file is not a `*_spec.*` file at all.
    NotATest,
    /// A spec file whose location does not fit either convention.
    Unparseable { reason: String },
}

impl Resolution {
    /// The identity, discarding why a record did not resolve.
    #[must_use]
    pub fn into_identity(self) -> Option<TestIdentity> {
        match self {
            Self::Test(identity) => Some(identity),
            Self::NotATest | Self::Unparseable { .. } => None,
        }
    }
}

/// Resolve an example to its test identity.
#[must_use]
pub fn resolve(example: &ExampleRecord) -> Resolution {
    let components: Vec<&str> = example.file_path.split(['/', '\\']).collect();
    let Some((file_name, dirs)) = components.split_last() else {
        return Resolution::NotATest;
    };
    let Some(spec) = spec_name(file_name) else {
        return Resolution::NotATest;
    };
    if spec.is_empty() {
        return unparseable(format!("empty spec name in {}", example.file_path));
    }

    let depth = dirs.len();
    let (namespace, role) = if depth >= 2 && dirs[depth - 2] == SPEC_DIR {
        (None, dirs[depth - 1])
    } else if depth >= 3 && dirs[depth - 3] == SPEC_DIR {
        (Some(dirs[depth - 2]), dirs[depth - 1])
    } else {
        return unparseable(format!(
            "no `spec/<role>/` or `spec/<namespace>/<role>/` directory in {}",
            example.file_path
        ));
    };

    if role.is_empty() || namespace.is_some_and(str::is_empty) {
        return unparseable(format!("empty directory segment in {}", example.file_path));
    }

    Resolution::Test(TestIdentity {
        namespace: namespace.map(str::to_owned),
        role: role.to_owned(),
        spec: spec.to_owned(),
        line_number: example.line_number,
        full_description: example.full_description.clone(),
    })
}

fn spec_name(file_name: &str) -> Option<&str> {
    let (stem, extension) = file_name.rsplit_once('.')?;
    if extension.is_empty() {
        return None;
    }
    stem.strip_suffix(SPEC_SUFFIX)
}

fn unparseable(reason: String) -> Resolution {
    tracing::debug!(reason = %reason, "example path does not resolve to a test identity");
    Resolution::Unparseable { reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExampleStatus;

    fn example(path: &str, line: u32) -> ExampleRecord {
        ExampleRecord {
            description: "is installed".to_owned(),
            full_description: "Package apache2 is installed".to_owned(),
            file_path: path.to_owned(),
            line_number: line,
            status: ExampleStatus::Passed,
        }
    }

    #[test]
    fn two_segment_path_resolves() {
        let identity = resolve(&example("./spec/web/apache2_spec.rb", 4))
            .into_identity()
            .expect("two-segment path should resolve");
        assert_eq!(identity.role, "web");
        assert_eq!(identity.spec, "apache2");
        assert_eq!(identity.line_number, 4);
        assert_eq!(identity.namespace, None);
        assert_eq!(identity.convention(), PathConvention::TwoSegment);
    }

    #[test]
    fn three_segment_path_folds_namespace() {
        let identity = resolve(&example("/srv/suite/spec/prod/db/mysql_spec.rb", 12))
            .into_identity()
            .expect("three-segment path should resolve");
        assert_eq!(identity.namespace.as_deref(), Some("prod"));
        assert_eq!(identity.role, "db");
        assert_eq!(identity.spec, "mysql");
        assert_eq!(identity.convention(), PathConvention::ThreeSegment);
    }

    #[test]
    fn namespace_participates_in_equality() {
        let a = resolve(&example("spec/prod/db/mysql_spec.rb", 1)).into_identity();
        let b = resolve(&example("spec/stage/db/mysql_spec.rb", 1)).into_identity();
        assert!(a.is_some() && b.is_some());
        assert_ne!(a, b);
        assert_eq!(
            a.as_ref().map(TestIdentity::sort_key),
            b.as_ref().map(TestIdentity::sort_key)
        );
    }

    #[test]
    fn nearest_spec_directory_wins() {
        let identity = resolve(&example("spec/spec/web/nginx_spec.rb", 2))
            .into_identity()
            .expect("should resolve");
        assert_eq!(identity.role, "web");
        assert_eq!(identity.namespace, None);
    }

    #[test]
    fn windows_separators_resolve() {
        let identity = resolve(&example(r".\spec\web\apache2_spec.rb", 4)).into_identity();
        assert_eq!(identity.map(|id| id.role), Some("web".to_owned()));
    }

    #[test]
    fn non_spec_file_is_not_a_test() {
        assert_eq!(
            resolve(&example("./spec/spec_helper.rb", 1)),
            Resolution::NotATest
        );
        assert_eq!(resolve(&example("Rakefile", 1)), Resolution::NotATest);
        assert_eq!(
            resolve(&example("./spec/web/apache2_spec", 1)),
            Resolution::NotATest
        );
    }

    #[test]
    fn misplaced_spec_file_is_unparseable() {
        assert!(matches!(
            resolve(&example("./apache2_spec.rb", 1)),
            Resolution::Unparseable { .. }
        ));
        assert!(matches!(
            resolve(&example("./spec/a/b/c/apache2_spec.rb", 1)),
            Resolution::Unparseable { .. }
        ));
        assert!(matches!(
            resolve(&example("./spec//apache2_spec.rb", 1)),
            Resolution::Unparseable { .. }
        ));
        assert!(matches!(
            resolve(&example("./spec/web/_spec.rb", 1)),
            Resolution::Unparseable { .. }
        ));
    }

    #[test]
    fn description_distinguishes_identities_on_same_line() {
        let mut first = example("./spec/web/apache2_spec.rb", 4);
        let mut second = first.clone();
        first.full_description = "Package apache2 is installed".to_owned();
        second.full_description = "Package apache2 has version".to_owned();
        assert_ne!(
            resolve(&first).into_identity(),
            resolve(&second).into_identity()
        );
    }
}
