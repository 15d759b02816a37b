//! Deterministic archetype classification of manifests.
//!
//! Classification is an ordered chain of pure predicates over the variable view
//! of a manifest. The first predicate that matches wins, so a manifest always
//! gets exactly one archetype.

use std::collections::BTreeMap;

use crate::core::manifest::{Manifest, VarValue};
use crate::core::types::{Affinity, Archetype, ArchetypeInfo};

/// Variables that identify the manifest installing taskconv itself.
pub const BOOTSTRAP_IDENTITY: [&str; 3] = ["TASKCONV_NAME", "TASKCONV_VERSION", "TASKCONV_REPO"];

/// Structural facts the predicates look at, separate from YAML parsing.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierInput<'a> {
    pub vars: &'a BTreeMap<String, VarValue>,
    pub has_includes: bool,
}

impl<'a> From<&'a Manifest> for ClassifierInput<'a> {
    fn from(manifest: &'a Manifest) -> Self {
        Self {
            vars: manifest.vars(),
            has_includes: manifest.has_includes(),
        }
    }
}

/// A predicate hit; `prefix` is set by the `P_BIN` family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub prefix: Option<String>,
}

type Predicate = fn(&ClassifierInput<'_>) -> Option<Match>;

/// Priority order. Earlier entries shadow later ones.
const CHAIN: [(Archetype, Predicate); 5] = [
    (Archetype::Bootstrap, bootstrap),
    (Archetype::Aggregation, aggregation),
    (Archetype::Builder, builder),
    (Archetype::Tool, tool),
    (Archetype::External, external),
];

/// Classify a manifest. Never fails; no evidence means `Unknown`.
pub fn classify(manifest: &Manifest) -> ArchetypeInfo {
    classify_input(&ClassifierInput::from(manifest))
}

pub fn classify_input(input: &ClassifierInput<'_>) -> ArchetypeInfo {
    for (archetype, predicate) in CHAIN {
        if let Some(hit) = predicate(input) {
            let affinity = (archetype == Archetype::Tool).then(|| affinity(input));
            return ArchetypeInfo {
                archetype,
                affinity,
                prefix: hit.prefix,
            };
        }
    }
    ArchetypeInfo::new(Archetype::Unknown)
}

pub fn bootstrap(input: &ClassifierInput<'_>) -> Option<Match> {
    BOOTSTRAP_IDENTITY
        .iter()
        .all(|name| input.vars.contains_key(*name))
        .then_some(Match { prefix: None })
}

pub fn aggregation(input: &ClassifierInput<'_>) -> Option<Match> {
    input.has_includes.then_some(Match { prefix: None })
}

/// Any variable shaped like `*_BUILD_*`.
pub fn builder(input: &ClassifierInput<'_>) -> Option<Match> {
    input
        .vars
        .keys()
        .any(|name| name.contains("_BUILD_"))
        .then_some(Match { prefix: None })
}

/// Some prefix `P` with `P_BIN`, `P_VERSION` and `P_REPO`.
pub fn tool(input: &ClassifierInput<'_>) -> Option<Match> {
    bin_prefixes(input)
        .find(|prefix| has_family(input, prefix, true))
        .map(|prefix| Match {
            prefix: Some(prefix.to_string()),
        })
}

/// Some prefix `P` with `P_BIN` and `P_VERSION` but no `P_REPO`.
pub fn external(input: &ClassifierInput<'_>) -> Option<Match> {
    bin_prefixes(input)
        .find(|prefix| has_family(input, prefix, false))
        .map(|prefix| Match {
            prefix: Some(prefix.to_string()),
        })
}

/// `Native` when any `*_CGO` variable is truthy; `Cross` otherwise.
pub fn affinity(input: &ClassifierInput<'_>) -> Affinity {
    let native = input
        .vars
        .iter()
        .any(|(name, value)| name.ends_with("_CGO") && value.is_truthy());
    if native {
        Affinity::Native
    } else {
        Affinity::Cross
    }
}

fn bin_prefixes<'a>(input: &ClassifierInput<'a>) -> impl Iterator<Item = &'a str> {
    input
        .vars
        .keys()
        .filter_map(|name| name.strip_suffix("_BIN"))
        .filter(|prefix| !prefix.is_empty())
}

fn has_family(input: &ClassifierInput<'_>, prefix: &str, with_repo: bool) -> bool {
    input.vars.contains_key(&format!("{prefix}_VERSION"))
        && input.vars.contains_key(&format!("{prefix}_REPO")) == with_repo
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::manifest_with;

    #[test]
    fn tool_with_cross_affinity() {
        let manifest = manifest_with(
            &[
                ("DUMMY_BIN", "dummy"),
                ("DUMMY_VERSION", "1.0.0"),
                ("DUMMY_REPO", "org/dummy"),
            ],
            &["check:deps", "release:build", "release:test"],
        );
        let info = classify(&manifest);
        assert_eq!(info.archetype, Archetype::Tool);
        assert_eq!(info.affinity, Some(Affinity::Cross));
        assert_eq!(info.prefix.as_deref(), Some("DUMMY"));
    }

    #[test]
    fn cgo_marker_forces_native() {
        let manifest = manifest_with(
            &[
                ("DUMMY_BIN", "dummy"),
                ("DUMMY_VERSION", "1.0.0"),
                ("DUMMY_REPO", "org/dummy"),
                ("DUMMY_CGO", "1"),
            ],
            &["check:deps", "release:build", "release:test"],
        );
        let info = classify(&manifest);
        assert_eq!(info.archetype, Archetype::Tool);
        assert_eq!(info.affinity, Some(Affinity::Native));
    }

    #[test]
    fn cgo_marker_set_to_zero_stays_cross() {
        let manifest = manifest_with(
            &[
                ("DUMMY_BIN", "dummy"),
                ("DUMMY_VERSION", "1.0.0"),
                ("DUMMY_REPO", "org/dummy"),
                ("DUMMY_CGO", "0"),
            ],
            &[],
        );
        assert_eq!(classify(&manifest).affinity, Some(Affinity::Cross));
    }

    #[test]
    fn bin_and_version_without_repo_is_external() {
        let manifest = manifest_with(&[("PC_BIN", "pc"), ("PC_VERSION", "2.0")], &[]);
        let info = classify(&manifest);
        assert_eq!(info.archetype, Archetype::External);
        assert_eq!(info.affinity, None);
        assert_eq!(info.prefix.as_deref(), Some("PC"));
    }

    #[test]
    fn includes_beat_build_variables() {
        let manifest = crate::core::manifest::Manifest::from_source(
            "Taskfile.yml",
            "includes:\n  golang: ./Taskfile.golang.yml\nvars:\n  GO_BUILD_FLAGS: -trimpath\n",
        );
        assert_eq!(classify(&manifest).archetype, Archetype::Aggregation);
    }

    #[test]
    fn build_variable_is_builder() {
        let manifest = manifest_with(&[("GO_BUILD_FLAGS", "-trimpath")], &["build"]);
        assert_eq!(classify(&manifest).archetype, Archetype::Builder);
    }

    #[test]
    fn bootstrap_identity_beats_tool() {
        let manifest = manifest_with(
            &[
                ("TASKCONV_NAME", "taskconv"),
                ("TASKCONV_VERSION", "0.1.0"),
                ("TASKCONV_REPO", "org/taskconv"),
                ("TASKCONV_BIN", "taskconv"),
            ],
            &[],
        );
        let info = classify(&manifest);
        assert_eq!(info.archetype, Archetype::Bootstrap);
        assert_eq!(info.affinity, None);
    }

    #[test]
    fn no_evidence_is_unknown() {
        let manifest = manifest_with(&[("GREETING", "hello")], &["default"]);
        assert_eq!(classify(&manifest).archetype, Archetype::Unknown);
    }

    #[test]
    fn classification_is_deterministic() {
        let manifest = manifest_with(
            &[
                ("B_BIN", "b"),
                ("B_VERSION", "1"),
                ("A_BIN", "a"),
                ("A_VERSION", "1"),
                ("A_REPO", "org/a"),
            ],
            &[],
        );
        let first = classify(&manifest);
        for _ in 0..5 {
            assert_eq!(classify(&manifest), first);
        }
        assert_eq!(first.prefix.as_deref(), Some("A"));
    }

    #[test]
    fn predicates_are_usable_on_their_own() {
        let mut vars = BTreeMap::new();
        vars.insert("X_BIN".to_string(), VarValue::Str("x".to_string()));
        vars.insert("X_VERSION".to_string(), VarValue::Str("1".to_string()));
        let input = ClassifierInput {
            vars: &vars,
            has_includes: false,
        };
        assert!(tool(&input).is_none());
        assert!(external(&input).is_some());
        assert!(builder(&input).is_none());
        assert!(bootstrap(&input).is_none());
    }
}
