//! Test-info document: where a manifest lives and what it is.

use std::path::Path;

use serde::Serialize;

use crate::core::classifier::classify;
use crate::core::manifest::Manifest;
use crate::core::types::Archetype;

/// `{path, namespace, archetype, affinity}`; affinity is empty unless Tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestInfo {
    pub path: String,
    pub namespace: String,
    pub archetype: Archetype,
    pub affinity: String,
}

impl TestInfo {
    /// Describe `manifest`, reporting its path relative to `root` when possible.
    pub fn new(root: &Path, manifest: &Manifest, namespace: &str) -> Self {
        let info = classify(manifest);
        let path = manifest
            .path()
            .strip_prefix(root)
            .unwrap_or(manifest.path());
        Self {
            path: path.display().to_string(),
            namespace: namespace.to_string(),
            archetype: info.archetype,
            affinity: info
                .affinity
                .map(|affinity| affinity.to_string())
                .unwrap_or_default(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::manifest_with;

    #[test]
    fn tool_info_includes_affinity() {
        let manifest = Manifest::from_source(
            "/repo/taskfiles/tools/Taskfile.jq.yml",
            "vars:\n  JQ_BIN: jq\n  JQ_VERSION: '1'\n  JQ_REPO: jqlang/jq\n  JQ_CGO: 'true'\n",
        );
        let info = TestInfo::new(Path::new("/repo"), &manifest, "jq");
        assert_eq!(
            info,
            TestInfo {
                path: "taskfiles/tools/Taskfile.jq.yml".to_string(),
                namespace: "jq".to_string(),
                archetype: Archetype::Tool,
                affinity: "native".to_string(),
            }
        );
        let json: serde_json::Value =
            serde_json::from_str(&info.to_json().expect("json")).expect("parse");
        assert_eq!(json["archetype"], "tool");
        assert_eq!(json["affinity"], "native");
    }

    #[test]
    fn non_tool_affinity_is_empty() {
        let manifest = manifest_with(&[("GO_BUILD_FLAGS", "-trimpath")], &["build"]);
        let info = TestInfo::new(Path::new("/elsewhere"), &manifest, "golang");
        assert_eq!(info.archetype, Archetype::Builder);
        assert_eq!(info.affinity, "");
    }
}
