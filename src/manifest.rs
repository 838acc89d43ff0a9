//! Read-only view of a JavaScript `package.json`: script aliases and
//! declared dependencies are the only parts the pipeline looks at.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;

pub const PACKAGE_JSON: &str = "package.json";

#[derive(Debug, Default, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    scripts: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    dependencies: Option<BTreeMap<String, Value>>,
    #[serde(default, rename = "devDependencies")]
    dev_dependencies: Option<BTreeMap<String, Value>>,
}

impl PackageManifest {
    /// Load `package.json` from `dir`. Returns `Ok(None)` when there is none.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(PACKAGE_JSON);
        if !path.is_file() {
            return Ok(None);
        }
        let content = std::fs::read(&path)?;
        Ok(Some(Self::parse(&content)?))
    }

    pub fn parse(content: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(content)?)
    }

    /// The command string declared for a script alias, if any.
    pub fn script(&self, alias: &str) -> Option<&str> {
        self.scripts.as_ref()?.get(alias)?.as_str()
    }

    pub fn has_script(&self, alias: &str) -> bool {
        self.script(alias).is_some()
    }

    /// Whether any runtime or dev dependency is a `link:` specifier. The npm
    /// installer cannot resolve these; yarn can.
    pub fn has_link_dependencies(&self) -> bool {
        self.dependencies
            .iter()
            .chain(self.dev_dependencies.iter())
            .flat_map(|deps| deps.values())
            .any(|spec| spec.as_str().is_some_and(|s| s.contains("link:")))
    }
}

/// Convenience wrapper that treats a missing or unreadable manifest as "no".
pub fn has_link_dependencies(dir: &Path) -> bool {
    matches!(PackageManifest::load(dir), Ok(Some(m)) if m.has_link_dependencies())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripts_lookup() {
        let m = PackageManifest::parse(
            br#"{"scripts": {"test": "jest", "build": "tsc", "weird": 3}}"#,
        )
        .unwrap();
        assert_eq!(m.script("test"), Some("jest"));
        assert!(m.has_script("build"));
        assert!(!m.has_script("coverage"));
        // Non-string script values are ignored.
        assert!(!m.has_script("weird"));
    }

    #[test]
    fn test_link_dependencies_in_either_table() {
        let runtime = PackageManifest::parse(
            br#"{"dependencies": {"shared": "link:../shared", "react": "^18.0.0"}}"#,
        )
        .unwrap();
        assert!(runtime.has_link_dependencies());

        let dev = PackageManifest::parse(
            br#"{"dependencies": null, "devDependencies": {"tools": "link:./tools"}}"#,
        )
        .unwrap();
        assert!(dev.has_link_dependencies());

        let plain = PackageManifest::parse(br#"{"dependencies": {"react": "^18.0.0"}}"#).unwrap();
        assert!(!plain.has_link_dependencies());
    }

    #[test]
    fn test_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PackageManifest::load(dir.path()).unwrap().is_none());
        assert!(!has_link_dependencies(dir.path()));
    }

    #[test]
    fn test_malformed_manifest_has_no_link_dependencies() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PACKAGE_JSON), "{not json").unwrap();
        assert!(PackageManifest::load(dir.path()).is_err());
        assert!(!has_link_dependencies(dir.path()));
    }
}
