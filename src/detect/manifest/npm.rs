//! package.json manifest provider.

use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::ManifestProvider;

/// Dependency maps read from package.json.
const DEPENDENCY_KEYS: &[&str] = &[
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
];

/// Packages declared in a package.json.
pub struct NpmManifest {
    root: PathBuf,
    packages: BTreeSet<String>,
}

impl NpmManifest {
    /// Parse `package.json` in `dir`.
    pub fn from_dir(dir: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(dir.join("package.json"))?;
        let json: Value = serde_json::from_str(&content)?;

        let mut packages = BTreeSet::new();
        for key in DEPENDENCY_KEYS {
            if let Some(map) = json.get(key).and_then(Value::as_object) {
                packages.extend(map.keys().cloned());
            }
        }
        // A package may import itself by name.
        if let Some(name) = json.get("name").and_then(Value::as_str) {
            packages.insert(name.to_string());
        }

        Ok(Self {
            root: dir.to_path_buf(),
            packages,
        })
    }
}

impl ManifestProvider for NpmManifest {
    fn declares(&self, package: &str) -> bool {
        self.packages.contains(package)
    }

    fn declared_packages(&self) -> Vec<String> {
        self.packages.iter().cloned().collect()
    }

    fn root(&self) -> Option<&Path> {
        Some(&self.root)
    }
}
