//! composer.json manifest provider.

use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::ManifestProvider;

/// Packages declared in a composer.json, by full `vendor/name`.
pub struct ComposerManifest {
    root: PathBuf,
    packages: BTreeSet<String>,
    autoload_roots: Vec<String>,
}

impl ComposerManifest {
    /// Parse `composer.json` in `dir`.
    pub fn from_dir(dir: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(dir.join("composer.json"))?;
        let json: Value = serde_json::from_str(&content)?;

        let mut packages = BTreeSet::new();
        for key in ["require", "require-dev"] {
            if let Some(map) = json.get(key).and_then(Value::as_object) {
                packages.extend(
                    map.keys()
                        // Platform requirements, not packages.
                        .filter(|k| k.contains('/'))
                        .map(|k| k.to_lowercase()),
                );
            }
        }

        let mut autoload_roots = Vec::new();
        for key in ["autoload", "autoload-dev"] {
            if let Some(map) = json
                .get(key)
                .and_then(|a| a.get("psr-4"))
                .and_then(Value::as_object)
            {
                for prefix in map.keys() {
                    if let Some(root) = prefix.split('\\').find(|s| !s.is_empty()) {
                        autoload_roots.push(root.to_string());
                    }
                }
            }
        }

        Ok(Self {
            root: dir.to_path_buf(),
            packages,
            autoload_roots,
        })
    }
}

impl ManifestProvider for ComposerManifest {
    /// `package` is a vendor segment (`monolog`) or a full name (`monolog/monolog`).
    fn declares(&self, package: &str) -> bool {
        let package = package.to_lowercase();
        if package.contains('/') {
            return self.packages.contains(&package);
        }
        self.packages
            .iter()
            .any(|p| p.split('/').next() == Some(package.as_str()))
    }

    fn declared_packages(&self) -> Vec<String> {
        self.packages.iter().cloned().collect()
    }

    fn root(&self) -> Option<&Path> {
        Some(&self.root)
    }

    fn internal_roots(&self) -> Vec<String> {
        self.autoload_roots.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_require_maps_and_autoload() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("composer.json"),
            r#"{
  "require": {"php": ">=8.1", "ext-json": "*", "monolog/monolog": "^3.0"},
  "require-dev": {"phpunit/phpunit": "^10"},
  "autoload": {"psr-4": {"Acme\\Billing\\": "src/"}},
  "autoload-dev": {"psr-4": {"Acme\\Tests\\": "tests/"}}
}"#,
        )
        .unwrap();

        let manifest = ComposerManifest::from_dir(temp.path()).unwrap();
        assert!(manifest.declares("monolog"));
        assert!(manifest.declares("monolog/monolog"));
        assert!(manifest.declares("phpunit"));
        assert!(!manifest.declares("php"));
        assert!(!manifest.declares("guzzlehttp"));
        assert_eq!(manifest.declared_packages(), vec!["monolog/monolog", "phpunit/phpunit"]);
        assert_eq!(manifest.internal_roots(), vec!["Acme", "Acme"]);
    }
}
