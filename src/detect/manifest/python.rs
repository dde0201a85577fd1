//! Python manifest provider.
//!
//! Reads requirement declarations from:
//! - requirements.txt and requirements*.txt
//! - pyproject.toml (`dependencies = [...]` arrays and poetry dependency tables)

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::utils::{extract_package_name, names_match, normalize_package_name};
use super::ManifestProvider;

/// Packages declared by a Python project.
pub struct PythonManifest {
    root: PathBuf,
    /// Normalized distribution names.
    packages: BTreeSet<String>,
}

impl PythonManifest {
    /// Scan the requirement sources in `root`.
    pub fn from_root(root: &Path) -> anyhow::Result<Self> {
        let mut manifest = Self {
            root: root.to_path_buf(),
            packages: BTreeSet::new(),
        };
        manifest.parse_requirements_txt()?;
        manifest.parse_pyproject_toml()?;
        Ok(manifest)
    }

    fn insert(&mut self, name: &str) {
        if !name.is_empty() && !name.starts_with('#') && !name.starts_with('[') {
            self.packages.insert(normalize_package_name(name));
        }
    }

    /// Parse requirements*.txt files at root.
    fn parse_requirements_txt(&mut self) -> anyhow::Result<()> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.root)?
            .flatten()
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| n.starts_with("requirements") && n.ends_with(".txt"))
            })
            .collect();
        files.sort();

        for path in files {
            let Ok(content) = fs::read_to_string(&path) else {
                tracing::debug!("skipping unreadable {}", path.display());
                continue;
            };
            for line in content.lines() {
                let line = line.trim();
                // Comments, blank lines, and options like -r, -e, --index-url
                if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
                    continue;
                }
                self.insert(&extract_package_name(line));
            }
        }
        Ok(())
    }

    /// Parse pyproject.toml dependency declarations.
    fn parse_pyproject_toml(&mut self) -> anyhow::Result<()> {
        let path = self.root.join("pyproject.toml");
        if !path.exists() {
            return Ok(());
        }
        let content = fs::read_to_string(&path)?;

        let mut in_array = false;
        let mut in_table = false;

        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if in_array {
                for item in quoted_items(trimmed) {
                    self.insert(&extract_package_name(&item));
                }
                if trimmed.contains(']') {
                    in_array = false;
                }
                continue;
            }

            if trimmed.starts_with('[') {
                // [tool.poetry.dependencies], [tool.poetry.group.dev.dependencies]
                in_table = trimmed.starts_with("[tool.poetry") && trimmed.ends_with("dependencies]");
                continue;
            }

            if let Some(rest) = array_value(trimmed) {
                for item in quoted_items(rest) {
                    self.insert(&extract_package_name(&item));
                }
                in_array = !rest.contains(']');
                continue;
            }

            if in_table {
                // requests = "^2.0" or requests = { version = "^2.0" }
                if let Some((name, _)) = trimmed.split_once('=') {
                    let name = name.trim().trim_matches('"');
                    if name != "python" {
                        self.insert(name);
                    }
                }
            }
        }

        Ok(())
    }
}

/// Value part of `dependencies = [` / `dev = [` style array assignments.
fn array_value(line: &str) -> Option<&str> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();
    let is_dependency_key = key == "dependencies" || key == "requires" || key.ends_with("-dependencies");
    (is_dependency_key && value.starts_with('[')).then_some(value)
}

/// Every quoted string on a line.
fn quoted_items(line: &str) -> Vec<String> {
    line.split(['"', '\''])
        .skip(1)
        .step_by(2)
        .map(str::to_string)
        .collect()
}

impl ManifestProvider for PythonManifest {
    fn declares(&self, package: &str) -> bool {
        let wanted = normalize_package_name(package);
        self.packages.contains(&wanted) || self.packages.iter().any(|p| names_match(&wanted, p))
    }

    fn declared_packages(&self) -> Vec<String> {
        self.packages.iter().cloned().collect()
    }

    fn root(&self) -> Option<&Path> {
        Some(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_requirements_txt() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("requirements.txt"),
            r#"
# Comment
requests>=2.0
flask==2.0.1
numpy~=1.20
pandas[sql]>=1.3.0
Django!=4.0
-r other-requirements.txt
--index-url https://pypi.org/simple
"#,
        )
        .unwrap();

        let manifest = PythonManifest::from_root(temp.path()).unwrap();
        assert_eq!(
            manifest.declared_packages(),
            vec!["django", "flask", "numpy", "pandas", "requests"]
        );
    }

    #[test]
    fn test_parse_pyproject_toml() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("pyproject.toml"),
            r#"
[project]
name = "myproject"
dependencies = [
    "requests>=2.0",
    "PyYAML",
]

[project.optional-dependencies]
dev = ["pytest"]

[tool.poetry.dependencies]
python = "^3.11"
httpx = { version = "^0.27" }
"#,
        )
        .unwrap();

        let manifest = PythonManifest::from_root(temp.path()).unwrap();
        assert!(manifest.declares("requests"));
        assert!(manifest.declares("pyyaml"));
        assert!(manifest.declares("httpx"));
        assert!(!manifest.declares("python"));
        assert!(!manifest.declares("pytest"));
    }

    #[test]
    fn test_inline_dependency_array() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("pyproject.toml"),
            "[project]\ndependencies = [\"click>=8\", 'rich']\n",
        )
        .unwrap();
        let manifest = PythonManifest::from_root(temp.path()).unwrap();
        assert_eq!(manifest.declared_packages(), vec!["click", "rich"]);
    }

    #[test]
    fn test_declares_prefixed_distribution() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("requirements.txt"), "python-dateutil==2.8\n").unwrap();
        let manifest = PythonManifest::from_root(temp.path()).unwrap();
        assert!(manifest.declares("python-dateutil"));
        assert!(manifest.declares("dateutil"));
    }
}
