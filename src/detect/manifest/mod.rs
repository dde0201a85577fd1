//! Trait-based manifest lookup.
//!
//! Each ecosystem has a provider that reads its dependency manifest. The
//! manifest is discovered by walking upward from the analysed file.
//!
//! ```text
//! ManifestProvider trait
//!     ├── NpmManifest       (package.json)
//!     ├── PythonManifest    (requirements*.txt, pyproject.toml)
//!     ├── ComposerManifest  (composer.json)
//!     └── NoManifest        (nothing found, everything unknown)
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::Ecosystem;

mod composer;
mod none;
mod npm;
mod python;

pub use composer::ComposerManifest;
pub use none::NoManifest;
pub use npm::NpmManifest;
pub use python::PythonManifest;

/// Maximum number of parent directories inspected during discovery.
pub const MAX_ASCENT: usize = 32;

/// Dependency declarations of one project.
pub trait ManifestProvider: Send + Sync {
    /// Whether the manifest declares the (normalized) package.
    fn declares(&self, package: &str) -> bool;

    /// All declared package names.
    fn declared_packages(&self) -> Vec<String>;

    /// Directory holding the manifest, if one was found.
    fn root(&self) -> Option<&Path>;

    /// Namespace roots owned by the project itself (PHP autoload prefixes).
    fn internal_roots(&self) -> Vec<String> {
        Vec::new()
    }

    /// Statistics about the manifest for debugging.
    fn stats(&self) -> ManifestStats {
        ManifestStats {
            package_count: self.declared_packages().len(),
        }
    }
}

/// Statistics about a loaded manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestStats {
    pub package_count: usize,
}

/// Whether `dir` holds a manifest for the ecosystem.
fn has_manifest(dir: &Path, ecosystem: Ecosystem) -> bool {
    match ecosystem {
        Ecosystem::Npm => dir.join("package.json").is_file(),
        Ecosystem::Composer => dir.join("composer.json").is_file(),
        Ecosystem::Pip => {
            dir.join("pyproject.toml").is_file()
                || fs::read_dir(dir)
                    .map(|entries| {
                        entries.flatten().any(|e| {
                            let name = e.file_name().to_string_lossy().to_string();
                            name.starts_with("requirements") && name.ends_with(".txt")
                        })
                    })
                    .unwrap_or(false)
        }
    }
}

/// Nearest directory at or above `start` that holds a manifest.
pub fn find_manifest_dir(start: &Path, ecosystem: Ecosystem) -> Option<PathBuf> {
    start
        .ancestors()
        .take(MAX_ASCENT)
        .find(|dir| has_manifest(dir, ecosystem))
        .map(Path::to_path_buf)
}

/// Load the nearest manifest, or `NoManifest` when none is found or it cannot be read.
pub fn discover(start: &Path, ecosystem: Ecosystem) -> Box<dyn ManifestProvider> {
    let Some(dir) = find_manifest_dir(start, ecosystem) else {
        tracing::debug!("no {} manifest above {}", ecosystem, start.display());
        return Box::new(NoManifest::new());
    };

    let loaded: anyhow::Result<Box<dyn ManifestProvider>> = match ecosystem {
        Ecosystem::Npm => NpmManifest::from_dir(&dir).map(|m| Box::new(m) as Box<dyn ManifestProvider>),
        Ecosystem::Pip => PythonManifest::from_root(&dir).map(|m| Box::new(m) as Box<dyn ManifestProvider>),
        Ecosystem::Composer => {
            ComposerManifest::from_dir(&dir).map(|m| Box::new(m) as Box<dyn ManifestProvider>)
        }
    };

    match loaded {
        Ok(manifest) => {
            tracing::debug!(
                "loaded {} manifest in {} ({} packages)",
                ecosystem,
                dir.display(),
                manifest.stats().package_count
            );
            manifest
        }
        Err(e) => {
            tracing::debug!("ignoring unreadable manifest in {}: {}", dir.display(), e);
            Box::new(NoManifest::new())
        }
    }
}

/// Common utility functions for manifest parsing.
pub mod utils {
    /// Extract a package name from a requirement string.
    ///
    /// - `requests>=2.0` → `requests`
    /// - `package[extra]>=1.0` → `package`
    /// - `flask!=2.0` → `flask`
    pub fn extract_package_name(req: &str) -> String {
        req.split(|c| matches!(c, '=' | '>' | '<' | '~' | '!' | '[' | ';' | ' ' | '@'))
            .next()
            .unwrap_or("")
            .trim()
            .to_string()
    }

    /// Lowercase with `_` and `.` folded into `-`.
    pub fn normalize_package_name(name: &str) -> String {
        name.trim().to_lowercase().replace(['_', '.'], "-")
    }

    /// Whether an import-derived name matches a declared distribution name.
    ///
    /// Besides separator differences this accepts the `py`/`python-` prefixes
    /// and namespace packages (`jaraco.abode` declares `jaraco`).
    pub fn names_match(wanted: &str, declared: &str) -> bool {
        let wanted = normalize_package_name(wanted);
        let declared = normalize_package_name(declared);
        if wanted == declared {
            return true;
        }
        for prefix in ["py", "python-"] {
            if declared.strip_prefix(prefix) == Some(wanted.as_str()) {
                return true;
            }
        }
        declared.starts_with(&format!("{wanted}-")) && !wanted.is_empty()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discovery_walks_upward() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("package.json"), r#"{"dependencies": {"react": "^18"}}"#).unwrap();
        let nested = temp.path().join("src").join("components");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_manifest_dir(&nested, Ecosystem::Npm), Some(temp.path().to_path_buf()));
        let manifest = discover(&nested, Ecosystem::Npm);
        assert!(manifest.declares("react"));
        assert_eq!(manifest.root(), Some(temp.path()));
    }

    #[test]
    fn test_requirements_variant_is_a_manifest() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("requirements-dev.txt"), "pytest\n").unwrap();
        assert!(has_manifest(temp.path(), Ecosystem::Pip));
        assert!(!has_manifest(temp.path(), Ecosystem::Composer));
    }

    #[test]
    fn test_bad_manifest_degrades_to_none() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("composer.json"), "{ not json").unwrap();
        let manifest = discover(temp.path(), Ecosystem::Composer);
        assert!(manifest.root().is_none());
        assert!(!manifest.declares("monolog"));
    }
}
