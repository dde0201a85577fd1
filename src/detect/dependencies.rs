//! Dependency resolution for a file's imports.
//!
//! Each external package is classified, in order, by:
//!
//! 1. **Allow-list**: configured glob patterns mark a package installed.
//! 2. **Manifest**: the nearest manifest above the file declares it.
//! 3. **Install directory**: `node_modules`, `vendor`, or a virtualenv
//!    `site-packages` holds it.
//! 4. **Verification**: the configured check command exits zero (optional).
//!
//! Anything still undecided is `missing` when a manifest or verification
//! gave a signal, and `unknown` otherwise.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::imports::{external_imports, install_hint, ExternalImport};
use super::manifest::{self, ManifestProvider, MAX_ASCENT};
use super::types::{DependencyIssue, DependencyStatus};
use crate::analysis::{Ecosystem, ImportDecl, Language};
use crate::config::DependencyConfig;
use crate::verify::VerifyClient;

/// Virtualenv directory names searched for site-packages.
const VENV_DIRS: &[&str] = &[".venv", "venv", "env"];

/// Resolve the status of every external package imported by a file.
///
/// `file_dir` is the directory of the analysed file; discovery walks upward
/// from it. Verification runs only when `verifier` is given and enabled.
pub fn resolve_dependencies(
    imports: &[ImportDecl],
    language: Language,
    file_dir: &Path,
    config: &DependencyConfig,
    verifier: Option<&VerifyClient>,
) -> Vec<DependencyIssue> {
    if !config.enabled {
        return Vec::new();
    }
    let Some(ecosystem) = language.ecosystem() else {
        return Vec::new();
    };

    let manifest = manifest::discover(file_dir, ecosystem);
    let externals = external_imports(imports, ecosystem, &manifest.internal_roots());
    if externals.is_empty() {
        return Vec::new();
    }

    let mut statuses: HashMap<String, DependencyStatus> = HashMap::new();
    let mut pending = Vec::new();
    for ext in &externals {
        let allowlisted = verifier.map_or(false, |v| v.is_allowlisted(&ext.package));
        if allowlisted
            || declared(manifest.as_ref(), ecosystem, ext)
            || installed_locally(file_dir, ecosystem, ext)
        {
            statuses.insert(ext.package.clone(), DependencyStatus::Installed);
        } else {
            pending.push(ext.package.clone());
        }
    }

    let verified = match verifier {
        Some(v) if v.config().verify && !pending.is_empty() => {
            tracing::debug!("verifying {} {} packages", pending.len(), ecosystem);
            v.verify_blocking(ecosystem, pending.clone())
        }
        _ => HashMap::new(),
    };

    let fallback = if manifest.root().is_some() {
        DependencyStatus::Missing
    } else {
        DependencyStatus::Unknown
    };
    for package in pending {
        let status = match verified.get(&package) {
            Some(DependencyStatus::Unknown) | None => fallback,
            Some(s) => *s,
        };
        statuses.insert(package, status);
    }

    externals
        .into_iter()
        .map(|ext| {
            let status = statuses
                .get(&ext.package)
                .copied()
                .unwrap_or(DependencyStatus::Unknown);
            let install_hint =
                (status == DependencyStatus::Missing).then(|| install_hint(ecosystem, &ext.package));
            DependencyIssue {
                name: ext.package,
                status,
                line_number: ext.line_number,
                install_hint,
            }
        })
        .collect()
}

fn declared(manifest: &dyn ManifestProvider, ecosystem: Ecosystem, ext: &ExternalImport) -> bool {
    manifest.declares(&ext.package)
        || (ecosystem == Ecosystem::Pip && manifest.declares(&ext.import_root))
}

/// Whether an install directory at or above `start` holds the package.
fn installed_locally(start: &Path, ecosystem: Ecosystem, ext: &ExternalImport) -> bool {
    start.ancestors().take(MAX_ASCENT).any(|dir| match ecosystem {
        Ecosystem::Npm => dir.join("node_modules").join(&ext.package).is_dir(),
        Ecosystem::Composer => dir.join("vendor").join(&ext.package).is_dir(),
        Ecosystem::Pip => VENV_DIRS
            .iter()
            .any(|venv| in_site_packages(&dir.join(venv), ext)),
    })
}

/// `<venv>/lib/python*/site-packages` (or `Lib/site-packages` on Windows).
fn in_site_packages(venv: &Path, ext: &ExternalImport) -> bool {
    if !venv.is_dir() {
        return false;
    }
    let mut site_dirs = vec![venv.join("Lib").join("site-packages")];
    if let Ok(entries) = fs::read_dir(venv.join("lib")) {
        site_dirs.extend(entries.flatten().map(|e| e.path().join("site-packages")));
    }

    let dist_prefix = format!("{}-", ext.package.replace('-', "_"));
    site_dirs.iter().filter(|d| d.is_dir()).any(|site| {
        if site.join(&ext.import_root).is_dir() || site.join(format!("{}.py", ext.import_root)).is_file() {
            return true;
        }
        fs::read_dir(site)
            .map(|entries| {
                entries.flatten().any(|e| {
                    let name = e.file_name().to_string_lossy().to_lowercase();
                    name.ends_with(".dist-info") && name.starts_with(&dist_prefix)
                })
            })
            .unwrap_or(false)
    })
}
