//! File-level runner that enriches in-memory summaries with filesystem checks.

use indicatif::ProgressBar;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::analysis::{Language, StructuralSummary};
use crate::config::Config;
use crate::verify::VerifyClient;

use super::{find_external_usages, resolve_dependencies};

/// Outcome of analysing one file.
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub result: anyhow::Result<StructuralSummary>,
}

/// Analyses files from disk: extraction, dependency resolution, usage scan.
pub struct Runner {
    config: Config,
    language: Option<Language>,
    verifier: VerifyClient,
    usage_root: Option<PathBuf>,
}

impl Runner {
    /// Create a runner for a loaded configuration.
    pub fn new(config: Config) -> Self {
        let verifier = VerifyClient::new(config.dependencies.clone());
        Self {
            config,
            language: None,
            verifier,
            usage_root: None,
        }
    }

    /// Force a language instead of inferring it from the file extension.
    pub fn language(mut self, language: Option<Language>) -> Self {
        self.language = language;
        self
    }

    /// Scan this directory for references to each file's public symbols.
    pub fn usage_root(mut self, root: Option<PathBuf>) -> Self {
        self.usage_root = root;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Analyse one file.
    pub fn run_file(&self, path: &Path) -> anyhow::Result<StructuralSummary> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
        let language = self
            .language
            .or_else(|| Language::from_path(path))
            .unwrap_or(Language::Unknown);

        let mut summary = crate::analyze_with(&source, language, &self.config);

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        summary.dependency_issues = resolve_dependencies(
            &summary.imports,
            language,
            dir,
            &self.config.dependencies,
            Some(&self.verifier),
        );

        if let Some(root) = &self.usage_root {
            summary.external_usages =
                find_external_usages(path, root, &summary, self.config.usage.max_files);
        }

        tracing::debug!(
            "analysed {} ({} callables, {} dependencies)",
            path.display(),
            summary.callable_count(),
            summary.dependency_issues.len()
        );
        Ok(summary)
    }

    /// Analyse many files in parallel. Reports keep the input order.
    pub fn run(&self, files: &[PathBuf], progress: Option<&ProgressBar>) -> Vec<FileReport> {
        files
            .par_iter()
            .map(|path| {
                let result = self.run_file(path);
                if let Some(bar) = progress {
                    bar.inc(1);
                }
                FileReport {
                    path: path.clone(),
                    result,
                }
            })
            .collect()
    }
}
