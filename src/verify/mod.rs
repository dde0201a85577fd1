//! Live dependency verification through external commands.
//!
//! Each candidate package is checked by running the configured command for
//! its ecosystem (e.g. `python3 -m pip show --quiet {package}`). Exit status
//! zero means installed. Every command runs under a timeout and is killed when
//! it expires; a timeout or spawn failure is reported as missing, never as an
//! analysis error.

mod cache;

pub use cache::VerifyCache;

use futures::stream::{self, StreamExt};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::analysis::Ecosystem;
use crate::config::{DependencyConfig, MAX_TIMEOUT_MS, PACKAGE_PLACEHOLDER};
use crate::detect::DependencyStatus;

/// Errors that can occur during a verification command.
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("verifying {package:?} timed out after {timeout_ms} ms")]
    Timeout { package: String, timeout_ms: u64 },
    #[error("failed to run {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("verification disabled")]
    Disabled,
}

/// Runs verification commands with caching and an allow-list.
pub struct VerifyClient {
    config: DependencyConfig,
    cache: Arc<VerifyCache>,
    allowlist: Option<GlobSet>,
}

impl VerifyClient {
    /// Create a client backed by the process-wide cache.
    pub fn new(config: DependencyConfig) -> Self {
        let allowlist = build_allowlist(&config.allowlist);
        Self {
            config,
            cache: VerifyCache::shared(),
            allowlist,
        }
    }

    /// Use a private cache instead of the process-wide one.
    pub fn with_cache(mut self, cache: Arc<VerifyCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &DependencyConfig {
        &self.config
    }

    pub fn cache(&self) -> &VerifyCache {
        &self.cache
    }

    /// Check if a package matches an allow-list pattern.
    pub fn is_allowlisted(&self, package: &str) -> bool {
        if self.config.allowlist.iter().any(|p| p == package) {
            return true;
        }
        self.allowlist
            .as_ref()
            .map_or(false, |set| set.is_match(package))
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms.clamp(1, MAX_TIMEOUT_MS))
    }

    /// Run the verification command for one package. `Ok(true)` when it exits zero.
    pub async fn check_package(&self, ecosystem: Ecosystem, package: &str) -> Result<bool, VerifyError> {
        if !self.config.verify {
            return Err(VerifyError::Disabled);
        }
        let ttl = Duration::from_secs(self.config.cache_ttl_secs);
        if let Some(installed) = self.cache.get(ecosystem, package, ttl) {
            return Ok(installed);
        }

        let template = self.config.commands.for_ecosystem(ecosystem);
        let Some((program, args)) = template.split_first() else {
            return Err(VerifyError::Disabled);
        };
        let args: Vec<String> = args
            .iter()
            .map(|a| a.replace(PACKAGE_PLACEHOLDER, package))
            .collect();

        let mut child = tokio::process::Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| VerifyError::Spawn {
                program: program.clone(),
                source,
            })?;

        let timeout = self.timeout();
        let status = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(source)) => {
                return Err(VerifyError::Spawn {
                    program: program.clone(),
                    source,
                })
            }
            Err(_) => {
                return Err(VerifyError::Timeout {
                    package: package.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        };

        let installed = status.success();
        self.cache.set(ecosystem, package, installed);
        Ok(installed)
    }

    /// Check packages concurrently, at most `concurrency` commands in flight.
    pub async fn check_packages(
        &self,
        ecosystem: Ecosystem,
        packages: Vec<String>,
    ) -> HashMap<String, DependencyStatus> {
        let results: Vec<_> = stream::iter(packages)
            .map(|package| async move {
                let outcome = self.check_package(ecosystem, &package).await;
                (package, outcome)
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        results
            .into_iter()
            .map(|(package, outcome)| {
                let status = match outcome {
                    Ok(true) => DependencyStatus::Installed,
                    Ok(false) => DependencyStatus::Missing,
                    Err(VerifyError::Disabled) => DependencyStatus::Unknown,
                    Err(e) => {
                        tracing::warn!("{}", e);
                        DependencyStatus::Missing
                    }
                };
                (package, status)
            })
            .collect()
    }

    /// Blocking wrapper around [`check_packages`](Self::check_packages).
    pub fn verify_blocking(
        &self,
        ecosystem: Ecosystem,
        packages: Vec<String>,
    ) -> HashMap<String, DependencyStatus> {
        if packages.is_empty() {
            return HashMap::new();
        }
        match tokio::runtime::Runtime::new() {
            Ok(runtime) => runtime.block_on(self.check_packages(ecosystem, packages)),
            Err(e) => {
                tracing::warn!("cannot start verification runtime: {}", e);
                packages
                    .into_iter()
                    .map(|p| (p, DependencyStatus::Unknown))
                    .collect()
            }
        }
    }
}

fn build_allowlist(patterns: &[String]) -> Option<GlobSet> {
    if patterns.is_empty() {
        return None;
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => tracing::debug!("ignoring allowlist pattern {:?}: {}", pattern, e),
        }
    }
    builder.build().ok()
}
