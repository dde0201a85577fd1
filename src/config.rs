//! Configuration schema for codeshape.
//!
//! Every section is optional; a missing file means built-in defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::Ecosystem;

/// Config file names searched in the working directory.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["codeshape.yaml", ".codeshape.yaml"];

/// Upper bound for a single verification command.
pub const MAX_TIMEOUT_MS: u64 = 30_000;

/// Placeholder replaced by the package name in verification commands.
pub const PACKAGE_PLACEHOLDER: &str = "{package}";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub version: String,
    /// Glob patterns for paths skipped by directory scans (e.g. "**/dist/**")
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    #[serde(default)]
    pub hardcoded: HardcodedConfig,
    #[serde(default)]
    pub unused: ToggleConfig,
    #[serde(default)]
    pub markers: ToggleConfig,
    #[serde(default)]
    pub dependencies: DependencyConfig,
    #[serde(default)]
    pub usage: UsageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            excluded_paths: Vec::new(),
            hardcoded: HardcodedConfig::default(),
            unused: ToggleConfig::default(),
            markers: ToggleConfig::default(),
            dependencies: DependencyConfig::default(),
            usage: UsageConfig::default(),
        }
    }
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Locate a config file: the working directory first, then the platform
    /// config dir. `None` when neither has one.
    pub fn discover(cwd: &Path) -> Option<PathBuf> {
        for name in DEFAULT_CONFIG_NAMES {
            let path = cwd.join(name);
            if path.is_file() {
                return Some(path);
            }
        }
        directories::ProjectDirs::from("", "", "codeshape")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
            .filter(|p| p.is_file())
    }

    /// Load an explicit file, a discovered one, or the defaults.
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> anyhow::Result<(Self, Option<PathBuf>)> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => Self::discover(cwd),
        };
        match path {
            Some(p) => {
                let config = Self::parse_file(&p)
                    .map_err(|e| anyhow::anyhow!("parsing config {}: {}", p.display(), e))?;
                validate(&config)?;
                Ok((config, Some(p)))
            }
            None => Ok((Self::default(), None)),
        }
    }

    /// Check if a path should be excluded based on excluded_paths patterns.
    pub fn is_path_excluded(&self, path: &Path) -> bool {
        if self.excluded_paths.is_empty() {
            return false;
        }
        let path_str = path.to_string_lossy();
        self.excluded_paths.iter().any(|pattern| {
            globset::Glob::new(pattern)
                .map(|g| g.compile_matcher().is_match(&*path_str))
                .unwrap_or(false)
        })
    }
}

fn default_true() -> bool {
    true
}

/// An on/off switch for a detector.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToggleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ToggleConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Hardcoded-literal detection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HardcodedConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Minimum content length of a plain string assignment to report.
    #[serde(default = "default_min_string_length")]
    pub min_string_length: usize,
    /// Maximum characters of assignment context kept per finding.
    #[serde(default = "default_context_width")]
    pub context_width: usize,
}

fn default_min_string_length() -> usize {
    8
}

fn default_context_width() -> usize {
    40
}

impl Default for HardcodedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_string_length: default_min_string_length(),
            context_width: default_context_width(),
        }
    }
}

/// Per-ecosystem verification commands. `{package}` is substituted.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerifyCommands {
    #[serde(default = "default_pip_command")]
    pub pip: Vec<String>,
    #[serde(default = "default_npm_command")]
    pub npm: Vec<String>,
    #[serde(default = "default_composer_command")]
    pub composer: Vec<String>,
}

fn default_pip_command() -> Vec<String> {
    ["python3", "-m", "pip", "show", "--quiet", PACKAGE_PLACEHOLDER]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_npm_command() -> Vec<String> {
    ["npm", "ls", "--depth=0", PACKAGE_PLACEHOLDER]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_composer_command() -> Vec<String> {
    ["composer", "show", "--quiet", PACKAGE_PLACEHOLDER]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for VerifyCommands {
    fn default() -> Self {
        Self {
            pip: default_pip_command(),
            npm: default_npm_command(),
            composer: default_composer_command(),
        }
    }
}

impl VerifyCommands {
    /// Command template for an ecosystem.
    pub fn for_ecosystem(&self, ecosystem: Ecosystem) -> &[String] {
        match ecosystem {
            Ecosystem::Pip => &self.pip,
            Ecosystem::Npm => &self.npm,
            Ecosystem::Composer => &self.composer,
        }
    }
}

/// Dependency resolution and live verification.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DependencyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Run verification commands for packages no manifest or install dir covers.
    #[serde(default)]
    pub verify: bool,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum verification commands in flight.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Glob patterns of package names always treated as installed.
    #[serde(default)]
    pub allowlist: Vec<String>,
    #[serde(default)]
    pub commands: VerifyCommands,
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_concurrency() -> usize {
    8
}

fn default_cache_ttl_secs() -> u64 {
    300
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            verify: false,
            timeout_ms: default_timeout_ms(),
            concurrency: default_concurrency(),
            cache_ttl_secs: default_cache_ttl_secs(),
            allowlist: Vec::new(),
            commands: VerifyCommands::default(),
        }
    }
}

/// Cross-file usage scan.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UsageConfig {
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

fn default_max_files() -> usize {
    200
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
        }
    }
}

/// Validate a config for correctness.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    for pattern in &config.excluded_paths {
        globset::Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e))?;
    }

    let deps = &config.dependencies;
    for pattern in &deps.allowlist {
        globset::Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid allowlist pattern {:?}: {}", pattern, e))?;
    }
    if deps.timeout_ms == 0 || deps.timeout_ms > MAX_TIMEOUT_MS {
        anyhow::bail!(
            "dependencies.timeout_ms must be between 1 and {}, got {}",
            MAX_TIMEOUT_MS,
            deps.timeout_ms
        );
    }
    if deps.concurrency == 0 {
        anyhow::bail!("dependencies.concurrency must be at least 1");
    }
    for ecosystem in [Ecosystem::Pip, Ecosystem::Npm, Ecosystem::Composer] {
        if deps.commands.for_ecosystem(ecosystem).is_empty() {
            anyhow::bail!("dependencies.commands.{} must not be empty", ecosystem);
        }
    }

    Ok(())
}
