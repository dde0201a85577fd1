//! Command-line interface for codeshape.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::analysis::languages::supported_extensions;
use crate::analysis::Language;
use crate::config::Config;
use crate::detect::{Runner, SKIPPED_DIRS};
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Heuristic structural summaries of source files.
///
/// Codeshape lists a file's imports, types and callables with a branch
/// complexity count, and flags hardcoded literals, unused symbols, marker
/// comments and undeclared dependencies. Python, JavaScript, TypeScript, PHP
/// and HTML are supported.
#[derive(Parser)]
#[command(name = "codeshape")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Summarize a file or every supported file under a directory
    #[command(visible_alias = "a")]
    Analyze(AnalyzeArgs),
    /// Create a codeshape config file from a template
    Init(InitArgs),
}

/// Arguments for the analyze command.
#[derive(Parser)]
pub struct AnalyzeArgs {
    /// File or directory to analyze
    pub path: PathBuf,

    /// Language tag (python, javascript, typescript, php, html); inferred from the extension by default
    #[arg(short, long)]
    pub language: Option<String>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verify unresolved dependencies by running the configured commands
    #[arg(long)]
    pub verify: bool,

    /// Skip dependency resolution
    #[arg(long)]
    pub no_deps: bool,

    /// Search the workspace for references to each file's public symbols
    #[arg(long)]
    pub usages: bool,

    /// Workspace root for --usages (default: the analyzed directory, or the working directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Exit with status 1 when any finding is reported
    #[arg(long)]
    pub fail_on_findings: bool,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "codeshape.yaml")]
    pub output: PathBuf,

    /// Template to use
    #[arg(short, long, default_value = "default")]
    pub template: String,

    /// List available templates
    #[arg(short, long)]
    pub list: bool,
}

/// Available config templates.
struct Template {
    name: &'static str,
    description: &'static str,
    content: &'static str,
}

static TEMPLATES: &[Template] = &[
    Template {
        name: "default",
        description: "All detectors on, dependency status from manifests and install dirs",
        content: include_str!("templates/default.yaml"),
    },
    Template {
        name: "verify",
        description: "Adds live verification commands for unresolved packages",
        content: include_str!("templates/verify.yaml"),
    },
];

/// Collect supported files under a directory.
fn collect_files(root: &Path, config: &Config) -> anyhow::Result<Vec<PathBuf>> {
    let extensions = supported_extensions();
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(true).into_iter().filter_entry(|e| {
        let name = e.file_name().to_string_lossy();
        // Hidden and dependency directories
        !(e.depth() > 0
            && e.file_type().is_dir()
            && (name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())))
    }) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !extensions.contains(&ext) {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        if config.is_path_excluded(relative) || config.is_path_excluded(path) {
            tracing::debug!("excluded {}", path.display());
            continue;
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
    {
        bar.set_style(style.progress_chars("#>-"));
    }
    bar
}

/// Run the analyze command.
pub fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<i32> {
    // Validate format
    if args.format != "pretty" && args.format != "json" {
        eprintln!("Error: invalid format {:?}, must be 'pretty' or 'json'", args.format);
        return Ok(EXIT_ERROR);
    }

    let cwd = std::env::current_dir()?;
    let (mut config, config_path) = match Config::load(args.config.as_deref(), &cwd) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    if args.verify {
        config.dependencies.verify = true;
    }
    if args.no_deps {
        config.dependencies.enabled = false;
    }

    let language = args.language.as_deref().map(Language::from_tag);
    if language == Some(Language::Unknown) {
        tracing::warn!(
            "unrecognised language {:?}, using the javascript extractor",
            args.language.as_deref().unwrap_or_default()
        );
    }

    // Resolve path
    let abs_path = match args.path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };
    let is_dir = abs_path.is_dir();

    let files = if is_dir {
        collect_files(&abs_path, &config)?
    } else {
        vec![abs_path.clone()]
    };
    if files.is_empty() {
        eprintln!("Warning: no files to analyze");
        return Ok(EXIT_SUCCESS);
    }

    let usage_root = if args.usages || args.root.is_some() {
        let root = match &args.root {
            Some(r) => r.clone(),
            None if is_dir => abs_path.clone(),
            None => cwd.clone(),
        };
        Some(root)
    } else {
        None
    };

    let runner = Runner::new(config).language(language).usage_root(usage_root);

    let progress = (is_dir && files.len() > 1 && args.format == "pretty").then(|| progress_bar(files.len()));
    let reports = runner.run(&files, progress.as_ref());
    if let Some(bar) = &progress {
        bar.finish_and_clear();
    }

    // Output results
    let path_str = args.path.to_string_lossy().to_string();
    let config_str = config_path.map(|p| p.to_string_lossy().to_string());
    match args.format.as_str() {
        "json" => report::write_json(&path_str, config_str.as_deref(), &reports)?,
        _ => report::write_pretty(&path_str, config_str.as_deref(), &reports),
    }

    if !is_dir && reports.iter().any(|r| r.result.is_err()) {
        return Ok(EXIT_ERROR);
    }
    let has_findings = reports
        .iter()
        .filter_map(|r| r.result.as_ref().ok())
        .any(|s| s.has_findings());
    if args.fail_on_findings && has_findings {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.list {
        print_templates();
        return Ok(EXIT_SUCCESS);
    }

    let Some(template) = TEMPLATES.iter().find(|t| t.name == args.template) else {
        let known: Vec<&str> = TEMPLATES.iter().map(|t| t.name).collect();
        eprintln!(
            "Error: unknown template {:?} (available: {})",
            args.template,
            known.join(", ")
        );
        return Ok(EXIT_ERROR);
    };

    if let Err(e) = write_template(template, &args.output) {
        eprintln!("Error: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Wrote {} ({} template)", args.output.display(), template.name);
    println!("Analyze with: codeshape analyze <path> --config {}", args.output.display());
    Ok(EXIT_SUCCESS)
}

/// Write a template without overwriting an existing file.
fn write_template(template: &Template, output: &Path) -> anyhow::Result<()> {
    if output.exists() {
        anyhow::bail!("{} already exists; choose another path with --output", output.display());
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| anyhow::anyhow!("creating {}: {}", parent.display(), e))?;
    }
    std::fs::write(output, template.content)
        .map_err(|e| anyhow::anyhow!("writing {}: {}", output.display(), e))?;
    Ok(())
}

fn print_templates() {
    println!("Templates (codeshape init --template <name>):");
    for template in TEMPLATES {
        let marker = if template.name == "default" { "*" } else { " " };
        println!("  {} {:<10} {}", marker, template.name, template.description);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_templates_parse_and_validate() {
        for template in TEMPLATES {
            let config: Config = serde_yaml::from_str(template.content).unwrap();
            crate::config::validate(&config).unwrap();
        }
        let verify: Config = serde_yaml::from_str(TEMPLATES[1].content).unwrap();
        assert!(verify.dependencies.verify);
    }

    #[test]
    fn test_collect_files_skips_hidden_deps_and_excluded() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("app.py"), "x = 1\n").unwrap();
        fs::write(root.join("README.md"), "# readme\n").unwrap();
        fs::create_dir_all(root.join("node_modules").join("lib")).unwrap();
        fs::write(root.join("node_modules").join("lib").join("index.js"), "").unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join(".git").join("hook.py"), "").unwrap();
        fs::create_dir_all(root.join("generated")).unwrap();
        fs::write(root.join("generated").join("bundle.js"), "").unwrap();
        fs::create_dir_all(root.join("web")).unwrap();
        fs::write(root.join("web").join("index.html"), "<p></p>\n").unwrap();

        let config = Config {
            excluded_paths: vec!["generated/**".to_string()],
            ..Default::default()
        };
        let files = collect_files(root, &config).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["app.py", "web/index.html"]);
    }

    #[test]
    fn test_init_writes_template_once() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("cfg").join("codeshape.yaml");
        let args = InitArgs {
            output: output.clone(),
            template: "verify".to_string(),
            list: false,
        };
        assert_eq!(run_init(&args).unwrap(), EXIT_SUCCESS);
        assert!(fs::read_to_string(&output).unwrap().contains("verify: true"));
        assert_eq!(run_init(&args).unwrap(), EXIT_ERROR);

        let unknown = InitArgs {
            output: temp.path().join("other.yaml"),
            template: "nope".to_string(),
            list: false,
        };
        assert_eq!(run_init(&unknown).unwrap(), EXIT_ERROR);
    }
}
