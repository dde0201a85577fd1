//! Integration tests for file-level runs: dependency status and usages.

use std::path::PathBuf;

use codeshape::analysis::Language;
use codeshape::detect::{DependencyStatus, ExternalUsage};
use codeshape::{Config, Runner};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn statuses(path: &str) -> Vec<(String, DependencyStatus, Option<String>)> {
    let summary = Runner::new(Config::default())
        .run_file(&testdata_path().join(path))
        .expect("fixture should be analysed");
    summary
        .dependency_issues
        .into_iter()
        .map(|d| (d.name, d.status, d.install_hint))
        .collect()
}

#[test]
fn test_python_requirements_manifest() {
    assert_eq!(
        statuses("python/inventory.py"),
        vec![
            ("requests".to_string(), DependencyStatus::Installed, None),
            (
                "pyyaml".to_string(),
                DependencyStatus::Missing,
                Some("pip install pyyaml".to_string())
            ),
        ]
    );
}

#[test]
fn test_package_json_manifest() {
    assert_eq!(
        statuses("web/cart.js"),
        vec![
            ("axios".to_string(), DependencyStatus::Installed, None),
            (
                "lodash".to_string(),
                DependencyStatus::Missing,
                Some("npm install lodash".to_string())
            ),
        ]
    );
}

#[test]
fn test_composer_manifest_and_autoload_roots() {
    assert_eq!(
        statuses("php/src/OrderController.php"),
        vec![
            ("monolog".to_string(), DependencyStatus::Installed, None),
            (
                "guzzlehttp".to_string(),
                DependencyStatus::Missing,
                Some("composer require guzzlehttp/guzzlehttp".to_string())
            ),
        ]
    );
}

#[test]
fn test_html_has_no_dependencies() {
    assert!(statuses("html/login.html").is_empty());
}

#[test]
fn test_no_deps_leaves_issues_empty() {
    let mut config = Config::default();
    config.dependencies.enabled = false;
    let summary = Runner::new(config)
        .run_file(&testdata_path().join("web/cart.js"))
        .unwrap();
    assert!(summary.dependency_issues.is_empty());
    assert!(!summary.imports.is_empty());
}

#[test]
fn test_allowlisted_package_is_installed() {
    let mut config = Config::default();
    config.dependencies.allowlist = vec!["lodash*".to_string()];
    let summary = Runner::new(config)
        .run_file(&testdata_path().join("web/cart.js"))
        .unwrap();
    assert!(summary
        .dependency_issues
        .iter()
        .all(|d| d.status == DependencyStatus::Installed));
}

#[test]
fn test_external_usages_across_fixture_dir() {
    let web = testdata_path().join("web");
    let summary = Runner::new(Config::default())
        .language(Some(Language::JavaScript))
        .usage_root(Some(web.clone()))
        .run_file(&web.join("format.js"))
        .unwrap();
    assert_eq!(
        summary.external_usages,
        vec![ExternalUsage {
            symbol: "formatPrice".to_string(),
            file: "cart.js".to_string(),
            line_number: 3,
        }]
    );
}
