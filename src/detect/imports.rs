//! Import identifier normalization.
//!
//! Turns the module identifiers recorded by the extractors into canonical
//! package names for an ecosystem, dropping relative paths and builtins.

use phf::phf_map;
use std::collections::HashSet;

use super::stdlib::is_stdlib;
use crate::analysis::{Ecosystem, ImportDecl};

/// Import name to distribution name, where they differ.
static PYTHON_DISTRIBUTIONS: phf::Map<&'static str, &'static str> = phf_map! {
    "yaml" => "pyyaml",
    "PIL" => "pillow",
    "cv2" => "opencv-python",
    "sklearn" => "scikit-learn",
    "skimage" => "scikit-image",
    "bs4" => "beautifulsoup4",
    "dateutil" => "python-dateutil",
    "dotenv" => "python-dotenv",
    "jwt" => "pyjwt",
    "jose" => "python-jose",
    "serial" => "pyserial",
    "usb" => "pyusb",
    "Crypto" => "pycryptodome",
    "OpenSSL" => "pyopenssl",
    "magic" => "python-magic",
    "docx" => "python-docx",
    "pptx" => "python-pptx",
    "attr" => "attrs",
    "fitz" => "pymupdf",
    "gi" => "pygobject",
    "zmq" => "pyzmq",
    "MySQLdb" => "mysqlclient",
    "telegram" => "python-telegram-bot",
    "slugify" => "python-slugify",
    "multipart" => "python-multipart",
    "ldap" => "python-ldap",
    "win32api" => "pywin32",
};

/// PHP namespace roots that belong to the application itself.
pub const PHP_INTERNAL_ROOTS: &[&str] = &["App", "Tests", "Database"];

/// An import that resolves to a third-party package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalImport {
    /// Canonical package name.
    pub package: String,
    /// Module identifier as written.
    pub module: String,
    /// Root segment of the module (the importable name).
    pub import_root: String,
    pub line_number: usize,
}

/// Whether a module identifier points into the project rather than a package.
pub fn is_relative(module: &str) -> bool {
    let m = module.trim();
    m.is_empty()
        || m.starts_with('.')
        || m.starts_with('/')
        || m.starts_with('~')
        || m.starts_with('#')
        || m.starts_with("@/")
        || m.starts_with("__DIR__")
        || m.ends_with(".php")
        || m.contains("://")
}

/// Root segment of a module identifier.
pub fn import_root(ecosystem: Ecosystem, module: &str) -> String {
    let m = module.trim().trim_start_matches('\\');
    match ecosystem {
        Ecosystem::Pip => m.split('.').next().unwrap_or(m).to_string(),
        Ecosystem::Npm => npm_package(m),
        Ecosystem::Composer => m.split('\\').next().unwrap_or(m).to_string(),
    }
}

/// `@scope/pkg/sub` keeps its scope; `pkg/sub` keeps the first segment.
fn npm_package(module: &str) -> String {
    let mut parts = module.split('/');
    match (parts.next(), parts.next()) {
        (Some(scope), Some(name)) if scope.starts_with('@') => format!("{scope}/{name}"),
        (Some(first), _) => first.to_string(),
        (None, _) => module.to_string(),
    }
}

/// Canonical package name for a module identifier.
pub fn normalize_package(ecosystem: Ecosystem, module: &str) -> String {
    let root = import_root(ecosystem, module);
    match ecosystem {
        Ecosystem::Pip => PYTHON_DISTRIBUTIONS
            .get(root.as_str())
            .map(|d| d.to_string())
            .unwrap_or_else(|| root.to_lowercase().replace('_', "-")),
        Ecosystem::Npm => root,
        Ecosystem::Composer => root.to_lowercase(),
    }
}

/// Filter imports to external packages, one entry per package at its first line.
pub fn external_imports(
    imports: &[ImportDecl],
    ecosystem: Ecosystem,
    internal_roots: &[String],
) -> Vec<ExternalImport> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for import in imports {
        let module = import.module.trim();
        if is_relative(module) || is_stdlib(ecosystem, module) {
            continue;
        }
        let root = import_root(ecosystem, module);
        if root.is_empty() || (ecosystem == Ecosystem::Pip && root.starts_with('_')) {
            continue;
        }
        if ecosystem == Ecosystem::Composer
            && (!module.contains('\\')
                || PHP_INTERNAL_ROOTS.contains(&root.as_str())
                || internal_roots.iter().any(|r| r == &root))
        {
            continue;
        }
        let package = normalize_package(ecosystem, module);
        if seen.insert(package.clone()) {
            out.push(ExternalImport {
                package,
                module: module.to_string(),
                import_root: root,
                line_number: import.line_number,
            });
        }
    }

    out
}

/// Conventional single-package install command.
pub fn install_hint(ecosystem: Ecosystem, package: &str) -> String {
    match ecosystem {
        Ecosystem::Pip => format!("pip install {package}"),
        Ecosystem::Npm => format!("npm install {package}"),
        Ecosystem::Composer => format!("composer require {package}/{package}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(module: &str, line: usize) -> ImportDecl {
        ImportDecl {
            module: module.to_string(),
            names: Vec::new(),
            is_from: false,
            line_number: line,
        }
    }

    #[test]
    fn test_npm_normalization() {
        assert_eq!(normalize_package(Ecosystem::Npm, "@scope/pkg/deep/path"), "@scope/pkg");
        assert_eq!(normalize_package(Ecosystem::Npm, "lodash/fp"), "lodash");
    }

    #[test]
    fn test_python_normalization() {
        assert_eq!(normalize_package(Ecosystem::Pip, "yaml"), "pyyaml");
        assert_eq!(normalize_package(Ecosystem::Pip, "google_auth.transport"), "google-auth");
        assert_eq!(normalize_package(Ecosystem::Pip, "requests.adapters"), "requests");
    }

    #[test]
    fn test_composer_normalization() {
        assert_eq!(normalize_package(Ecosystem::Composer, "Monolog\\Handler\\StreamHandler"), "monolog");
        assert_eq!(install_hint(Ecosystem::Composer, "monolog"), "composer require monolog/monolog");
    }

    #[test]
    fn test_external_filtering() {
        let imports = vec![
            decl("./local", 1),
            decl("fs", 2),
            decl("node:path", 3),
            decl("react", 4),
            decl("react/jsx-runtime", 5),
            decl("@/components/Button", 6),
            decl("@mui/material/Button", 7),
        ];
        let found = external_imports(&imports, Ecosystem::Npm, &[]);
        let names: Vec<(&str, usize)> = found.iter().map(|e| (e.package.as_str(), e.line_number)).collect();
        assert_eq!(names, vec![("react", 4), ("@mui/material", 7)]);
    }

    #[test]
    fn test_php_internal_roots() {
        let imports = vec![
            decl("App\\Models\\User", 1),
            decl("Acme\\Billing\\Invoice", 2),
            decl("Monolog\\Logger", 3),
            decl("__DIR__/helpers.php", 4),
            decl("DateTime", 5),
        ];
        let found = external_imports(&imports, Ecosystem::Composer, &["Acme".to_string()]);
        let names: Vec<&str> = found.iter().map(|e| e.package.as_str()).collect();
        assert_eq!(names, vec!["monolog"]);
    }
}
