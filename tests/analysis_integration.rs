//! Integration tests for structural extraction and findings.
//!
//! Each test analyses a fixture under `testdata/` through the public API.

use std::path::PathBuf;

use codeshape::analysis::Language;
use codeshape::detect::{HardcodedKind, MarkerKind, UnusedKind};
use codeshape::{analyze, StructuralSummary};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn analyze_fixture(relative: &str, language: Language) -> StructuralSummary {
    let source = std::fs::read_to_string(testdata_path().join(relative)).expect("fixture should exist");
    analyze(&source, language)
}

fn hardcoded(summary: &StructuralSummary) -> Vec<(usize, HardcodedKind)> {
    summary.hardcoded.iter().map(|h| (h.line_number, h.kind)).collect()
}

fn unused(summary: &StructuralSummary) -> Vec<(&str, UnusedKind)> {
    summary.unused.iter().map(|u| (u.name.as_str(), u.kind)).collect()
}

// =============================================================================
// Python
// =============================================================================

#[test]
fn test_python_annotation_and_structure() {
    let s = analyze_fixture("python/inventory.py", Language::Python);

    let annotation = s.annotation.as_ref().expect("annotation block");
    assert_eq!(annotation.name.as_deref(), Some("inventory"));
    assert_eq!(annotation.type_name.as_deref(), Some("service"));
    assert_eq!(annotation.inputs, vec!["sku", "quantity"]);
    assert_eq!(annotation.deps, vec!["requests", "yaml"]);

    assert_eq!(s.imports.len(), 5);
    assert!(s.connections.contains(&"typing".to_string()));

    let types: Vec<(&str, usize)> = s.types.iter().map(|t| (t.name.as_str(), t.line_number)).collect();
    assert_eq!(types, vec![("InventoryError", 19), ("Inventory", 23)]);
    assert_eq!(s.types[0].bases, vec!["Exception"]);

    let inventory = &s.types[1];
    let methods: Vec<&str> = inventory.methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(methods, vec!["__init__", "restock", "_audit"]);
    let attrs: Vec<&str> = inventory.attributes.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(attrs, vec!["client", "items"]);

    let restock = &inventory.methods[1];
    assert_eq!(restock.complexity, 2);
    assert_eq!(restock.return_type, "int");
    assert_eq!(restock.params[1].default.as_deref(), Some("1"));
    assert!(inventory.methods[2].is_private);

    let callables: Vec<&str> = s.callables.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(callables, vec!["load_rules", "fetch_stock"]);
    assert_eq!(s.callables[0].complexity, 1);

    assert_eq!(s.error_type_names, vec!["InventoryError", "OSError"]);
    assert_eq!(s.risk_point_lines, vec![41, 44]);
    assert_eq!(s.total_lines, 50);
    assert!(s.code_lines < s.total_lines);
}

#[test]
fn test_python_findings() {
    let s = analyze_fixture("python/inventory.py", Language::Python);

    assert_eq!(
        hardcoded(&s),
        vec![(15, HardcodedKind::Url), (49, HardcodedKind::Credential)]
    );
    assert_eq!(s.hardcoded[1].value, "hunter2secret");

    assert_eq!(
        unused(&s),
        vec![
            ("os", UnusedKind::Import),
            ("List", UnusedKind::Import),
            ("Item", UnusedKind::Import),
            ("_UNUSED_LIMIT", UnusedKind::Variable),
            ("restock", UnusedKind::Callable),
            ("_audit", UnusedKind::Callable),
            ("load_rules", UnusedKind::Callable),
            ("fetch_stock", UnusedKind::Callable),
        ]
    );

    assert_eq!(s.markers.len(), 1);
    assert_eq!(s.markers[0].kind, MarkerKind::Todo);
    assert_eq!(s.markers[0].text, "cache parsed rules");
    assert_eq!(s.markers[0].line_number, 40);

    assert!(s
        .overview
        .starts_with("inventory (Stock levels and reorder rules): python file with 2 types"));
    assert!(s.overview.contains("most complex: restock (2)"));
}

// =============================================================================
// JavaScript
// =============================================================================

#[test]
fn test_javascript_structure_and_findings() {
    let s = analyze_fixture("web/cart.js", Language::JavaScript);

    assert_eq!(s.imports.len(), 4);
    let cart = &s.types[0];
    assert_eq!(cart.name, "Cart");
    assert_eq!(cart.line_number, 9);
    let methods: Vec<&str> = cart.methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(methods, vec!["constructor", "add", "total"]);
    assert_eq!(cart.methods[1].complexity, 1);
    assert_eq!(cart.methods[2].complexity, 1);

    // The literal braces inside `save` must not swallow `render`.
    let callables: Vec<(&str, usize)> = s.callables.iter().map(|c| (c.name.as_str(), c.line_number)).collect();
    assert_eq!(callables, vec![("save", 29), ("render", 35)]);
    assert!(s.callables[0].is_async);
    assert_eq!(s.error_type_names, vec!["CartError"]);

    assert_eq!(
        hardcoded(&s),
        vec![
            (6, HardcodedKind::Url),
            (7, HardcodedKind::Number),
            (31, HardcodedKind::String),
        ]
    );
    assert_eq!(s.hardcoded[1].context, "port");

    let names: Vec<&str> = s.unused.iter().map(|u| u.name.as_str()).collect();
    for expected in ["debounce", "throttle", "fs", "add", "save", "render"] {
        assert!(names.contains(&expected), "{expected} should be unused: {names:?}");
    }
    for used in ["axios", "formatPrice", "total", "constructor"] {
        assert!(!names.contains(&used), "{used} is referenced: {names:?}");
    }

    assert_eq!(s.markers[0].kind, MarkerKind::Fixme);
    assert_eq!(s.markers[0].line_number, 30);
}

#[test]
fn test_unknown_tag_uses_script_extractor() {
    let source = std::fs::read_to_string(testdata_path().join("web/format.js")).unwrap();
    let s = analyze(&source, Language::from_tag("coffee"));
    assert_eq!(s.language, Language::Unknown);
    assert_eq!(s.callables[0].name, "formatPrice");
}

// =============================================================================
// PHP
// =============================================================================

#[test]
fn test_php_structure_and_findings() {
    let s = analyze_fixture("php/src/OrderController.php", Language::Php);

    let modules: Vec<&str> = s.imports.iter().map(|i| i.module.as_str()).collect();
    assert_eq!(modules, vec!["Monolog\\Logger", "GuzzleHttp\\Client", "Shop\\Models\\Order"]);

    let controller = &s.types[0];
    assert_eq!(controller.name, "OrderController");
    let methods: Vec<&str> = controller.methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(methods, vec!["__construct", "show", "unusedHelper"]);
    assert_eq!(controller.methods[1].return_type, "Order");
    assert_eq!(controller.methods[1].complexity, 1);
    assert!(controller.methods[2].is_private);
    let attrs: Vec<&str> = controller.attributes.iter().map(|a| a.name.as_str()).collect();
    assert!(attrs.contains(&"DB_HOST"));
    assert!(attrs.contains(&"logger"));

    assert_eq!(
        hardcoded(&s),
        vec![(10, HardcodedKind::Ip), (11, HardcodedKind::Credential)]
    );
    assert_eq!(s.hardcoded[0].value, "192.168.1.20");

    assert_eq!(
        unused(&s),
        vec![
            ("Client", UnusedKind::Import),
            ("show", UnusedKind::Callable),
            ("unusedHelper", UnusedKind::Callable),
        ]
    );
    assert_eq!(s.markers[0].kind, MarkerKind::Hack);
    assert_eq!(s.error_type_names, vec!["NotFoundException"]);
}

// =============================================================================
// HTML
// =============================================================================

#[test]
fn test_html_elements_and_inline_script() {
    let s = analyze_fixture("html/login.html", Language::Html);

    let modules: Vec<&str> = s.imports.iter().map(|i| i.module.as_str()).collect();
    assert_eq!(modules, vec!["/css/app.css", "https://cdn.example.com/lib.js"]);

    let form = s
        .types
        .iter()
        .find(|t| t.name == "form#login")
        .expect("form element");
    let fields: Vec<&str> = form.attributes.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(fields, vec!["email", "password", "submit"]);

    assert_eq!(s.callables.len(), 1);
    assert_eq!(s.callables[0].name, "submitForm");
    assert_eq!(s.callables[0].line_number, 15);
    assert_eq!(s.callables[0].complexity, 1);

    assert_eq!(s.markers.len(), 1);
    assert_eq!(s.markers[0].kind, MarkerKind::Todo);
    assert_eq!(s.markers[0].line_number, 8);
}

// =============================================================================
// Cross-language properties
// =============================================================================

#[test]
fn test_every_fixture_is_stable_and_bounded() {
    let fixtures = [
        ("python/inventory.py", Language::Python),
        ("web/cart.js", Language::JavaScript),
        ("web/cart.js", Language::TypeScript),
        ("php/src/OrderController.php", Language::Php),
        ("html/login.html", Language::Html),
    ];
    for (path, language) in fixtures {
        let first = analyze_fixture(path, language);
        let second = analyze_fixture(path, language);
        assert_eq!(first, second, "{path} should be deterministic");
        assert!(first.code_lines <= first.total_lines);

        let source = std::fs::read_to_string(testdata_path().join(path)).unwrap();
        let lines: Vec<&str> = source.lines().collect();
        for c in first.callables.iter().chain(first.types.iter().flat_map(|t| t.methods.iter())) {
            let header = lines[c.line_number - 1];
            assert!(header.contains(&c.name), "{path}:{} should declare {}", c.line_number, c.name);
        }
        for i in &first.imports {
            assert!(i.line_number >= 1 && i.line_number <= lines.len());
        }
    }
}

#[test]
fn test_credential_wins_over_url() {
    let s = analyze(
        "def connect():\n    pass\n\n\napi_token = \"https://user:pw@example.com/hook\"\n",
        Language::Python,
    );
    assert_eq!(hardcoded(&s), vec![(5, HardcodedKind::Credential)]);
}

#[test]
fn test_import_mentioned_only_in_string_is_unused() {
    let s = analyze("import json\n\nprint(\"json\")\n", Language::Python);
    assert_eq!(unused(&s), vec![("json", UnusedKind::Import)]);
}

#[test]
fn test_from_import_partially_used() {
    let s = analyze("from moduleX import a_one, b_two\n\nprint(a_one)\n", Language::Python);
    assert_eq!(unused(&s), vec![("b_two", UnusedKind::Import)]);
}
