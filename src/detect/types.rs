//! Finding types attached to a structural summary.
//!
//! Findings are informational: none of them is an error of the analysis
//! itself.

use serde::{Deserialize, Serialize};

/// Category of a hardcoded literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardcodedKind {
    Credential,
    Url,
    Ip,
    Path,
    Number,
    String,
}

impl HardcodedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HardcodedKind::Credential => "credential",
            HardcodedKind::Url => "url",
            HardcodedKind::Ip => "ip",
            HardcodedKind::Path => "path",
            HardcodedKind::Number => "number",
            HardcodedKind::String => "string",
        }
    }
}

impl std::fmt::Display for HardcodedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A literal that looks like configuration baked into code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardcodedValue {
    pub value: String,
    pub kind: HardcodedKind,
    pub line_number: usize,
    /// Assignment target (or a fixed label), truncated.
    pub context: String,
}

/// Category of an unreferenced symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnusedKind {
    Import,
    Callable,
    Variable,
}

impl UnusedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnusedKind::Import => "import",
            UnusedKind::Callable => "callable",
            UnusedKind::Variable => "variable",
        }
    }
}

impl std::fmt::Display for UnusedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnusedItem {
    pub name: String,
    pub kind: UnusedKind,
    pub line_number: usize,
}

/// Resolution outcome of an external dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyStatus {
    Installed,
    Missing,
    Unknown,
}

impl DependencyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyStatus::Installed => "installed",
            DependencyStatus::Missing => "missing",
            DependencyStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for DependencyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyIssue {
    /// Normalized package name.
    pub name: String,
    pub status: DependencyStatus,
    pub line_number: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_hint: Option<String>,
}

/// Tag of a marker comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarkerKind {
    Todo,
    Fixme,
    Hack,
    Bug,
    Note,
    Xxx,
}

impl MarkerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerKind::Todo => "TODO",
            MarkerKind::Fixme => "FIXME",
            MarkerKind::Hack => "HACK",
            MarkerKind::Bug => "BUG",
            MarkerKind::Note => "NOTE",
            MarkerKind::Xxx => "XXX",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "TODO" => Some(MarkerKind::Todo),
            "FIXME" => Some(MarkerKind::Fixme),
            "HACK" => Some(MarkerKind::Hack),
            "BUG" => Some(MarkerKind::Bug),
            "NOTE" => Some(MarkerKind::Note),
            "XXX" => Some(MarkerKind::Xxx),
            _ => None,
        }
    }
}

impl std::fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerComment {
    pub text: String,
    pub kind: MarkerKind,
    pub line_number: usize,
}

/// A reference to one of a file's public symbols from another file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalUsage {
    pub symbol: String,
    pub file: String,
    pub line_number: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_serialize_lowercase() {
        let v = HardcodedValue {
            value: "s3cr3t".into(),
            kind: HardcodedKind::Credential,
            line_number: 5,
            context: "password".into(),
        };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["kind"], "credential");
        assert_eq!(json["lineNumber"], 5);

        let m = MarkerComment {
            text: "fix later".into(),
            kind: MarkerKind::Fixme,
            line_number: 1,
        };
        assert_eq!(serde_json::to_value(&m).unwrap()["kind"], "FIXME");
    }

    #[test]
    fn test_install_hint_omitted_when_absent() {
        let issue = DependencyIssue {
            name: "requests".into(),
            status: DependencyStatus::Unknown,
            line_number: 1,
            install_hint: None,
        };
        let json = serde_json::to_string(&issue).unwrap();
        assert!(!json.contains("installHint"));
        assert!(json.contains("\"status\":\"unknown\""));
    }

    #[test]
    fn test_marker_parse() {
        assert_eq!(MarkerKind::parse("todo"), Some(MarkerKind::Todo));
        assert_eq!(MarkerKind::parse("later"), None);
    }
}
