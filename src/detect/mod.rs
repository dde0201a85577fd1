//! Findings derived from extracted facts.
//!
//! Every pass here works on the stripped working copy produced by
//! [`strip`], never on raw text, so literals and comments cannot produce
//! false matches. Dependency and usage passes touch the filesystem; all
//! others are pure.

mod dependencies;
mod hardcoded;
pub mod imports;
pub mod manifest;
mod markers;
mod overview;
mod runner;
pub mod stdlib;
pub mod strip;
mod types;
mod unused;
mod usage;

pub use dependencies::resolve_dependencies;
pub use hardcoded::detect_hardcoded;
pub use imports::{external_imports, install_hint, ExternalImport};
pub use markers::detect_markers;
pub use overview::summarize;
pub use runner::{FileReport, Runner};
pub use strip::{strip_source, Stripped};
pub use types::{
    DependencyIssue, DependencyStatus, ExternalUsage, HardcodedKind, HardcodedValue, MarkerComment,
    MarkerKind, UnusedItem, UnusedKind,
};
pub use unused::detect_unused;
pub use usage::{find_external_usages, public_symbols, SKIPPED_DIRS};
