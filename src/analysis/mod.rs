//! Heuristic structural extraction.
//!
//! No parser is involved: each language family has an extractor that walks
//! raw lines with depth or indentation counters and produces [`FileFacts`].
//!
//! ```text
//! ┌──────────────┐     ┌──────────────────┐     ┌───────────────┐
//! │ Source lines │────▶│ Extractor table  │────▶│ FileFacts     │
//! └──────────────┘     │ (python, js/ts,  │     │ (imports,     │
//!                      │  php, html)      │     │  types, ...)  │
//!                      └──────────────────┘     └───────────────┘
//! ```
//!
//! # Adding a New Language
//!
//! 1. Create a module in `src/analysis/languages/` exposing `fn(&[&str]) -> FileFacts`
//! 2. Add a `Language` variant and its tags
//! 3. Register the function in the extractor table in `languages/mod.rs`

pub mod annotation;
mod facts;
pub mod languages;
pub mod scan;

pub use annotation::{read_annotation, AnnotationBlock};
pub use facts::{Callable, FileFacts, ImportDecl, Port, StructuralSummary, TypeDecl, UNKNOWN_TYPE};
pub use languages::{extractor_for, Ecosystem, Extractor, Language};
