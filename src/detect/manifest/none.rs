//! Provider used when no manifest could be found or read.

use std::path::Path;

use super::ManifestProvider;

/// Declares nothing; dependency status falls back to install dirs and verification.
pub struct NoManifest;

impl NoManifest {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoManifest {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestProvider for NoManifest {
    fn declares(&self, _package: &str) -> bool {
        false
    }

    fn declared_packages(&self) -> Vec<String> {
        Vec::new()
    }

    fn root(&self) -> Option<&Path> {
        None
    }
}
