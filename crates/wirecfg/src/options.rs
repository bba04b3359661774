//! Loader options.

use std::path::PathBuf;

use crate::error::Severity;

/// Options for [`YamlFileLoader`](crate::YamlFileLoader).
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// File suffixes the loader claims when no type is given (default: `yml`, `yaml`).
    /// Matching is case-sensitive.
    pub extensions: Vec<String>,

    /// What to do with deprecations (default: warn).
    pub deprecations: Severity,

    /// Directories searched for relative resources after the current directory.
    pub search_paths: Vec<PathBuf>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["yml".to_owned(), "yaml".to_owned()],
            deprecations: Severity::Warn,
            search_paths: Vec::new(),
        }
    }
}

impl LoaderOptions {
    /// Create new default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the accepted file suffixes.
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Set how deprecations are handled.
    pub fn deprecations(mut self, severity: Severity) -> Self {
        self.deprecations = severity;
        self
    }

    /// Add a directory to search for relative resources.
    pub fn search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    /// Whether `extension` is one of the accepted suffixes.
    pub fn accepts_extension(&self, extension: &str) -> bool {
        self.extensions.iter().any(|e| e == extension)
    }
}
