//! Configuration extensions.

use std::fmt;

use wirecfg_tree::Value;

/// Consumes the configuration found under one top-level namespace.
pub trait Extension {
    /// Namespace this extension answers to.
    fn alias(&self) -> &str;

    /// Receive one configuration block.
    fn load(&mut self, config: &Value) -> Result<(), ExtensionError>;
}

/// An extension rejected its configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionError {
    pub message: String,
}

impl ExtensionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ExtensionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ExtensionError {}

/// Extension that accepts any configuration; the container keeps the blocks it receives.
#[derive(Debug, Clone)]
pub struct PassthroughExtension {
    alias: String,
}

impl PassthroughExtension {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
        }
    }
}

impl Extension for PassthroughExtension {
    fn alias(&self) -> &str {
        &self.alias
    }

    fn load(&mut self, _config: &Value) -> Result<(), ExtensionError> {
        Ok(())
    }
}
