//! In-memory registry of everything a load produces.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::debug;
use wirecfg_tree::Value;

use crate::argument::Argument;
use crate::definition::{Alias, Definition};
use crate::error::Deprecation;
use crate::extension::{Extension, ExtensionError};

/// Definitions, aliases and parameters, in registration order.
#[derive(Default)]
pub struct ContainerBuilder {
    definitions: IndexMap<String, Definition>,
    aliases: IndexMap<String, Alias>,
    parameters: IndexMap<String, Argument>,
    resources: Vec<PathBuf>,
    extensions: Vec<Box<dyn Extension>>,
    extension_configs: IndexMap<String, Vec<Value>>,
    deprecations: Vec<Deprecation>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition, replacing any alias with the same id.
    pub fn set_definition(&mut self, id: impl Into<String>, definition: Definition) {
        let id = id.into();
        debug!(%id, "registering definition");
        self.aliases.shift_remove(&id);
        self.definitions.insert(id, definition);
    }

    /// Register an alias, replacing any definition with the same id.
    pub fn set_alias(&mut self, id: impl Into<String>, alias: Alias) {
        let id = id.into();
        debug!(%id, target = %alias.target, "registering alias");
        self.definitions.shift_remove(&id);
        self.aliases.insert(id, alias);
    }

    pub fn definition(&self, id: &str) -> Option<&Definition> {
        self.definitions.get(id)
    }

    pub fn has_definition(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    pub fn definitions(&self) -> impl Iterator<Item = (&str, &Definition)> {
        self.definitions.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn alias(&self, id: &str) -> Option<&Alias> {
        self.aliases.get(id)
    }

    pub fn aliases(&self) -> impl Iterator<Item = (&str, &Alias)> {
        self.aliases.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn set_parameter(&mut self, name: impl Into<String>, value: Argument) {
        self.parameters.insert(name.into(), value);
    }

    pub fn parameter(&self, name: &str) -> Option<&Argument> {
        self.parameters.get(name)
    }

    pub fn parameters(&self) -> impl Iterator<Item = (&str, &Argument)> {
        self.parameters.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Remember a file that contributed to this container.
    pub fn add_resource(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        if !self.resources.iter().any(|p| p == path) {
            self.resources.push(path.to_path_buf());
        }
    }

    pub fn resources(&self) -> &[PathBuf] {
        &self.resources
    }

    pub fn register_extension(&mut self, extension: Box<dyn Extension>) {
        self.extensions.push(extension);
    }

    pub fn has_extension(&self, namespace: &str) -> bool {
        self.extensions.iter().any(|e| e.alias() == namespace)
    }

    /// Aliases of all registered extensions, in registration order.
    pub fn extension_aliases(&self) -> Vec<&str> {
        self.extensions.iter().map(|e| e.alias()).collect()
    }

    /// Hand a configuration block to the extension registered for `namespace`.
    pub fn load_from_extension(
        &mut self,
        namespace: &str,
        config: Value,
    ) -> Result<(), ExtensionError> {
        let extension = self
            .extensions
            .iter_mut()
            .find(|e| e.alias() == namespace)
            .ok_or_else(|| {
                ExtensionError::new(format!("No extension is registered for \"{namespace}\"."))
            })?;
        extension.load(&config)?;
        self.extension_configs
            .entry(namespace.to_owned())
            .or_default()
            .push(config);
        Ok(())
    }

    /// Blocks received by the extension for `namespace`, in load order.
    pub fn extension_config(&self, namespace: &str) -> &[Value] {
        self.extension_configs
            .get(namespace)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn add_deprecations(&mut self, deprecations: impl IntoIterator<Item = Deprecation>) {
        self.deprecations.extend(deprecations);
    }

    /// Deprecations reported by every load into this container.
    pub fn deprecations(&self) -> &[Deprecation] {
        &self.deprecations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::PassthroughExtension;

    #[test]
    fn test_alias_and_definition_replace_each_other() {
        let mut container = ContainerBuilder::new();
        container.set_alias("mailer", Alias::new("app.mailer", true));
        container.set_definition("mailer", Definition::standalone());
        assert!(container.alias("mailer").is_none());
        assert!(container.has_definition("mailer"));

        container.set_alias("mailer", Alias::new("app.mailer", false));
        assert!(!container.has_definition("mailer"));
        assert_eq!(container.alias("mailer"), Some(&Alias::new("app.mailer", false)));
    }

    #[test]
    fn test_registration_order() {
        let mut container = ContainerBuilder::new();
        for id in ["c", "a", "b"] {
            container.set_definition(id, Definition::standalone());
        }
        let ids: Vec<&str> = container.definitions().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_extensions() {
        let mut container = ContainerBuilder::new();
        assert!(!container.has_extension("framework"));
        container.register_extension(Box::new(PassthroughExtension::new("framework")));
        assert!(container.has_extension("framework"));
        assert_eq!(container.extension_aliases(), vec!["framework"]);

        container
            .load_from_extension("framework", Value::from("first"))
            .unwrap();
        container
            .load_from_extension("framework", Value::from("second"))
            .unwrap();
        assert_eq!(
            container.extension_config("framework"),
            &[Value::from("first"), Value::from("second")]
        );
        assert!(container.extension_config("twig").is_empty());
        assert!(container.load_from_extension("twig", Value::Null).is_err());
    }

    #[test]
    fn test_resources_are_unique() {
        let mut container = ContainerBuilder::new();
        container.add_resource("/etc/app/services.yaml");
        container.add_resource("/etc/app/services.yaml");
        assert_eq!(container.resources().len(), 1);
    }
}
