//! Loading service files into a container.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use wirecfg_tree::{Mapping, Value};

use crate::container::ContainerBuilder;
use crate::error::{DeprecationLog, ErrorKind, LoadError, Scope};
use crate::locator::FileLocator;
use crate::options::LoaderOptions;
use crate::parser::{DefinitionParser, LoadState};
use crate::registrar::{ClassRegistrar, GlobClassRegistrar};
use crate::resolve::ReferenceResolver;

/// Top-level keys that are not extension namespaces.
const RESERVED_KEYS: &[&str] = &["imports", "parameters", "services"];

/// Holds the load state for one services pass and clears it when dropped.
struct StateGuard<'s> {
    state: &'s mut LoadState,
}

impl<'s> StateGuard<'s> {
    fn new(state: &'s mut LoadState, current_dir: Option<&Path>) -> Self {
        state.current_dir = current_dir.map(Path::to_path_buf);
        Self { state }
    }
}

impl Deref for StateGuard<'_> {
    type Target = LoadState;

    fn deref(&self) -> &LoadState {
        self.state
    }
}

impl DerefMut for StateGuard<'_> {
    fn deref_mut(&mut self) -> &mut LoadState {
        self.state
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        self.state.reset();
    }
}

/// Loads YAML service files into a [`ContainerBuilder`].
///
/// A load runs in this order: check that every non-reserved top-level key names a registered
/// extension, follow `imports`, set `parameters`, hand extension blocks to their extensions,
/// then parse `services` (`_instanceof` first, then `_defaults`, then every entry in document
/// order).
///
/// ```
/// use wirecfg::{ContainerBuilder, YamlFileLoader};
///
/// let mut container = ContainerBuilder::new();
/// YamlFileLoader::new(&mut container)
///     .load_source("services:\n    mailer: '@app.mailer'\n", "services.yaml")
///     .unwrap();
/// assert_eq!(container.alias("mailer").map(|a| a.target.as_str()), Some("app.mailer"));
/// ```
pub struct YamlFileLoader<'c> {
    container: &'c mut ContainerBuilder,
    options: LoaderOptions,
    locator: FileLocator,
    registrar: Box<dyn ClassRegistrar>,
    state: LoadState,
    log: DeprecationLog,
    import_stack: Vec<PathBuf>,
}

impl<'c> YamlFileLoader<'c> {
    pub fn new(container: &'c mut ContainerBuilder) -> Self {
        Self::with_options(container, LoaderOptions::default())
    }

    pub fn with_options(container: &'c mut ContainerBuilder, options: LoaderOptions) -> Self {
        Self {
            container,
            locator: FileLocator::new(options.search_paths.iter().cloned()),
            log: DeprecationLog::new(options.deprecations),
            options,
            registrar: Box::new(GlobClassRegistrar::new()),
            state: LoadState::default(),
            import_stack: Vec::new(),
        }
    }

    /// Use a different class registrar for `resource` prototypes.
    pub fn with_registrar(mut self, registrar: impl ClassRegistrar + 'static) -> Self {
        self.registrar = Box::new(registrar);
        self
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    pub fn container(&self) -> &ContainerBuilder {
        self.container
    }

    /// Whether this loader handles `resource` of the given type.
    pub fn supports(&self, resource: &str, kind: Option<&str>) -> bool {
        match kind {
            Some(kind) => kind == "yaml" || kind == "yml",
            None => Path::new(resource)
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| self.options.accepts_extension(e)),
        }
    }

    /// Locate, read and load a service file.
    pub fn load(&mut self, resource: &str) -> Result<(), LoadError> {
        let result = self.load_resource(resource, None);
        self.flush_deprecations();
        result
    }

    /// Load YAML text as if it had been read from `file`.
    pub fn load_source(&mut self, source: &str, file: &str) -> Result<(), LoadError> {
        let result = wirecfg_tree::parse(source)
            .map_err(|e| LoadError::syntax(e, file))
            .and_then(|document| self.run_document(&document, file, parent_dir(file)));
        self.flush_deprecations();
        result
    }

    /// Load an already parsed document as if it had been read from `file`.
    pub fn load_document(&mut self, document: &Value, file: &str) -> Result<(), LoadError> {
        let result = self.run_document(document, file, parent_dir(file));
        self.flush_deprecations();
        result
    }

    fn flush_deprecations(&mut self) {
        let records = self.log.take();
        self.container.add_deprecations(records);
    }

    fn load_resource(&mut self, resource: &str, current_dir: Option<&Path>) -> Result<(), LoadError> {
        let path = self.locator.locate(resource, current_dir)?;
        let key = path.canonicalize().unwrap_or_else(|_| path.clone());
        if let Some(start) = self.import_stack.iter().position(|p| *p == key) {
            let chain: Vec<String> = self.import_stack[start..]
                .iter()
                .chain(std::iter::once(&key))
                .map(|p| format!("\"{}\"", p.display()))
                .collect();
            return Err(LoadError::new(
                ErrorKind::CircularImport,
                format!(
                    "Circular reference detected in \"{resource}\" ({}).",
                    chain.join(" > ")
                ),
            ));
        }

        let file = path.display().to_string();
        debug!(file, "loading service file");
        let source = std::fs::read_to_string(&path).map_err(|e| {
            LoadError::new(ErrorKind::Io, format!("Cannot read \"{file}\": {e}")).in_file(&file)
        })?;
        let document = wirecfg_tree::parse(&source).map_err(|e| LoadError::syntax(e, &file))?;
        self.container.add_resource(&path);

        self.import_stack.push(key);
        let result = self.run_document(&document, &file, path.parent());
        self.import_stack.pop();
        result
    }

    fn run_document(
        &mut self,
        document: &Value,
        file: &str,
        dir: Option<&Path>,
    ) -> Result<(), LoadError> {
        let content = match document {
            Value::Null => return Ok(()),
            Value::Mapping(content) => content,
            other => {
                return Err(LoadError::new(
                    ErrorKind::InvalidDocument,
                    format!(
                        "The service file \"{file}\" is not valid. It should contain a mapping, \
                         found {}. Check your YAML syntax.",
                        other.type_name()
                    ),
                )
                .in_file(file));
            }
        };

        self.validate_namespaces(content, file)?;

        if let Some(imports) = content.get("imports") {
            self.parse_imports(imports, file, dir)?;
        }
        if let Some(parameters) = content.get("parameters") {
            self.parse_parameters(parameters, file)?;
        }
        self.load_extensions(content, file)?;

        let Some(services) = content.get("services") else {
            return Ok(());
        };
        let mut state = StateGuard::new(&mut self.state, dir);
        DefinitionParser {
            container: &mut *self.container,
            registrar: self.registrar.as_ref(),
            state: &mut state,
            log: &mut self.log,
            file,
        }
        .parse_services(services)
    }

    fn validate_namespaces(&self, content: &Mapping, file: &str) -> Result<(), LoadError> {
        for key in content.keys() {
            let namespace = key.to_string();
            if RESERVED_KEYS.contains(&namespace.as_str()) || self.container.has_extension(&namespace)
            {
                continue;
            }
            let available: Vec<String> = self
                .container
                .extension_aliases()
                .into_iter()
                .map(str::to_owned)
                .collect();
            let found = if available.is_empty() {
                "none".to_owned()
            } else {
                format!("\"{}\"", available.join("\", \""))
            };
            let message = format!(
                "There is no extension able to load the configuration for \"{namespace}\" (in \
                 {file}). Looked for namespace \"{namespace}\", found {found}."
            );
            return Err(LoadError::new(
                ErrorKind::UnknownExtension {
                    namespace,
                    available,
                },
                message,
            )
            .in_file(file));
        }
        Ok(())
    }

    fn parse_imports(
        &mut self,
        imports: &Value,
        file: &str,
        dir: Option<&Path>,
    ) -> Result<(), LoadError> {
        let invalid = |message: String| {
            LoadError::new(ErrorKind::InvalidDocument, message).in_file(file)
        };
        if imports.is_null() {
            return Ok(());
        }
        if !imports.is_collection() {
            return Err(invalid(format!(
                "The \"imports\" key should contain a sequence in {file}. Check your YAML syntax."
            )));
        }

        for (_, import) in imports.iter_keyed() {
            let (resource, kind, ignore_errors) = match import {
                Value::String(resource) => (resource.as_str(), None, false),
                Value::Mapping(import) => {
                    let Some(Value::String(resource)) = import.get("resource") else {
                        return Err(invalid(format!(
                            "An import must have a string \"resource\" key in {file}. Check your \
                             YAML syntax."
                        )));
                    };
                    let kind = match import.get("type") {
                        None | Some(Value::Null) => None,
                        Some(Value::String(kind)) => Some(kind.as_str()),
                        Some(other) => {
                            return Err(invalid(format!(
                                "The \"type\" of an import must be a string, found {} in {file}.",
                                other.type_name()
                            )));
                        }
                    };
                    let ignore_errors = match import.get("ignore_errors") {
                        None | Some(Value::Null) => false,
                        Some(Value::Bool(ignore)) => *ignore,
                        Some(other) => {
                            return Err(invalid(format!(
                                "The \"ignore_errors\" option of an import must be a boolean, \
                                 found {} in {file}.",
                                other.type_name()
                            )));
                        }
                    };
                    (resource.as_str(), kind, ignore_errors)
                }
                _ => {
                    return Err(invalid(format!(
                        "The values in the \"imports\" key should be mappings in {file}. Check \
                         your YAML syntax."
                    )));
                }
            };
            self.import(resource, kind, ignore_errors, file, dir)?;
        }
        Ok(())
    }

    fn import(
        &mut self,
        resource: &str,
        kind: Option<&str>,
        ignore_errors: bool,
        file: &str,
        dir: Option<&Path>,
    ) -> Result<(), LoadError> {
        debug!(resource, file, "importing");
        let result = if self.supports(resource, kind) {
            self.load_resource(resource, dir)
        } else {
            Err(LoadError::new(
                ErrorKind::Import,
                format!(
                    "Cannot import resource \"{resource}\" from \"{file}\": no loader supports \
                     it."
                ),
            ))
        };

        match result {
            Err(error) if ignore_errors && error.kind != ErrorKind::CircularImport => {
                warn!(resource, file, %error, "ignoring failed import");
                Ok(())
            }
            Err(error) if error.file.is_none() => Err(error.in_file(file)),
            result => result,
        }
    }

    fn parse_parameters(&mut self, parameters: &Value, file: &str) -> Result<(), LoadError> {
        if parameters.is_null() {
            return Ok(());
        }
        if !parameters.is_collection() {
            return Err(LoadError::new(
                ErrorKind::InvalidDocument,
                format!(
                    "The \"parameters\" key should contain a mapping in {file}. Check your YAML \
                     syntax."
                ),
            )
            .in_file(file));
        }

        for (key, value) in parameters.iter_keyed() {
            let name = key.to_string();
            let resolved =
                ReferenceResolver::new(Scope::parameter(&name, file), &mut self.log).resolve(value)?;
            self.container.set_parameter(name, resolved);
        }
        Ok(())
    }

    fn load_extensions(&mut self, content: &Mapping, file: &str) -> Result<(), LoadError> {
        for (key, values) in content.iter() {
            let namespace = key.to_string();
            if RESERVED_KEYS.contains(&namespace.as_str()) {
                continue;
            }
            let config = if values.is_collection() {
                values.clone()
            } else {
                Value::Mapping(Mapping::new())
            };
            debug!(namespace, file, "dispatching extension configuration");
            self.container
                .load_from_extension(&namespace, config)
                .map_err(|e| {
                    LoadError::new(
                        ErrorKind::Extension {
                            namespace: namespace.clone(),
                        },
                        format!("The \"{namespace}\" extension rejected its configuration in {file}: {e}"),
                    )
                    .in_file(file)
                })?;
        }
        Ok(())
    }
}

/// Directory of `file`, if it has a non-empty one.
fn parent_dir(file: &str) -> Option<&Path> {
    Path::new(file)
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::Definition;

    #[test]
    fn test_supports() {
        let mut container = ContainerBuilder::new();
        let loader = YamlFileLoader::new(&mut container);
        assert!(loader.supports("services.yaml", None));
        assert!(loader.supports("services.yml", None));
        assert!(!loader.supports("services.YAML", None));
        assert!(!loader.supports("services.xml", None));
        assert!(loader.supports("services.xml", Some("yaml")));
        assert!(loader.supports("services", Some("yml")));
        assert!(!loader.supports("services.yaml", Some("xml")));
    }

    #[test]
    fn test_custom_extensions() {
        let mut container = ContainerBuilder::new();
        let loader = YamlFileLoader::with_options(
            &mut container,
            LoaderOptions::new().extensions(["services"]),
        );
        assert!(loader.supports("app.services", None));
        assert!(!loader.supports("app.yaml", None));
    }

    #[test]
    fn test_state_guard_resets_on_drop() {
        let mut state = LoadState::default();
        {
            let mut guard = StateGuard::new(&mut state, Some(Path::new("/etc/app")));
            assert_eq!(guard.current_dir.as_deref(), Some(Path::new("/etc/app")));
            guard.loading_instanceof = true;
            guard
                .instanceof
                .insert("App\\Handler".into(), Definition::standalone());
        }
        assert!(state.instanceof.is_empty());
        assert!(!state.loading_instanceof);
        assert_eq!(state.current_dir, None);
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("services.yaml"), None);
        assert_eq!(parent_dir("config/services.yaml"), Some(Path::new("config")));
    }
}
