//! Service definition parsing.
//!
//! [`DefinitionParser`] walks the `services` mapping of one document. Each entry is normalized
//! to one of three shapes (alias shorthand, short argument list, full keyword mapping) and
//! then registered as an alias, a definition, or a batch of definitions for a `resource` glob.

use std::borrow::Cow;
use std::path::PathBuf;

use indexmap::IndexMap;
use tracing::debug;
use wirecfg_tree::{Key, Mapping, Value};

use crate::argument::Argument;
use crate::callable::parse_callable;
use crate::container::ContainerBuilder;
use crate::defaults::{Defaults, parse_defaults};
use crate::definition::{
    Alias, Autowire, Decoration, Definition, DefinitionKind, Deprecated, MethodCall,
};
use crate::error::{DeprecationKind, DeprecationLog, ErrorKind, LoadError, Scope};
use crate::keywords::{Context, suggest_similar};
use crate::registrar::ClassRegistrar;
use crate::resolve::ReferenceResolver;
use crate::tags::{TagOwner, parse_tags};

/// State that lives for one load and must be cleared afterwards.
#[derive(Debug, Default)]
pub(crate) struct LoadState {
    /// `_instanceof` fragments of the document being loaded.
    pub instanceof: IndexMap<String, Definition>,
    /// Set while the `_instanceof` block is parsed.
    pub loading_instanceof: bool,
    /// Directory of the document being loaded.
    pub current_dir: Option<PathBuf>,
}

impl LoadState {
    pub fn reset(&mut self) {
        self.instanceof.clear();
        self.loading_instanceof = false;
        self.current_dir = None;
    }
}

pub(crate) struct DefinitionParser<'p> {
    pub container: &'p mut ContainerBuilder,
    pub registrar: &'p dyn ClassRegistrar,
    pub state: &'p mut LoadState,
    pub log: &'p mut DeprecationLog,
    pub file: &'p str,
}

/// Value of `key`, treating `null` as absent.
fn field<'v>(entry: &'v Mapping, key: &str) -> Option<&'v Value> {
    entry.get(key).filter(|v| !v.is_null())
}

fn invalid_value(key: &str, expected: &str, found: &Value, scope: Scope<'_>) -> LoadError {
    scope.error(
        ErrorKind::InvalidValue {
            key: key.to_owned(),
        },
        format!(
            "Parameter \"{key}\" must be {expected}, found {} for {scope}. Check your YAML syntax.",
            found.type_name()
        ),
    )
}

fn bool_field(entry: &Mapping, key: &str, scope: Scope<'_>) -> Result<Option<bool>, LoadError> {
    match field(entry, key) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(invalid_value(key, "a boolean", other, scope)),
    }
}

fn string_field(entry: &Mapping, key: &str, scope: Scope<'_>) -> Result<Option<String>, LoadError> {
    match field(entry, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(invalid_value(key, "a string", other, scope)),
    }
}

/// Ids such as `_foo` are reserved.
fn is_reserved_id(id: &str) -> bool {
    id.strip_prefix('_').is_some_and(|rest| {
        rest.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
    })
}

/// A collection whose keys are all positions or `$name`s is an argument list.
fn is_short_syntax(value: &Value) -> bool {
    match value {
        Value::Sequence(_) => true,
        Value::Mapping(mapping) => mapping.keys().all(|key| match key {
            Key::Index(_) => true,
            Key::Name(name) => name.starts_with('$'),
        }),
        _ => false,
    }
}

/// `Vendor\Package\` style namespace prefix.
fn is_namespace_prefix(namespace: &str) -> bool {
    let Some(body) = namespace.strip_suffix('\\') else {
        return false;
    };
    body.split('\\').all(|segment| {
        let mut chars = segment.chars();
        chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || !c.is_ascii())
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || !c.is_ascii())
    })
}

fn parse_deprecated(value: &Value, scope: Scope<'_>) -> Result<Deprecated, LoadError> {
    match value {
        Value::Null | Value::Bool(_) => Ok(Deprecated::default()),
        Value::String(template) => {
            if template.contains(['\r', '\n']) {
                return Err(scope.error(
                    ErrorKind::InvalidValue {
                        key: "deprecated".into(),
                    },
                    format!("Invalid characters found in deprecation template for {scope}."),
                ));
            }
            if !template.contains("%service_id%") {
                return Err(scope.error(
                    ErrorKind::InvalidValue {
                        key: "deprecated".into(),
                    },
                    format!(
                        "The deprecation template must contain the \"%service_id%\" placeholder \
                         for {scope}."
                    ),
                ));
            }
            Ok(Deprecated {
                template: template.clone(),
            })
        }
        other => Err(invalid_value(
            "deprecated",
            "a string or a boolean",
            other,
            scope,
        )),
    }
}

impl DefinitionParser<'_> {
    /// Parse the value of the top-level `services` key.
    pub fn parse_services(&mut self, services: &Value) -> Result<(), LoadError> {
        let services = match services {
            Value::Null => return Ok(()),
            Value::Sequence(items) if items.is_empty() => return Ok(()),
            Value::Mapping(mapping) => mapping,
            _ => {
                return Err(LoadError::new(
                    ErrorKind::InvalidDocument,
                    format!(
                        "The \"services\" key should contain a mapping in {}. Check your YAML \
                         syntax.",
                        self.file
                    ),
                )
                .in_file(self.file));
            }
        };

        if let Some(instanceof) = field(services, "_instanceof") {
            self.parse_instanceof(instanceof)?;
        }
        self.state.loading_instanceof = false;

        let defaults = match services.get("_defaults") {
            Some(raw) => parse_defaults(raw, self.file)?,
            None => Defaults::default(),
        };

        for (key, entry) in services.iter() {
            if matches!(key, Key::Name(name) if name == "_instanceof" || name == "_defaults") {
                continue;
            }
            self.parse_definition(&key.to_string(), entry, &defaults)?;
        }
        Ok(())
    }

    fn parse_instanceof(&mut self, raw: &Value) -> Result<(), LoadError> {
        let file = self.file;
        let Some(fragments) = raw.as_mapping() else {
            return Err(LoadError::new(
                ErrorKind::InvalidDocument,
                format!(
                    "Service \"_instanceof\" key must be a mapping, {} given in \"{file}\".",
                    raw.type_name()
                ),
            )
            .in_file(file));
        };

        self.state.instanceof.clear();
        self.state.loading_instanceof = true;
        let no_defaults = Defaults::default();
        for (key, entry) in fragments.iter() {
            let id = key.to_string();
            if entry.as_str().is_some_and(|s| s.starts_with('@')) {
                return Err(Scope::service(&id, file).error(
                    ErrorKind::InvalidService,
                    format!(
                        "Type definition \"{id}\" cannot be an alias within \"_instanceof\" in \
                         {file}. Check your YAML syntax."
                    ),
                ));
            }
            if entry.collection_len().unwrap_or(0) == 0 {
                return Err(Scope::service(&id, file).error(
                    ErrorKind::InvalidService,
                    format!(
                        "Type definition \"{id}\" must be a non-empty array within \
                         \"_instanceof\" in {file}. Check your YAML syntax."
                    ),
                ));
            }
            self.parse_definition(&id, entry, &no_defaults)?;
        }
        self.state.loading_instanceof = false;
        Ok(())
    }

    /// Parse one service entry and register what it declares.
    pub fn parse_definition(
        &mut self,
        id: &str,
        raw: &Value,
        defaults: &Defaults,
    ) -> Result<(), LoadError> {
        let file = self.file;
        let scope = Scope::service(id, file);
        debug!(id, file, "parsing service");

        if is_reserved_id(id) {
            self.log.report(scope.deprecation(
                DeprecationKind::ReservedId,
                format!(
                    "Service names that start with an underscore are deprecated and will be \
                     reserved in the future. Rename the \"{id}\" service."
                ),
            ))?;
        }

        if let Some(target) = raw.as_str().and_then(|s| s.strip_prefix('@')) {
            return self.set_alias(id, target, defaults.public.unwrap_or(true), scope);
        }

        let entry: Cow<'_, Mapping> = match raw {
            _ if is_short_syntax(raw) => Cow::Owned(Mapping::from_iter([("arguments", raw.clone())])),
            Value::Mapping(mapping) => Cow::Borrowed(mapping),
            Value::Null => Cow::Owned(Mapping::new()),
            other => {
                return Err(scope.error(
                    ErrorKind::InvalidService,
                    format!(
                        "A service definition must be a mapping or a string starting with \"@\" \
                         but {} found for {scope}. Check your YAML syntax.",
                        other.type_name()
                    ),
                ));
            }
        };

        self.check_keywords(id, &entry, scope)?;

        if let Some(target) = field(&entry, "alias") {
            return self.parse_alias(id, target, &entry, defaults, scope);
        }

        let no_defaults = Defaults::default();
        let (mut definition, defaults) = if self.state.loading_instanceof {
            (Definition::new(DefinitionKind::Instanceof), &no_defaults)
        } else if let Some(parent) = string_field(&entry, "parent", scope)? {
            let inherit_tags = bool_field(&entry, "inherit_tags", scope)?.unwrap_or(false);
            (
                Definition::new(DefinitionKind::Child {
                    parent,
                    inherit_tags,
                }),
                &no_defaults,
            )
        } else {
            (Definition::standalone(), defaults)
        };

        definition.class = string_field(&entry, "class", scope)?;
        definition.shared = bool_field(&entry, "shared", scope)?;
        definition.synthetic = bool_field(&entry, "synthetic", scope)?;
        definition.lazy = bool_field(&entry, "lazy", scope)?;
        definition.public = bool_field(&entry, "public", scope)?.or(defaults.public);
        definition.is_abstract = bool_field(&entry, "abstract", scope)?;
        if let Some(deprecated) = entry.get("deprecated") {
            definition.deprecated = Some(parse_deprecated(deprecated, scope)?);
        }
        if let Some(factory) = field(&entry, "factory") {
            definition.factory = Some(parse_callable(factory, "factory", scope, self.log)?);
        }
        definition.file = string_field(&entry, "file", scope)?;
        definition.arguments = self.resolve_list(&entry, "arguments", scope)?;
        definition.properties = self.resolve_list(&entry, "properties", scope)?;
        if let Some(configurator) = field(&entry, "configurator") {
            definition.configurator =
                Some(parse_callable(configurator, "configurator", scope, self.log)?);
        }
        definition.getters = self.resolve_list(&entry, "getters", scope)?;

        if let Some(calls) = field(&entry, "calls") {
            if !calls.is_collection() {
                return Err(invalid_value("calls", "an array", calls, scope));
            }
            for (_, call) in calls.iter_keyed() {
                let call = self.parse_call(call, scope)?;
                definition.calls.push(call);
            }
        }

        let own_tags = match field(&entry, "tags") {
            Some(tags) => Some(parse_tags(tags, TagOwner::Service(scope))?),
            None => None,
        };
        let inherit_tags = bool_field(&entry, "inherit_tags", scope)?.or(defaults.inherit_tags);
        definition.tags = match (&defaults.tags, inherit_tags) {
            (None, _) | (Some(_), Some(false)) => own_tags.unwrap_or_default(),
            (Some(default_tags), Some(true)) => own_tags
                .into_iter()
                .flatten()
                .chain(default_tags.iter().cloned())
                .collect(),
            (Some(default_tags), None) => own_tags.unwrap_or_else(|| default_tags.clone()),
        };

        if let Some(decorates) = field(&entry, "decorates") {
            definition.decoration = Some(self.parse_decoration(id, decorates, &entry, scope)?);
        }

        let autowire = field(&entry, "autowire").or(defaults.autowire.as_ref());
        definition.autowire = match autowire {
            None => None,
            Some(Value::Bool(flag)) => Some(Autowire::Flag(*flag)),
            Some(list) if list.is_collection() => {
                let calls = list
                    .iter_keyed()
                    .map(|(_, method)| {
                        method.as_str().map(str::to_owned).ok_or_else(|| {
                            invalid_value("autowire", "boolean or string[]", method, scope)
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                (!calls.is_empty()).then_some(Autowire::Calls(calls))
            }
            Some(other) => return Err(invalid_value("autowire", "boolean or string[]", other, scope)),
        };

        match field(&entry, "autowiring_types") {
            None => {}
            Some(Value::String(hint)) => definition.autowiring_types.push(hint.clone()),
            Some(hints) if hints.is_collection() => {
                for (_, hint) in hints.iter_keyed() {
                    let Value::String(hint) = hint else {
                        return Err(scope.error(
                            ErrorKind::InvalidValue {
                                key: "autowiring_types".into(),
                            },
                            format!(
                                "A \"autowiring_types\" attribute must be of type string for \
                                 {scope}. Check your YAML syntax."
                            ),
                        ));
                    };
                    definition.autowiring_types.push(hint.clone());
                }
            }
            Some(other) => {
                return Err(invalid_value(
                    "autowiring_types",
                    "a string or an array",
                    other,
                    scope,
                ));
            }
        }

        match entry.get("resource") {
            Some(Value::String(resource)) => self.register_classes(definition, id, resource, scope),
            Some(other) => Err(scope.error(
                ErrorKind::InvalidValue {
                    key: "resource".into(),
                },
                format!(
                    "A \"resource\" attribute must be of type string, found {} for {scope}. \
                     Check your YAML syntax.",
                    other.type_name()
                ),
            )),
            None => {
                self.set_definition(id, definition);
                Ok(())
            }
        }
    }

    fn check_keywords(
        &mut self,
        id: &str,
        entry: &Mapping,
        scope: Scope<'_>,
    ) -> Result<(), LoadError> {
        let context = if self.state.loading_instanceof {
            Context::Instanceof
        } else if entry.contains_key("resource") {
            Context::Prototype
        } else {
            Context::Service
        };
        let allowed = context.keywords();

        for key in entry.keys() {
            let key = key.to_string();
            if context.allows(&key) {
                continue;
            }
            let allowed_list = allowed.join("\", \"");
            if context.is_closed() {
                return Err(scope.error(
                    ErrorKind::UnsupportedKey {
                        suggestion: suggest_similar(&key, allowed),
                        allowed: allowed.to_vec(),
                        key: key.clone(),
                    },
                    format!(
                        "The configuration key \"{key}\" is unsupported for definition \"{id}\" in \
                         \"{}\". Allowed configuration keys are \"{allowed_list}\".",
                        self.file
                    ),
                ));
            }
            self.log.report(scope.deprecation(
                DeprecationKind::UnsupportedKey,
                format!(
                    "The configuration key \"{key}\" is unsupported for service definition \
                     \"{id}\" in \"{}\". Allowed configuration keys are \"{allowed_list}\".",
                    self.file
                ),
            ))?;
        }
        Ok(())
    }

    fn parse_alias(
        &mut self,
        id: &str,
        target: &Value,
        entry: &Mapping,
        defaults: &Defaults,
        scope: Scope<'_>,
    ) -> Result<(), LoadError> {
        let Value::String(target) = target else {
            return Err(scope.error(
                ErrorKind::InvalidAlias,
                format!(
                    "Parameter \"alias\" must be a string, found {} for {scope}. Check your YAML \
                     syntax.",
                    target.type_name()
                ),
            ));
        };
        let public = match entry.get("public") {
            None => defaults.public.unwrap_or(true),
            Some(Value::Bool(public)) => *public,
            Some(other) => return Err(invalid_value("public", "a boolean", other, scope)),
        };

        for key in entry.keys() {
            let key = key.to_string();
            if key == "alias" || key == "public" {
                continue;
            }
            self.log.report(scope.deprecation(
                DeprecationKind::AliasKey,
                format!(
                    "The configuration key \"{key}\" is unsupported for the service \"{id}\" \
                     which is defined as an alias in \"{}\". Allowed configuration keys for \
                     service aliases are \"alias\" and \"public\".",
                    self.file
                ),
            ))?;
        }

        self.set_alias(id, target, public, scope)
    }

    fn set_alias(
        &mut self,
        id: &str,
        target: &str,
        public: bool,
        scope: Scope<'_>,
    ) -> Result<(), LoadError> {
        if target == id {
            return Err(scope.error(
                ErrorKind::InvalidAlias,
                format!("An alias can not reference itself, got a circular reference on \"{id}\"."),
            ));
        }
        self.container.set_alias(id, Alias::new(target, public));
        Ok(())
    }

    /// Resolve a keyword holding an argument list or map.
    fn resolve_list(
        &mut self,
        entry: &Mapping,
        key: &str,
        scope: Scope<'_>,
    ) -> Result<Vec<(Key, Argument)>, LoadError> {
        match field(entry, key) {
            None => Ok(Vec::new()),
            Some(value) if value.is_collection() => {
                ReferenceResolver::new(scope, self.log).resolve_entries(value)
            }
            Some(other) => Err(invalid_value(key, "an array", other, scope)),
        }
    }

    fn parse_call(&mut self, call: &Value, scope: Scope<'_>) -> Result<MethodCall, LoadError> {
        let (method, arguments) = match call {
            Value::Mapping(mapping) if field(mapping, "method").is_some() => {
                (field(mapping, "method"), field(mapping, "arguments"))
            }
            Value::Sequence(_) | Value::Mapping(_) => (
                call.positional(0).filter(|v| !v.is_null()),
                call.positional(1).filter(|v| !v.is_null()),
            ),
            _ => (None, None),
        };

        let method = match method {
            Some(Value::String(method)) if !method.is_empty() => method.clone(),
            Some(Value::String(_)) => {
                return Err(scope.error(
                    ErrorKind::InvalidValue {
                        key: "calls".into(),
                    },
                    format!("Method name cannot be empty for {scope}."),
                ));
            }
            _ => {
                return Err(scope.error(
                    ErrorKind::InvalidValue {
                        key: "calls".into(),
                    },
                    format!(
                        "A \"calls\" entry must be a mapping with a \"method\" key or a \
                         [method, arguments] pair for {scope}. Check your YAML syntax."
                    ),
                ));
            }
        };

        let arguments = match arguments {
            None => Vec::new(),
            Some(arguments) if arguments.is_collection() => {
                ReferenceResolver::new(scope, self.log).resolve_entries(arguments)?
            }
            Some(_) => {
                return Err(scope.error(
                    ErrorKind::InvalidValue {
                        key: "calls".into(),
                    },
                    format!(
                        "The arguments of method call \"{method}\" must be an array for {scope}. \
                         Check your YAML syntax."
                    ),
                ));
            }
        };

        Ok(MethodCall { method, arguments })
    }

    fn parse_decoration(
        &mut self,
        id: &str,
        decorates: &Value,
        entry: &Mapping,
        scope: Scope<'_>,
    ) -> Result<Decoration, LoadError> {
        let Value::String(decorated) = decorates else {
            return Err(scope.error(
                ErrorKind::InvalidDecoration,
                format!(
                    "The \"decorates\" option must be a string, found {} for {scope}.",
                    decorates.type_name()
                ),
            ));
        };
        if let Some(stripped) = decorated.strip_prefix('@') {
            return Err(scope.error(
                ErrorKind::InvalidDecoration,
                format!(
                    "The value of the \"decorates\" option for the \"{id}\" service must be the id \
                     of the service without the \"@\" prefix (replace decorates: \"{decorated}\" \
                     with decorates: \"{stripped}\")."
                ),
            ));
        }

        let inner_name = string_field(entry, "decoration_inner_name", scope)?;
        if inner_name.as_deref() == Some(id) {
            return Err(scope.error(
                ErrorKind::InvalidDecoration,
                format!(
                    "The decorated service inner name for \"{id}\" must be different than the \
                     service name itself."
                ),
            ));
        }
        let priority = match field(entry, "decoration_priority") {
            None => 0,
            Some(Value::Int(priority)) => *priority,
            Some(other) => {
                return Err(invalid_value("decoration_priority", "an integer", other, scope));
            }
        };

        Ok(Decoration {
            decorated: decorated.clone(),
            inner_name,
            priority,
        })
    }

    /// Register one definition per class discovered for `resource`, each a copy of `prototype`.
    fn register_classes(
        &mut self,
        prototype: Definition,
        namespace: &str,
        resource: &str,
        scope: Scope<'_>,
    ) -> Result<(), LoadError> {
        if !namespace.ends_with('\\') {
            return Err(scope.error(
                ErrorKind::Resource,
                format!("Namespace prefix must end with a \"\\\": {namespace}."),
            ));
        }
        if !is_namespace_prefix(namespace) {
            return Err(scope.error(
                ErrorKind::Resource,
                format!("Namespace is not a valid PSR-4 prefix: {namespace}."),
            ));
        }

        let classes = self
            .registrar
            .discover(namespace, resource, self.state.current_dir.as_deref())
            .map_err(|e| {
                scope.error(
                    ErrorKind::Resource,
                    format!("Cannot discover classes for {scope}: {e}"),
                )
            })?;
        debug!(namespace, resource, count = classes.len(), "registering prototype");

        for class in classes {
            self.set_definition(&class, prototype.clone());
        }
        Ok(())
    }

    fn set_definition(&mut self, id: &str, mut definition: Definition) {
        if self.state.loading_instanceof {
            self.state.instanceof.insert(id.to_owned(), definition);
            return;
        }
        if definition.kind == DefinitionKind::Standalone {
            definition.instanceof = self.state.instanceof.clone();
        }
        self.container.set_definition(id, definition);
    }
}
