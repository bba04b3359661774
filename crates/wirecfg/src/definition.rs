//! Service definitions and aliases.

use indexmap::IndexMap;
use wirecfg_tree::Key;

use crate::argument::Argument;
use crate::callable::Callable;
use crate::tags::ServiceTag;

/// Message used when `deprecated` carries no template of its own.
pub const DEFAULT_DEPRECATION_TEMPLATE: &str =
    "The \"%service_id%\" service is deprecated. You should stop using it, as it will soon be removed.";

/// How a definition relates to others.
#[derive(Debug, Clone, PartialEq)]
pub enum DefinitionKind {
    /// A definition on its own.
    Standalone,
    /// A definition inheriting from `parent`.
    Child { parent: String, inherit_tags: bool },
    /// A fragment from `_instanceof`, applied to services of a matching type.
    Instanceof,
}

/// A method called after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method: String,
    pub arguments: Vec<(Key, Argument)>,
}

/// The service this definition decorates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    pub decorated: String,
    /// Id the decorated service is renamed to.
    pub inner_name: Option<String>,
    pub priority: i64,
}

/// Autowiring mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Autowire {
    Flag(bool),
    /// Autowire only these methods.
    Calls(Vec<String>),
}

/// A deprecation notice for a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deprecated {
    /// Message template; `%service_id%` is replaced with the service id.
    pub template: String,
}

impl Deprecated {
    pub fn message(&self, id: &str) -> String {
        self.template.replace("%service_id%", id)
    }
}

impl Default for Deprecated {
    fn default() -> Self {
        Self {
            template: DEFAULT_DEPRECATION_TEMPLATE.to_owned(),
        }
    }
}

/// How to build and wire one service.
///
/// Unset flags are `None` so that a container can tell "not configured" from an explicit value;
/// that matters for child definitions and `_instanceof` fragments, which only override what
/// they set.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub kind: DefinitionKind,
    pub class: Option<String>,
    pub shared: Option<bool>,
    pub synthetic: Option<bool>,
    pub lazy: Option<bool>,
    pub public: Option<bool>,
    pub is_abstract: Option<bool>,
    pub deprecated: Option<Deprecated>,
    pub factory: Option<Callable>,
    pub file: Option<String>,
    pub arguments: Vec<(Key, Argument)>,
    pub properties: Vec<(Key, Argument)>,
    pub configurator: Option<Callable>,
    pub getters: Vec<(Key, Argument)>,
    pub calls: Vec<MethodCall>,
    pub tags: Vec<ServiceTag>,
    pub decoration: Option<Decoration>,
    pub autowire: Option<Autowire>,
    pub autowiring_types: Vec<String>,
    /// `_instanceof` fragments in effect when a standalone definition was registered.
    pub instanceof: IndexMap<String, Definition>,
}

impl Definition {
    pub fn new(kind: DefinitionKind) -> Self {
        Self {
            kind,
            class: None,
            shared: None,
            synthetic: None,
            lazy: None,
            public: None,
            is_abstract: None,
            deprecated: None,
            factory: None,
            file: None,
            arguments: Vec::new(),
            properties: Vec::new(),
            configurator: None,
            getters: Vec::new(),
            calls: Vec::new(),
            tags: Vec::new(),
            decoration: None,
            autowire: None,
            autowiring_types: Vec::new(),
            instanceof: IndexMap::new(),
        }
    }

    pub fn standalone() -> Self {
        Self::new(DefinitionKind::Standalone)
    }

    pub fn child(parent: impl Into<String>) -> Self {
        Self::new(DefinitionKind::Child {
            parent: parent.into(),
            inherit_tags: false,
        })
    }

    pub fn parent(&self) -> Option<&str> {
        match &self.kind {
            DefinitionKind::Child { parent, .. } => Some(parent),
            _ => None,
        }
    }

    /// Argument by position or `$name`.
    pub fn argument(&self, key: impl Into<Key>) -> Option<&Argument> {
        let key = key.into();
        self.arguments
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name == name)
    }

    /// Public unless configured otherwise.
    pub fn is_public(&self) -> bool {
        self.public.unwrap_or(true)
    }
}

/// A named redirect to another service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub target: String,
    pub public: bool,
}

impl Alias {
    pub fn new(target: impl Into<String>, public: bool) -> Self {
        Self {
            target: target.into(),
            public,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deprecation_message() {
        let deprecated = Deprecated::default();
        assert_eq!(
            deprecated.message("app.old"),
            "The \"app.old\" service is deprecated. You should stop using it, as it will soon be removed."
        );
    }

    #[test]
    fn test_argument_lookup() {
        let mut definition = Definition::standalone();
        definition.arguments = vec![
            (Key::Index(0), Argument::from("first")),
            (Key::Name("$mailer".into()), Argument::from("second")),
        ];
        assert_eq!(definition.argument(0i64), Some(&Argument::from("first")));
        assert_eq!(definition.argument("$mailer"), Some(&Argument::from("second")));
        assert_eq!(definition.argument("$missing"), None);
    }

    #[test]
    fn test_child_parent() {
        assert_eq!(Definition::child("base").parent(), Some("base"));
        assert_eq!(Definition::standalone().parent(), None);
        assert!(Definition::standalone().is_public());
    }
}
