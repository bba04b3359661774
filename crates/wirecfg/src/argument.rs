//! Resolved argument values.
//!
//! Raw document values pass through the reference resolver and come out as [`Argument`]s:
//! the same shape as the input, with `@id` strings turned into [`Reference`]s and custom tags
//! turned into their typed forms.

use std::fmt;

use wirecfg_tree::Key;

/// What the container does when a referenced service does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidBehavior {
    /// Fail (`@id`).
    Exception,
    /// Substitute nothing (`@?id`).
    Ignore,
}

/// A reference to another service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub id: String,
    pub invalid_behavior: InvalidBehavior,
}

impl Reference {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            invalid_behavior: InvalidBehavior::Exception,
        }
    }

    pub fn optional(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            invalid_behavior: InvalidBehavior::Ignore,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.invalid_behavior {
            InvalidBehavior::Exception => write!(f, "@{}", self.id),
            InvalidBehavior::Ignore => write!(f, "@?{}", self.id),
        }
    }
}

/// An expression kept verbatim for later evaluation (`@=...`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub source: String,
}

/// A closure bound to a method of another service (`!closure_proxy [@svc, method]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosureProxy {
    pub reference: Reference,
    pub method: String,
}

/// A resolved value.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Plain string, including `@@`-escaped ones with the escape removed.
    String(String),
    Sequence(Vec<Argument>),
    Mapping(Vec<(Key, Argument)>),
    Reference(Reference),
    Expression(Expression),
    /// Lazily iterated collection (`!iterator`).
    Iterator(Vec<Argument>),
    /// Map of lazily fetched services (`!service_locator`).
    ServiceLocator(Vec<(Key, Reference)>),
    ClosureProxy(ClosureProxy),
}

impl Argument {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Argument::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Argument::Reference(r) => Some(r),
            _ => None,
        }
    }
}

impl From<&str> for Argument {
    fn from(s: &str) -> Self {
        Argument::String(s.to_owned())
    }
}

impl From<Reference> for Argument {
    fn from(r: Reference) -> Self {
        Argument::Reference(r)
    }
}
