//! Value types for service files.
//!
//! Every node of a document is one of:
//! - a scalar (`~`, `true`, `42`, `1.5`, `foo`)
//! - a sequence (`[a, b]`)
//! - a mapping (`{a: 1}`), keyed by [`Key`]
//! - a tagged value (`!iterator [a, b]`), which wraps any of the above

use std::fmt;

/// A document value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `~` or `null`.
    Null,
    /// `true` / `false`.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Floating point scalar.
    Float(f64),
    /// String scalar.
    String(String),
    /// Sequence `[a, b, c]`.
    Sequence(Vec<Value>),
    /// Mapping `{key: value, ...}`.
    Mapping(Mapping),
    /// A value with a custom tag (`!name payload`).
    Tagged(Box<Tagged>),
}

/// A value carrying a custom tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Tagged {
    /// Tag name (without `!`).
    pub tag: String,
    /// The tagged payload.
    pub value: Value,
}

/// A mapping key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// Integer key, including the implicit positions of sequence items.
    Index(i64),
    /// Any other key.
    Name(String),
}

/// An ordered mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    /// Entries in document order.
    pub entries: Vec<Entry>,
}

/// An entry in a mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// The key.
    pub key: Key,
    /// The value.
    pub value: Value,
}

impl Value {
    /// Create a string value.
    pub fn string(text: impl Into<String>) -> Self {
        Value::String(text.into())
    }

    /// Create a sequence value.
    pub fn seq(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }

    /// Create a tagged value.
    pub fn tagged(tag: impl Into<String>, value: Value) -> Self {
        Value::Tagged(Box::new(Tagged {
            tag: tag.into(),
            value,
        }))
    }

    /// Check if this is `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this is a boolean, number or string.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::String(_)
        )
    }

    /// Check if this is an untagged sequence or mapping.
    pub fn is_collection(&self) -> bool {
        matches!(self, Value::Sequence(_) | Value::Mapping(_))
    }

    /// Human-readable name of this value's type, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
            Value::Tagged(_) => "tagged value",
        }
    }

    /// Get as string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as float (integers are widened).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as sequence.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Get as mapping.
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Get as mutable mapping.
    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Look up a string key in a mapping.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_mapping()?.get(key)
    }

    /// Look up a position: a sequence item, or a mapping entry keyed by that index.
    pub fn positional(&self, index: usize) -> Option<&Value> {
        match self {
            Value::Sequence(items) => items.get(index),
            Value::Mapping(m) => m.get_key(&Key::Index(index as i64)),
            _ => None,
        }
    }

    /// Number of items or entries of a collection; `None` for anything else.
    pub fn collection_len(&self) -> Option<usize> {
        match self {
            Value::Sequence(items) => Some(items.len()),
            Value::Mapping(m) => Some(m.len()),
            _ => None,
        }
    }

    /// Iterate a collection as `(key, value)` pairs.
    ///
    /// Sequence items are keyed by their position. Anything that is not a collection
    /// yields nothing.
    pub fn iter_keyed(&self) -> impl Iterator<Item = (Key, &Value)> {
        let (items, mapping) = match self {
            Value::Sequence(items) => (Some(items), None),
            Value::Mapping(m) => (None, Some(m)),
            _ => (None, None),
        };
        let positional = items.into_iter().flat_map(|items| {
            items
                .iter()
                .enumerate()
                .map(|(i, v)| (Key::Index(i as i64), v))
        });
        let keyed = mapping
            .into_iter()
            .flat_map(|m| m.entries.iter().map(|e| (e.key.clone(), &e.value)));
        positional.chain(keyed)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<Mapping> for Value {
    fn from(m: Mapping) -> Self {
        Value::Mapping(m)
    }
}

impl Key {
    /// Build a key from text, turning canonical integers (`0`, `12`, `-3`) into indexes.
    pub fn parse(text: &str) -> Self {
        let digits = text.strip_prefix('-').unwrap_or(text);
        let canonical = text == "0"
            || (!digits.is_empty()
                && !digits.starts_with('0')
                && digits.bytes().all(|b| b.is_ascii_digit()));
        match text.parse() {
            Ok(index) if canonical => Key::Index(index),
            _ => Key::Name(text.to_owned()),
        }
    }

    /// Get as string (for named keys).
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::Name(s) => Some(s),
            Key::Index(_) => None,
        }
    }

    /// Check if this is an integer key.
    pub fn is_index(&self) -> bool {
        matches!(self, Key::Index(_))
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::parse(s)
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::parse(&s)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Index(i)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "{i}"),
            Key::Name(s) => f.write_str(s),
        }
    }
}

impl Mapping {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get entry value by string key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.get_key(&Key::parse(key))
    }

    /// Get entry value by key.
    pub fn get_key(&self, key: &Key) -> Option<&Value> {
        self.entries
            .iter()
            .find(|e| &e.key == key)
            .map(|e| &e.value)
    }

    /// Get mutable entry value by string key.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        let key = Key::parse(key);
        self.entries
            .iter_mut()
            .find(|e| e.key == key)
            .map(|e| &mut e.value)
    }

    /// Check if key exists (even when its value is `null`).
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove an entry, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let key = Key::parse(key);
        let pos = self.entries.iter().position(|e| e.key == key)?;
        Some(self.entries.remove(pos).value)
    }

    /// Insert or update an entry.
    pub fn insert(&mut self, key: impl Into<Key>, value: Value) {
        let key = key.into();
        if let Some(entry) = self.entries.iter_mut().find(|e| e.key == key) {
            entry.value = value;
        } else {
            self.entries.push(Entry { key, value });
        }
    }

    /// Iterate over entries as (key, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.entries.iter().map(|e| (&e.key, &e.value))
    }

    /// Iterate over keys.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.entries.iter().map(|e| &e.key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<Key>> FromIterator<(K, Value)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut mapping = Mapping::new();
        for (key, value) in iter {
            mapping.insert(key, value);
        }
        mapping
    }
}
