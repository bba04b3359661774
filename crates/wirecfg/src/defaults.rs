//! The `_defaults` block.

use wirecfg_tree::Value;

use crate::error::{ErrorKind, LoadError};
use crate::keywords::{Context, suggest_similar};
use crate::tags::{ServiceTag, TagOwner, parse_tags};

/// Values inherited by every ordinary service parsed after `_defaults` in the same file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Defaults {
    pub public: Option<bool>,
    /// Raw `autowire` value; checked where it is applied.
    pub autowire: Option<Value>,
    pub tags: Option<Vec<ServiceTag>>,
    pub inherit_tags: Option<bool>,
}

/// Parse the raw `_defaults` entry. `null` means no defaults.
pub fn parse_defaults(raw: &Value, file: &str) -> Result<Defaults, LoadError> {
    let mapping = match raw {
        Value::Null => return Ok(Defaults::default()),
        Value::Mapping(mapping) => mapping,
        other => {
            return Err(LoadError::new(
                ErrorKind::InvalidDocument,
                format!(
                    "Service defaults must be a mapping, {} given in \"{file}\".",
                    other.type_name()
                ),
            )
            .in_file(file));
        }
    };

    let allowed = Context::Defaults.keywords();
    for key in mapping.keys() {
        let key = key.to_string();
        if !Context::Defaults.allows(&key) {
            return Err(LoadError::new(
                ErrorKind::UnsupportedKey {
                    suggestion: suggest_similar(&key, allowed),
                    allowed: allowed.to_vec(),
                    key: key.clone(),
                },
                format!(
                    "The configuration key \"{key}\" cannot be used to define a default value in \
                     \"{file}\". Allowed keys are \"{}\".",
                    allowed.join("\", \"")
                ),
            )
            .in_file(file));
        }
    }

    let flag = |key: &str| -> Result<Option<bool>, LoadError> {
        match mapping.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(LoadError::new(
                ErrorKind::InvalidValue { key: key.to_owned() },
                format!(
                    "Parameter \"{key}\" in \"_defaults\" must be a boolean, {} given in {file}. \
                     Check your YAML syntax.",
                    other.type_name()
                ),
            )
            .in_file(file)),
        }
    };

    let tags = match mapping.get("tags") {
        None | Some(Value::Null) => None,
        Some(tags) => Some(parse_tags(tags, TagOwner::Defaults { file })?),
    };

    Ok(Defaults {
        public: flag("public")?,
        autowire: mapping.get("autowire").filter(|v| !v.is_null()).cloned(),
        tags,
        inherit_tags: flag("inherit_tags")?,
    })
}
