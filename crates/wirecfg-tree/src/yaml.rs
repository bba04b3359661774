//! Tree building from YAML.

use serde_yaml::Value as Yaml;

use crate::diagnostic::{ParseError, ParseErrorKind};
use crate::span::Span;
use crate::value::{Key, Mapping, Tagged, Value};

pub(crate) fn from_str(source: &str) -> Result<Value, ParseError> {
    if source.trim().is_empty() {
        return Ok(Value::Null);
    }
    let raw: Yaml = serde_yaml::from_str(source).map_err(ParseError::from_yaml)?;
    convert(raw)
}

fn convert(raw: Yaml) -> Result<Value, ParseError> {
    Ok(match raw {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Float))
            .unwrap_or(Value::Null),
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Sequence(
            items
                .into_iter()
                .map(convert)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Yaml::Mapping(raw) => {
            let mut mapping = Mapping::new();
            for (key, value) in raw {
                mapping.insert(convert_key(key)?, convert(value)?);
            }
            Value::Mapping(mapping)
        }
        Yaml::Tagged(tagged) => {
            let tagged = *tagged;
            let tag = tagged.tag.to_string();
            Value::Tagged(Box::new(Tagged {
                tag: tag.trim_start_matches('!').to_owned(),
                value: convert(tagged.value)?,
            }))
        }
    })
}

fn convert_key(raw: Yaml) -> Result<Key, ParseError> {
    match raw {
        Yaml::String(s) => Ok(Key::parse(&s)),
        Yaml::Number(n) => Ok(match n.as_i64() {
            Some(i) => Key::Index(i),
            None => Key::Name(n.to_string()),
        }),
        Yaml::Bool(b) => Ok(Key::Index(i64::from(b))),
        Yaml::Null => Ok(Key::Name(String::new())),
        other => Err(ParseError::new(
            ParseErrorKind::UnsupportedKey {
                found: type_name(&other),
            },
            None,
        )),
    }
}

fn type_name(raw: &Yaml) -> &'static str {
    match raw {
        Yaml::Sequence(_) => "sequence",
        Yaml::Mapping(_) => "mapping",
        Yaml::Tagged(_) => "tagged value",
        _ => "scalar",
    }
}

/// Find where a mapping key is written in YAML source.
///
/// Returns the span of the first line whose content starts with `key:` (plain, single- or
/// double-quoted). Used to point diagnostics at a service entry.
pub fn find_key(source: &str, key: &str) -> Option<Span> {
    let candidates = [
        key.to_owned(),
        format!("'{key}'"),
        format!("\"{key}\""),
    ];
    let mut offset = 0usize;
    for line in source.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();
        let trimmed = trimmed.strip_prefix("- ").unwrap_or(trimmed);
        let dash = line.len() - indent - trimmed.len();
        for candidate in &candidates {
            if let Some(rest) = trimmed.strip_prefix(candidate.as_str())
                && rest.starts_with(':')
            {
                let start = offset + indent + dash;
                return Some(Span::new(start as u32, (start + candidate.len()) as u32));
            }
        }
        offset += line.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars() {
        let value = from_str("a: ~\nb: true\nc: 3\nd: 3.5\ne: text").unwrap();
        assert_eq!(value.get("a"), Some(&Value::Null));
        assert_eq!(value.get("b"), Some(&Value::Bool(true)));
        assert_eq!(value.get("c"), Some(&Value::Int(3)));
        assert_eq!(value.get("d"), Some(&Value::Float(3.5)));
        assert_eq!(value.get("e"), Some(&Value::string("text")));
    }

    #[test]
    fn test_keys_are_normalized() {
        let value = from_str("0: a\n'1': b\n$name: c\nfoo: d").unwrap();
        let keys: Vec<Key> = value.as_mapping().unwrap().keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                Key::Index(0),
                Key::Index(1),
                Key::Name("$name".into()),
                Key::Name("foo".into()),
            ]
        );
    }

    #[test]
    fn test_mapping_order_is_preserved() {
        let value = from_str("zeta: 1\nalpha: 2\nmid: 3").unwrap();
        let keys: Vec<String> = value
            .as_mapping()
            .unwrap()
            .keys()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_custom_tags() {
        let value = from_str("locator: !service_locator { a: '@a' }").unwrap();
        let Some(Value::Tagged(tagged)) = value.get("locator") else {
            panic!("expected a tagged value");
        };
        assert_eq!(tagged.tag, "service_locator");
        assert_eq!(tagged.value.get("a").and_then(Value::as_str), Some("@a"));
    }

    #[test]
    fn test_collection_keys_are_rejected() {
        let err = from_str("? [a, b]\n: value").unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::UnsupportedKey { found: "sequence" }
        );
    }

    #[test]
    fn test_syntax_error_has_location() {
        let err = from_str("services:\n  foo: [unclosed").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Syntax);
        assert!(err.span.is_some());
    }

    #[test]
    fn test_find_key() {
        let source = "services:\n    app.mailer:\n        class: Mailer\n    'app.quoted': ~\n";
        let span = find_key(source, "app.mailer").unwrap();
        assert_eq!(span.slice(source), "app.mailer");

        let span = find_key(source, "app.quoted").unwrap();
        assert_eq!(span.slice(source), "'app.quoted'");

        assert_eq!(find_key(source, "app"), None);
    }
}
