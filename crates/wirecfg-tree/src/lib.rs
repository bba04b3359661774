//! Document tree for wirecfg service files.
//!
//! A loaded document is a [`Value`]: scalars, sequences, mappings, and values carrying a
//! custom tag such as `!iterator [...]`. Mapping keys keep their document order, and
//! integer-like keys are stored as indexes so that positional and keyed sequences look alike.

mod diagnostic;
mod span;
mod value;
mod yaml;

pub use diagnostic::{ParseError, ParseErrorKind};
pub use span::Span;
pub use value::{Entry, Key, Mapping, Tagged, Value};
pub use yaml::find_key;

/// Parse a YAML document into a tree.
///
/// An empty document (or one holding only comments) yields [`Value::Null`].
pub fn parse(source: &str) -> Result<Value, ParseError> {
    yaml::from_str(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let value = parse("name: Alice\nage: 30").unwrap();
        assert_eq!(value.get("name").and_then(Value::as_str), Some("Alice"));
        assert_eq!(value.get("age").and_then(Value::as_i64), Some(30));
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse("").unwrap(), Value::Null);
        assert_eq!(parse("# only a comment\n").unwrap(), Value::Null);
    }

    #[test]
    fn test_service_file_structure() {
        let source = r#"
services:
    app.mailer:
        class: App\Mailer
        arguments: ['@logger', !iterator ['@a', '@b']]
"#;
        let value = parse(source).unwrap();
        let services = value.get("services").and_then(Value::as_mapping).unwrap();
        assert_eq!(services.len(), 1);

        let mailer = services.get("app.mailer").unwrap();
        assert_eq!(mailer.get("class").and_then(Value::as_str), Some("App\\Mailer"));

        let arguments = mailer.get("arguments").and_then(Value::as_sequence).unwrap();
        assert_eq!(arguments[0].as_str(), Some("@logger"));

        let Value::Tagged(tagged) = &arguments[1] else {
            panic!("expected tagged value, got {:?}", arguments[1]);
        };
        assert_eq!(tagged.tag, "iterator");
        assert_eq!(tagged.value.as_sequence().map(|s| s.len()), Some(2));
    }
}
