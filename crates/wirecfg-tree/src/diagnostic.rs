//! Diagnostic rendering for YAML errors.

use ariadne::{Color, Config, Label, Report, ReportKind, Source};

use crate::span::Span;

/// Get ariadne config, respecting NO_COLOR env var.
fn ariadne_config() -> Config {
    let no_color = std::env::var("NO_COLOR").is_ok();
    if no_color {
        Config::default().with_color(false)
    } else {
        Config::default()
    }
}

/// Kind of document error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The YAML parser rejected the text.
    Syntax,
    /// A mapping key is a collection or tagged value.
    UnsupportedKey { found: &'static str },
}

/// A document error with optional source location.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// The kind of error.
    pub kind: ParseErrorKind,
    /// Message reported by the YAML parser, or a description of the rejected key.
    pub message: String,
    /// Source location, when the parser reported one.
    pub span: Option<Span>,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(kind: ParseErrorKind, span: Option<Span>) -> Self {
        let message = match &kind {
            ParseErrorKind::Syntax => "invalid YAML".to_owned(),
            ParseErrorKind::UnsupportedKey { found } => {
                format!("a {found} cannot be used as a mapping key")
            }
        };
        Self {
            kind,
            message,
            span,
        }
    }

    pub(crate) fn from_yaml(error: serde_yaml::Error) -> Self {
        let span = error.location().map(|loc| {
            let index = loc.index() as u32;
            Span::new(index, index + 1)
        });
        Self {
            kind: ParseErrorKind::Syntax,
            message: error.to_string(),
            span,
        }
    }

    /// Render this error with ariadne.
    ///
    /// Returns a string containing the formatted error message with source context.
    pub fn render(&self, filename: &str, source: &str) -> String {
        let mut output = Vec::new();
        self.write_report(filename, source, &mut output);
        String::from_utf8(output).unwrap_or_else(|_| format!("{}", self))
    }

    /// Write the error report to a writer.
    pub fn write_report<W: std::io::Write>(&self, filename: &str, source: &str, writer: W) {
        let range = self
            .span
            .map(|s| s.clamped(source.len()))
            .unwrap_or(0..source.len().min(1));

        let report = match &self.kind {
            ParseErrorKind::Syntax => Report::build(ReportKind::Error, (filename, range.clone()))
                .with_message("invalid YAML")
                .with_label(
                    Label::new((filename, range))
                        .with_message(&self.message)
                        .with_color(Color::Red),
                ),
            ParseErrorKind::UnsupportedKey { found } => {
                Report::build(ReportKind::Error, (filename, range.clone()))
                    .with_message("unsupported mapping key")
                    .with_label(
                        Label::new((filename, range))
                            .with_message(format!("a {found} cannot be used as a key"))
                            .with_color(Color::Red),
                    )
                    .with_help("keys must be strings or integers")
            }
        };

        let _ = report
            .with_config(ariadne_config())
            .finish()
            .write((filename, Source::from(source)), writer);
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_key_message() {
        let err = ParseError::new(ParseErrorKind::UnsupportedKey { found: "mapping" }, None);
        insta::assert_snapshot!(err.to_string(), @"a mapping cannot be used as a mapping key");
    }

    #[test]
    fn test_syntax_error_renders_location() {
        let source = "services:\n  foo: [unclosed";
        let err = crate::parse(source).unwrap_err();
        let rendered = err.render("services.yaml", source);
        let stripped = String::from_utf8(strip_ansi_escapes::strip(&rendered)).unwrap();
        assert!(stripped.contains("invalid YAML"), "{stripped}");
        assert!(stripped.contains("services.yaml"), "{stripped}");
    }

    #[test]
    fn test_render_without_span() {
        let err = ParseError::new(ParseErrorKind::UnsupportedKey { found: "sequence" }, None);
        let rendered = err.render("test.yaml", "a: b");
        let stripped = String::from_utf8(strip_ansi_escapes::strip(&rendered)).unwrap();
        assert!(stripped.contains("unsupported mapping key"), "{stripped}");
        assert!(stripped.contains("a sequence cannot be used as a key"), "{stripped}");
        assert!(stripped.contains("keys must be strings or integers"), "{stripped}");
    }
}
