//! Load errors and deprecation records.

use std::fmt;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use wirecfg_tree::{ParseError, Span, find_key};

/// Get ariadne config, respecting NO_COLOR env var.
fn ariadne_config() -> Config {
    let no_color = std::env::var("NO_COLOR").is_ok();
    if no_color {
        Config::default().with_color(false)
    } else {
        Config::default()
    }
}

/// Kind of load error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A file could not be read.
    Io,
    /// The file is not valid YAML.
    Syntax,
    /// A resource could not be located.
    NotFound,
    /// The document has the wrong top-level shape.
    InvalidDocument,
    /// An import could not be processed.
    Import,
    /// A file imports itself, directly or through other files.
    CircularImport,
    /// A top-level key names no registered extension.
    UnknownExtension {
        namespace: String,
        available: Vec<String>,
    },
    /// An extension rejected its configuration.
    Extension { namespace: String },
    /// A service entry has an unusable shape.
    InvalidService,
    /// A key is not allowed in a closed keyword set.
    UnsupportedKey {
        key: String,
        allowed: Vec<&'static str>,
        suggestion: Option<&'static str>,
    },
    /// A keyword holds a value of the wrong type.
    InvalidValue { key: String },
    /// A tag entry is malformed.
    InvalidTag,
    /// A custom YAML tag is not understood.
    UnsupportedTag { tag: String },
    /// A tagged argument has a malformed payload.
    InvalidArgument,
    /// A factory or configurator is malformed.
    InvalidCallable { parameter: String },
    /// A `decorates` option is malformed.
    InvalidDecoration,
    /// An alias is malformed.
    InvalidAlias,
    /// Class discovery for a `resource` prototype failed.
    Resource,
    /// A deprecation was escalated to an error.
    Deprecated(DeprecationKind),
}

/// An error raised while loading a service file.
#[derive(Debug, Clone)]
pub struct LoadError {
    /// Error kind.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// File being loaded when the error occurred.
    pub file: Option<String>,
    /// Service id the error belongs to.
    pub service: Option<String>,
    /// Source span, when known.
    pub span: Option<Span>,
}

impl LoadError {
    /// Create a new load error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            file: None,
            service: None,
            span: None,
        }
    }

    /// Wrap a YAML error for `file`.
    pub fn syntax(error: ParseError, file: &str) -> Self {
        Self::new(
            ErrorKind::Syntax,
            format!("The file \"{file}\" does not contain valid YAML: {error}"),
        )
        .in_file(file)
        .with_span(error.span)
    }

    /// Set the file.
    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Set the service id.
    pub fn for_service(mut self, id: impl Into<String>) -> Self {
        self.service = Some(id.into());
        self
    }

    /// Set the span.
    pub fn with_span(mut self, span: Option<Span>) -> Self {
        self.span = span;
        self
    }

    /// Render this error with ariadne.
    pub fn render(&self, filename: &str, source: &str) -> String {
        let mut output = Vec::new();
        self.write_report(filename, source, &mut output);
        String::from_utf8(output).unwrap_or_else(|_| format!("{}", self))
    }

    /// Write the error report to a writer.
    ///
    /// Without a span the report points at the offending service key, found by scanning the
    /// source, or at the start of the file.
    pub fn write_report<W: std::io::Write>(&self, filename: &str, source: &str, writer: W) {
        let range = self
            .span
            .or_else(|| self.service.as_deref().and_then(|id| find_key(source, id)))
            .map(|s| s.clamped(source.len()))
            .unwrap_or(0..source.len().min(1));

        let label = match (&self.kind, &self.service) {
            (ErrorKind::Syntax, _) => "YAML parsing stopped here".to_owned(),
            (ErrorKind::UnsupportedKey { key, .. }, _) => format!("\"{key}\" is not allowed here"),
            (_, Some(id)) => format!("in service \"{id}\""),
            (_, None) => "here".to_owned(),
        };

        let mut report = Report::build(ReportKind::Error, (filename, range.clone()))
            .with_message(&self.message)
            .with_label(
                Label::new((filename, range))
                    .with_message(label)
                    .with_color(Color::Red),
            );

        match &self.kind {
            ErrorKind::UnsupportedKey {
                suggestion: Some(suggestion),
                ..
            } => {
                report = report.with_help(format!("did you mean \"{suggestion}\"?"));
            }
            ErrorKind::UnknownExtension { available, .. } if !available.is_empty() => {
                report = report.with_help(format!(
                    "registered extensions: {}",
                    available.join(", ")
                ));
            }
            ErrorKind::Syntax => {
                report = report.with_help("Check your YAML syntax.");
            }
            _ => {}
        }

        let _ = report
            .with_config(ariadne_config())
            .finish()
            .write((filename, Source::from(source)), writer);
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for LoadError {}

/// What a value being resolved belongs to, for diagnostics.
#[derive(Debug, Clone, Copy)]
pub enum Owner<'a> {
    /// A service definition (or an `_instanceof` fragment).
    Service(&'a str),
    /// A container parameter.
    Parameter(&'a str),
}

/// Where a value being resolved comes from.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub owner: Owner<'a>,
    pub file: &'a str,
}

impl<'a> Scope<'a> {
    pub fn service(id: &'a str, file: &'a str) -> Self {
        Self {
            owner: Owner::Service(id),
            file,
        }
    }

    pub fn parameter(name: &'a str, file: &'a str) -> Self {
        Self {
            owner: Owner::Parameter(name),
            file,
        }
    }

    /// Build an error tagged with this scope's file and service.
    pub fn error(&self, kind: ErrorKind, message: impl Into<String>) -> LoadError {
        let error = LoadError::new(kind, message).in_file(self.file);
        match self.owner {
            Owner::Service(id) => error.for_service(id),
            Owner::Parameter(_) => error,
        }
    }

    /// Build a deprecation tagged with this scope's file and service.
    pub fn deprecation(&self, kind: DeprecationKind, message: impl Into<String>) -> Deprecation {
        Deprecation {
            kind,
            message: message.into(),
            file: Some(self.file.to_owned()),
            service: match self.owner {
                Owner::Service(id) => Some(id.to_owned()),
                Owner::Parameter(_) => None,
            },
        }
    }
}

impl fmt::Display for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.owner {
            Owner::Service(id) => write!(f, "service \"{id}\" in {}", self.file),
            Owner::Parameter(name) => write!(f, "parameter \"{name}\" in {}", self.file),
        }
    }
}

/// Kind of deprecated construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeprecationKind {
    /// Unknown key in an ordinary service definition.
    UnsupportedKey,
    /// Service id made only of a leading underscore and word characters.
    ReservedId,
    /// Reference written with a trailing `=`.
    StrictReferenceSuffix,
    /// Key other than `alias` and `public` on an alias entry.
    AliasKey,
}

/// A non-fatal deprecation found while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deprecation {
    pub kind: DeprecationKind,
    pub message: String,
    pub file: Option<String>,
    pub service: Option<String>,
}

impl fmt::Display for Deprecation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// How deprecations are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Severity {
    /// Log and record them.
    #[default]
    Warn,
    /// Fail the load on the first one.
    Deny,
}

/// Collects deprecations for one loader.
#[derive(Debug, Default)]
pub struct DeprecationLog {
    severity: Severity,
    records: Vec<Deprecation>,
}

impl DeprecationLog {
    pub fn new(severity: Severity) -> Self {
        Self {
            severity,
            records: Vec::new(),
        }
    }

    /// Record a deprecation, or turn it into an error under [`Severity::Deny`].
    pub fn report(&mut self, deprecation: Deprecation) -> Result<(), LoadError> {
        match self.severity {
            Severity::Deny => {
                let mut error =
                    LoadError::new(ErrorKind::Deprecated(deprecation.kind), deprecation.message);
                error.file = deprecation.file;
                error.service = deprecation.service;
                Err(error)
            }
            Severity::Warn => {
                tracing::warn!(
                    file = deprecation.file.as_deref().unwrap_or("-"),
                    "{}",
                    deprecation.message
                );
                self.records.push(deprecation);
                Ok(())
            }
        }
    }

    /// Recorded deprecations.
    #[cfg(test)]
    pub fn records(&self) -> &[Deprecation] {
        &self.records
    }

    /// Take the recorded deprecations, leaving the log empty.
    pub fn take(&mut self) -> Vec<Deprecation> {
        std::mem::take(&mut self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(rendered: &str) -> String {
        String::from_utf8(strip_ansi_escapes::strip(rendered)).unwrap()
    }

    #[test]
    fn test_scope_display() {
        let scope = Scope::service("app.mailer", "services.yaml");
        assert_eq!(scope.to_string(), "service \"app.mailer\" in services.yaml");

        let scope = Scope::parameter("locale", "parameters.yaml");
        assert_eq!(scope.to_string(), "parameter \"locale\" in parameters.yaml");
    }

    #[test]
    fn test_scope_error_carries_location() {
        let err = Scope::service("app.mailer", "services.yaml")
            .error(ErrorKind::InvalidService, "broken");
        assert_eq!(err.file.as_deref(), Some("services.yaml"));
        assert_eq!(err.service.as_deref(), Some("app.mailer"));

        let err = Scope::parameter("locale", "parameters.yaml")
            .error(ErrorKind::InvalidArgument, "broken");
        assert_eq!(err.service, None);
    }

    #[test]
    fn test_render_points_at_service_key() {
        let source = "services:\n    app.mailer:\n        clas: Mailer\n";
        let err = LoadError::new(
            ErrorKind::UnsupportedKey {
                key: "clas".into(),
                allowed: vec!["class"],
                suggestion: Some("class"),
            },
            "The configuration key \"clas\" is unsupported.",
        )
        .for_service("app.mailer");

        let rendered = strip(&err.render("services.yaml", source));
        assert!(rendered.contains("The configuration key \"clas\" is unsupported."), "{rendered}");
        assert!(rendered.contains("app.mailer"), "{rendered}");
        assert!(rendered.contains("did you mean \"class\"?"), "{rendered}");
    }

    #[test]
    fn test_render_unknown_extension_lists_aliases() {
        let err = LoadError::new(
            ErrorKind::UnknownExtension {
                namespace: "twig".into(),
                available: vec!["framework".into(), "monolog".into()],
            },
            "There is no extension able to load the configuration for \"twig\".",
        );
        let rendered = strip(&err.render("services.yaml", "twig: ~\n"));
        assert!(rendered.contains("registered extensions: framework, monolog"), "{rendered}");
    }

    #[test]
    fn test_deny_escalates() {
        let mut log = DeprecationLog::new(Severity::Deny);
        let deprecation = Scope::service("_foo", "services.yaml")
            .deprecation(DeprecationKind::ReservedId, "reserved");
        let err = log.report(deprecation).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Deprecated(DeprecationKind::ReservedId));
        assert_eq!(err.service.as_deref(), Some("_foo"));
        assert!(log.records().is_empty());
    }

    #[test]
    fn test_warn_records() {
        let mut log = DeprecationLog::default();
        let deprecation = Scope::service("_foo", "services.yaml")
            .deprecation(DeprecationKind::ReservedId, "reserved");
        log.report(deprecation.clone()).unwrap();
        assert_eq!(log.records(), &[deprecation]);
        assert_eq!(log.take().len(), 1);
        assert!(log.records().is_empty());
    }
}
