//! wirecfg CLI tool
//!
//! Loads a service file (and everything it imports), reports errors and deprecations, and
//! prints either a short summary or the loaded container as JSON.
//!
//! Examples:
//!   wirecfg config/services.yaml                      - summary
//!   wirecfg config/services.yaml --json               - JSON dump on stdout
//!   wirecfg - < services.yaml                         - read stdin
//!   wirecfg services.yaml --extension framework       - accept a `framework:` block
//!   wirecfg services.yaml --deny-deprecations         - fail on the first deprecation

use std::io::{self, Read};
use std::path::PathBuf;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use wirecfg::{
    ContainerBuilder, ErrorKind, LoadError, LoaderOptions, PassthroughExtension, Severity,
    YamlFileLoader, container_to_json,
};

// ============================================================================
// Exit codes
// ============================================================================

const EXIT_SUCCESS: i32 = 0;
const EXIT_SYNTAX_ERROR: i32 = 1;
const EXIT_DEFINITION_ERROR: i32 = 2;
const EXIT_IO_ERROR: i32 = 3;

// ============================================================================
// CLI arguments
// ============================================================================

/// Check a YAML service file and show what it defines.
#[derive(Parser, Debug)]
#[command(name = "wirecfg", version)]
struct Args {
    /// Service file to load (or "-" for stdin)
    input: String,

    /// Print the loaded container as JSON
    #[arg(long)]
    json: bool,

    /// Treat deprecations as errors
    #[arg(long)]
    deny_deprecations: bool,

    /// Accept configuration for this extension namespace (repeatable)
    #[arg(long = "extension", value_name = "NAME")]
    extensions: Vec<String>,

    /// Extra directory to search for imported files (repeatable)
    #[arg(long = "search-path", value_name = "DIR")]
    search_paths: Vec<PathBuf>,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
enum CliError {
    Io(io::Error),
    Load {
        error: LoadError,
        /// Source of the input, used when the error points into it.
        source: Option<String>,
        filename: String,
    },
    Json(serde_json::Error),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Io(_) => EXIT_IO_ERROR,
            CliError::Load { error, .. } => match error.kind {
                ErrorKind::Syntax => EXIT_SYNTAX_ERROR,
                ErrorKind::Io | ErrorKind::NotFound => EXIT_IO_ERROR,
                _ => EXIT_DEFINITION_ERROR,
            },
            CliError::Json(_) => EXIT_IO_ERROR,
        }
    }

    /// Print the error to stderr, as a source report when the file can be read.
    fn report(&self) {
        let CliError::Load {
            error,
            source,
            filename,
        } = self
        else {
            eprintln!("error: {self}");
            return;
        };

        let file = error.file.as_deref().unwrap_or(filename);
        let text = if file == filename.as_str() {
            source.clone()
        } else {
            std::fs::read_to_string(file).ok()
        };
        match text {
            Some(text) => error.write_report(file, &text, io::stderr()),
            None => eprintln!("error: {error}"),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Io(e) => write!(f, "{e}"),
            CliError::Load { error, .. } => write!(f, "{error}"),
            CliError::Json(e) => write!(f, "{e}"),
        }
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    match run(&args) {
        Ok(output) => {
            println!("{output}");
            std::process::exit(EXIT_SUCCESS);
        }
        Err(e) => {
            e.report();
            std::process::exit(e.exit_code());
        }
    }
}

/// Load the input and build what goes to stdout.
fn run(args: &Args) -> Result<String, CliError> {
    let mut container = ContainerBuilder::new();
    for name in &args.extensions {
        container.register_extension(Box::new(PassthroughExtension::new(name.as_str())));
    }

    let mut options = LoaderOptions::new();
    if args.deny_deprecations {
        options = options.deprecations(Severity::Deny);
    }
    for path in &args.search_paths {
        options = options.search_path(path);
    }

    debug!(input = %args.input, "loading service file");
    let mut loader = YamlFileLoader::with_options(&mut container, options);
    let result = if args.input == "-" {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source)?;
        loader
            .load_source(&source, "<stdin>")
            .map_err(|error| CliError::Load {
                error,
                source: Some(source),
                filename: "<stdin>".to_owned(),
            })
    } else {
        loader.load(&args.input).map_err(|error| CliError::Load {
            error,
            source: std::fs::read_to_string(&args.input).ok(),
            filename: args.input.clone(),
        })
    };
    drop(loader);
    result?;

    if args.json {
        return serde_json::to_string_pretty(&container_to_json(&container))
            .map_err(CliError::Json);
    }
    Ok(summary(&container))
}

fn summary(container: &ContainerBuilder) -> String {
    let count = |n: usize, one: &str, many: &str| {
        if n == 1 {
            format!("1 {one}")
        } else {
            format!("{n} {many}")
        }
    };
    format!(
        "{}, {}, {}, {} loaded from {}",
        count(container.definitions().count(), "service", "services"),
        count(container.aliases().count(), "alias", "aliases"),
        count(container.parameters().count(), "parameter", "parameters"),
        count(container.deprecations().len(), "deprecation", "deprecations"),
        count(container.resources().len(), "file", "files"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn args(input: &str, extra: &[&str]) -> Args {
        let mut argv = vec!["wirecfg", input];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_args() {
        let parsed = args(
            "services.yaml",
            &["--json", "--extension", "framework", "--extension", "twig"],
        );
        assert!(parsed.json);
        assert!(!parsed.deny_deprecations);
        assert_eq!(parsed.extensions, ["framework", "twig"]);
    }

    #[test]
    fn test_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("services.yaml");
        std::fs::write(
            &path,
            "parameters:\n    locale: en\nservices:\n    app.mailer: ~\n    mailer: '@app.mailer'\n",
        )
        .unwrap();

        let output = run(&args(path.to_str().unwrap(), &[])).unwrap();
        assert_eq!(
            output,
            "1 service, 1 alias, 1 parameter, 0 deprecations loaded from 1 file"
        );

        let output = run(&args(path.to_str().unwrap(), &["--json"])).unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["aliases"]["mailer"]["alias"], "app.mailer");
        assert_eq!(json["parameters"]["locale"], "en");
    }

    #[test]
    fn test_exit_codes() {
        let dir = tempfile::tempdir().unwrap();
        let exit_code = |contents: &str, extra: &[&str]| {
            let path = dir.path().join("services.yaml");
            std::fs::write(&path, contents).unwrap();
            match run(&args(path.to_str().unwrap(), extra)) {
                Ok(_) => EXIT_SUCCESS,
                Err(e) => e.exit_code(),
            }
        };

        assert_eq!(exit_code("services: [unclosed\n", &[]), EXIT_SYNTAX_ERROR);
        assert_eq!(
            exit_code("services:\n    app.mailer: 42\n", &[]),
            EXIT_DEFINITION_ERROR
        );
        assert_eq!(exit_code("framework: ~\n", &[]), EXIT_DEFINITION_ERROR);
        assert_eq!(
            exit_code("framework: ~\n", &["--extension", "framework"]),
            EXIT_SUCCESS
        );
        assert_eq!(
            exit_code("services:\n    _mailer: ~\n", &["--deny-deprecations"]),
            EXIT_DEFINITION_ERROR
        );

        let missing = dir.path().join("missing.yaml");
        let err = run(&args(missing.to_str().unwrap(), &[])).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_IO_ERROR);
    }
}
