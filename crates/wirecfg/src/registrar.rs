//! Class discovery for `resource` prototypes.

use std::fmt;
use std::path::{Path, PathBuf};

/// Finds the classes a `resource` pattern covers.
pub trait ClassRegistrar {
    /// Class names under `namespace` matched by `pattern`, resolved from `current_dir`.
    fn discover(
        &self,
        namespace: &str,
        pattern: &str,
        current_dir: Option<&Path>,
    ) -> Result<Vec<String>, RegistrarError>;
}

/// Class discovery failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrarError {
    pub message: String,
}

impl RegistrarError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for RegistrarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RegistrarError {}

/// Discovers classes from source files matched by a glob.
///
/// Each matching file becomes `namespace` followed by its path below the non-wildcard prefix
/// of the pattern, without extension and with `/` turned into `\`. For the pattern
/// `../src/*` and namespace `App\`, the file `../src/Mail/Mailer.php` is `App\Mail\Mailer`.
#[derive(Debug, Clone)]
pub struct GlobClassRegistrar {
    extension: String,
}

impl Default for GlobClassRegistrar {
    fn default() -> Self {
        Self {
            extension: "php".to_owned(),
        }
    }
}

impl GlobClassRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only consider files with this extension (default: `php`).
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }
}

/// Directory part of `pattern` before its first wildcard.
fn glob_prefix(pattern: &str) -> &str {
    let wildcard = pattern
        .find(['*', '?', '[', '{'])
        .unwrap_or(pattern.len());
    match pattern[..wildcard].rfind('/') {
        Some(slash) => &pattern[..slash],
        None if wildcard == pattern.len() => pattern,
        None => "",
    }
}

/// Expands `{a,b}` alternations, which `glob` does not understand, into separate patterns.
///
/// Groups may nest. A `{` without a matching `}` is kept literally.
fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_owned()];
    };

    let mut depth = 0;
    let mut close = None;
    let mut commas = Vec::new();
    for (i, c) in pattern[open..].char_indices().map(|(i, c)| (open + i, c)) {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            ',' if depth == 1 => commas.push(i),
            _ => {}
        }
    }
    let Some(close) = close else {
        return vec![pattern.to_owned()];
    };

    let head = &pattern[..open];
    let tail = &pattern[close + 1..];
    let mut bounds = vec![open];
    bounds.extend(commas);
    bounds.push(close);

    bounds
        .windows(2)
        .flat_map(|w| expand_braces(&format!("{head}{}{tail}", &pattern[w[0] + 1..w[1]])))
        .collect()
}

impl ClassRegistrar for GlobClassRegistrar {
    fn discover(
        &self,
        namespace: &str,
        pattern: &str,
        current_dir: Option<&Path>,
    ) -> Result<Vec<String>, RegistrarError> {
        let base = current_dir.map(Path::to_path_buf).unwrap_or_default();
        let prefix = base.join(glob_prefix(pattern));

        let mut classes = Vec::new();
        for expanded in expand_braces(pattern) {
            let full = base.join(&expanded);
            let full = full.to_str().ok_or_else(|| {
                RegistrarError::new(format!("Invalid resource path \"{pattern}\"."))
            })?;

            let entries = glob::glob(full).map_err(|e| {
                RegistrarError::new(format!("Invalid resource pattern \"{pattern}\": {e}"))
            })?;
            for entry in entries {
                let path = entry.map_err(|e| RegistrarError::new(e.to_string()))?;
                collect_classes(&path, &prefix, namespace, &self.extension, &mut classes)?;
            }
        }
        classes.sort();
        classes.dedup();
        Ok(classes)
    }
}

fn collect_classes(
    path: &Path,
    prefix: &Path,
    namespace: &str,
    extension: &str,
    classes: &mut Vec<String>,
) -> Result<(), RegistrarError> {
    if path.is_dir() {
        let mut children: Vec<PathBuf> = std::fs::read_dir(path)
            .map_err(|e| RegistrarError::new(format!("{}: {e}", path.display())))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        children.sort();
        for child in children {
            collect_classes(&child, prefix, namespace, extension, classes)?;
        }
        return Ok(());
    }

    if path.extension().and_then(|e| e.to_str()) != Some(extension) {
        return Ok(());
    }
    let Ok(relative) = path.with_extension("").strip_prefix(prefix).map(Path::to_path_buf) else {
        return Ok(());
    };
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    classes.push(format!("{namespace}{}", segments.join("\\")));
    Ok(())
}
