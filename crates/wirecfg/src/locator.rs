//! Locating service files.

use std::path::{Path, PathBuf};

use crate::error::{ErrorKind, LoadError};

/// Resolves resource names to files on disk.
///
/// Relative names are tried against the current directory first (the working directory when
/// none is given), then each search path in order. Absolute names must exist as given.
#[derive(Debug, Clone, Default)]
pub struct FileLocator {
    paths: Vec<PathBuf>,
}

impl FileLocator {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
        }
    }

    pub fn locate(&self, name: &str, current_dir: Option<&Path>) -> Result<PathBuf, LoadError> {
        if name.is_empty() {
            return Err(LoadError::new(
                ErrorKind::NotFound,
                "An empty file name is not valid to be located.",
            ));
        }

        let path = Path::new(name);
        if path.is_absolute() {
            return if path.exists() {
                Ok(path.to_path_buf())
            } else {
                Err(LoadError::new(
                    ErrorKind::NotFound,
                    format!("The file \"{name}\" does not exist."),
                ))
            };
        }

        // Without a current directory the name is relative to the working directory.
        let found = match current_dir {
            Some(dir) => dir.join(path),
            None => path.to_path_buf(),
        };
        if found.exists() {
            return Ok(found);
        }

        self.paths
            .iter()
            .map(|dir| dir.join(path))
            .find(|candidate| candidate.exists())
            .ok_or_else(|| {
                let searched: Vec<String> = std::iter::once(current_dir.unwrap_or(Path::new(".")))
                    .chain(self.paths.iter().map(PathBuf::as_path))
                    .map(|dir| dir.display().to_string())
                    .collect();
                LoadError::new(
                    ErrorKind::NotFound,
                    format!(
                        "The file \"{name}\" does not exist (in: {}).",
                        searched.join(", ")
                    ),
                )
            })
    }
}
