//! Route-file discovery.
//!
//! Resolves a configured routes path into the ordered list of route files a
//! lifecycle will load. Pure resolution — nothing here executes or reads
//! file contents.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Errors raised while resolving a routes path.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The configured path does not exist. Fatal, and raised before any
    /// route registration has happened.
    #[error("routes path {path:?} does not exist")]
    NotFound {
        /// The missing path as configured.
        path: PathBuf,
    },

    /// A directory entry could not be read during the walk.
    #[error("failed to read routes directory {path:?}")]
    Walk {
        /// The directory being walked.
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Resolves `path` into an ordered sequence of route-file paths.
///
/// - A single file resolves to just itself.
/// - A directory resolves to every regular file found by a recursive walk,
///   sorted lexicographically by full path so the load order is
///   deterministic and repeatable.
///
/// # Errors
///
/// - [`LoaderError::NotFound`] when `path` does not exist.
/// - [`LoaderError::Walk`] when a directory entry cannot be read.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use gears_router::loader;
///
/// let files = loader::resolve(Path::new("routes"))?;
/// for file in &files {
///     println!("{}", file.display());
/// }
/// # Ok::<(), gears_router::loader::LoaderError>(())
/// ```
pub fn resolve(path: &Path) -> Result<Vec<PathBuf>, LoaderError> {
    if !path.exists() {
        return Err(LoaderError::NotFound {
            path: path.to_owned(),
        });
    }

    if path.is_file() {
        debug!(path = %path.display(), "routes path is a single file");
        return Ok(vec![path.to_owned()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path) {
        let entry = entry.map_err(|source| LoaderError::Walk {
            path: path.to_owned(),
            source,
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();

    debug!(path = %path.display(), count = files.len(), "route files resolved");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "").unwrap();
        path
    }

    #[test]
    fn missing_path_is_not_found() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let err = resolve(&missing).unwrap_err();
        assert!(matches!(err, LoaderError::NotFound { path } if path == missing));
    }

    #[test]
    fn single_file_resolves_to_itself() {
        let dir = TempDir::new().unwrap();
        let file = touch(dir.path(), "index.GET.routes");
        assert_eq!(resolve(&file).unwrap(), vec![file]);
    }

    #[test]
    fn directory_is_walked_recursively_and_sorted() {
        let dir = TempDir::new().unwrap();
        let b = touch(dir.path(), "b.routes");
        let a = touch(dir.path(), "a.routes");
        fs::create_dir(dir.path().join("nested")).unwrap();
        let c = touch(&dir.path().join("nested"), "c.routes");

        assert_eq!(resolve(dir.path()).unwrap(), vec![a, b, c]);
    }

    #[test]
    fn subdirectories_themselves_are_not_listed() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();
        let only = touch(dir.path(), "only.routes");

        assert_eq!(resolve(dir.path()).unwrap(), vec![only]);
    }

    #[test]
    fn resolution_is_idempotent() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "one.routes");
        touch(dir.path(), "two.routes");

        let first = resolve(dir.path()).unwrap();
        let second = resolve(dir.path()).unwrap();
        assert_eq!(first, second);
    }
}
