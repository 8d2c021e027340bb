//! Discovery of the `.formulary/` project directory.

use std::path::{Path, PathBuf};

use crate::config::ConfigError;

/// Name of the project directory.
pub const DIR_NAME: &str = ".formulary";

/// Environment variable overriding directory discovery.
pub const DIR_ENV: &str = "FORMULARY_DIR";

/// Walks up from `start` looking for `.formulary/`.
///
/// `FORMULARY_DIR` wins when it names an existing directory.
pub fn find_formulary_dir(start: &Path) -> Option<PathBuf> {
    if let Ok(env_dir) = std::env::var(DIR_ENV) {
        let env_path = PathBuf::from(env_dir);
        if env_path.is_dir() {
            return Some(env_path);
        }
    }

    let start = start.canonicalize().ok()?;
    start
        .ancestors()
        .map(|dir| dir.join(DIR_NAME))
        .find(|candidate| candidate.is_dir())
}

/// Like [`find_formulary_dir`] but reports a missing directory as an error.
pub fn find_formulary_dir_or_error(start: &Path) -> Result<PathBuf, ConfigError> {
    find_formulary_dir(start).ok_or(ConfigError::DirNotFound)
}

/// Creates `.formulary/` under `path` (or `path` itself when it already has
/// that name) and returns it.
pub fn ensure_formulary_dir(path: &Path) -> Result<PathBuf, ConfigError> {
    let dir = if path.ends_with(DIR_NAME) {
        path.to_path_buf()
    } else {
        path.join(DIR_NAME)
    };
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn finds_dir_from_child() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join(DIR_NAME);
        std::fs::create_dir(&dir).unwrap();
        let child = root.path().join("reports").join("q3");
        std::fs::create_dir_all(&child).unwrap();

        let found = find_formulary_dir(&child).unwrap();
        assert_eq!(found.canonicalize().unwrap(), dir.canonicalize().unwrap());
    }

    #[test]
    fn missing_start_is_none() {
        assert!(find_formulary_dir(Path::new("/nonexistent/start")).is_none());
    }

    #[test]
    fn ensure_creates_and_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let first = ensure_formulary_dir(root.path()).unwrap();
        let second = ensure_formulary_dir(&first).unwrap();
        assert!(first.is_dir());
        assert!(first.ends_with(DIR_NAME));
        assert_eq!(first, second);
    }
}
