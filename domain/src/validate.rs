//! Input validation helpers shared by the HTTP surface and the watcher.

use crate::error::DomainError;
use std::path::{Path, PathBuf};

/// Validate that a path exists and is a directory; returns the absolute path.
pub fn directory_path(path: &str) -> Result<PathBuf, DomainError> {
    if path.trim().is_empty() {
        return Err(DomainError::validation("path cannot be empty"));
    }

    let abs = Path::new(path)
        .canonicalize()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                DomainError::not_found(format!("path does not exist: {path}"))
            }
            _ => DomainError::validation(format!("cannot access path {path}: {e}")),
        })?;

    if !abs.is_dir() {
        return Err(DomainError::validation(format!(
            "path is not a directory: {}",
            abs.display()
        )));
    }

    Ok(abs)
}

/// Validate that a string is not empty after trimming.
pub fn non_empty(value: &str, field: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Validate that a value lies in `[min, max]`.
pub fn in_range(value: i64, min: i64, max: i64, field: &str) -> Result<(), DomainError> {
    if value < min || value > max {
        return Err(DomainError::validation(format!(
            "{field} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(())
}

/// Validate that a value is one of the allowed variants.
pub fn one_of(value: &str, allowed: &[&str], field: &str) -> Result<(), DomainError> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(DomainError::validation(format!(
        "{field} must be one of {allowed:?}, got {value}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn directory_path_rejects_empty_and_missing() {
        assert_eq!(directory_path("").unwrap_err().kind, ErrorKind::Validation);
        assert_eq!(
            directory_path("/definitely/not/here").unwrap_err().kind,
            ErrorKind::NotFound
        );
    }

    #[test]
    fn directory_path_rejects_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.txt");
        std::fs::write(&file, "x").unwrap();
        let err = directory_path(file.to_str().unwrap()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn directory_path_accepts_directories() {
        let dir = tempfile::tempdir().unwrap();
        let abs = directory_path(dir.path().to_str().unwrap()).unwrap();
        assert!(abs.is_dir());
    }

    #[test]
    fn range_and_one_of() {
        assert!(in_range(5, 1, 10, "workers").is_ok());
        assert!(in_range(0, 1, 10, "workers").is_err());
        assert!(one_of("rrf", &["rrf", "weighted", "max"], "strategy").is_ok());
        assert!(one_of("median", &["rrf", "weighted", "max"], "strategy").is_err());
    }
}
