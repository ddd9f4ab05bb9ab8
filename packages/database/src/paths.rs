//! Filesystem helpers for database and artifact paths.

use std::path::{Path, PathBuf};

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Ensures the parent directory of `path` exists.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}

/// Resolves `path` against `base` unless it is already absolute.
///
/// Config files use this so relative paths are read relative to the
/// config file rather than the working directory.
#[must_use]
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_to_base() {
        let base = Path::new("/etc/nestwatch");
        assert_eq!(
            resolve(base, Path::new("areas.geojson")),
            PathBuf::from("/etc/nestwatch/areas.geojson")
        );
        assert_eq!(
            resolve(base, Path::new("/var/lib/scan.duckdb")),
            PathBuf::from("/var/lib/scan.duckdb")
        );
    }

    #[test]
    fn bare_file_name_has_nothing_to_create() {
        assert!(ensure_parent(Path::new("nests.geojson")).is_ok());
    }
}
