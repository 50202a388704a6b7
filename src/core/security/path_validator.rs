use std::io;
use std::path::{Path, PathBuf};

use crate::core::config::Config;

/// Errors that can occur during path validation
#[derive(Debug, thiserror::Error)]
pub enum PathSecurityError {
    #[error("Path '{path}' is outside allowed root directory '{root}'")]
    OutsideRootDirectory { path: PathBuf, root: PathBuf },

    #[error("Symlink '{path}' is not allowed")]
    SymlinkNotAllowed { path: PathBuf },

    #[error("Cannot canonicalize path '{path}': {error}")]
    CannotCanonicalize { path: PathBuf, error: io::Error },

    #[error("Path does not exist: '{path}'")]
    PathNotFound { path: PathBuf },

    #[error("Path is not a regular file: '{path}'")]
    NotAFile { path: PathBuf },

    #[error("IO error for path '{path}': {error}")]
    IoError { path: PathBuf, error: io::Error },
}

/// Validates a path to an existing file that will be read.
///
/// The file must exist and, when a root is configured, its canonical form
/// must lie within that root. Symlinks are rejected outright when the
/// configuration disallows them.
///
/// # Examples
///
/// ```rust,ignore
/// let config = Config::from_env();
/// let file = validate_input_path("/home/user/reports/q3.pdf", &config)?;
/// ```
pub fn validate_input_path(input_path: &str, config: &Config) -> Result<PathBuf, PathSecurityError> {
    let path = Path::new(input_path);

    if !path.exists() {
        return Err(PathSecurityError::PathNotFound {
            path: path.to_path_buf(),
        });
    }

    reject_symlink(path, config)?;

    let canonical_path = canonicalize_path(path)?;
    check_root(&canonical_path, config)?;

    if !canonical_path.is_file() {
        return Err(PathSecurityError::NotAFile {
            path: canonical_path,
        });
    }

    Ok(canonical_path)
}

/// Validates a destination path for a file that will be written.
///
/// The file itself may not exist yet, but its parent directory must. The
/// returned path is the canonical parent joined with the file name.
pub fn validate_output_path(input_path: &str, config: &Config) -> Result<PathBuf, PathSecurityError> {
    let path = Path::new(input_path);

    let file_name = match path.file_name() {
        Some(name) => name.to_os_string(),
        None => {
            return Err(PathSecurityError::NotAFile {
                path: path.to_path_buf(),
            });
        }
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let canonical_parent = canonicalize_path(parent)?;
    check_root(&canonical_parent, config)?;

    let target = canonical_parent.join(file_name);
    if target.exists() || target.is_symlink() {
        reject_symlink(&target, config)?;
        if target.is_dir() {
            return Err(PathSecurityError::NotAFile { path: target });
        }
    }

    Ok(target)
}

fn reject_symlink(path: &Path, config: &Config) -> Result<(), PathSecurityError> {
    let metadata = path
        .symlink_metadata()
        .map_err(|e| PathSecurityError::IoError {
            path: path.to_path_buf(),
            error: e,
        })?;
    if metadata.file_type().is_symlink() && !config.security.allow_symlinks {
        return Err(PathSecurityError::SymlinkNotAllowed {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn check_root(canonical_path: &Path, config: &Config) -> Result<(), PathSecurityError> {
    let Some(ref root) = config.security.root_path else {
        return Ok(());
    };

    let canonical_root = root.canonicalize().map_err(|e| PathSecurityError::IoError {
        path: root.clone(),
        error: e,
    })?;

    if !canonical_path.starts_with(&canonical_root) {
        return Err(PathSecurityError::OutsideRootDirectory {
            path: canonical_path.to_path_buf(),
            root: canonical_root,
        });
    }
    Ok(())
}

fn canonicalize_path(path: &Path) -> Result<PathBuf, PathSecurityError> {
    path.canonicalize().map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            PathSecurityError::PathNotFound {
                path: path.to_path_buf(),
            }
        } else {
            PathSecurityError::CannotCanonicalize {
                path: path.to_path_buf(),
                error: e,
            }
        }
    })
}
