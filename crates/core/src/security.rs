//! Path containment: every handler that turns a caller-supplied path into a
//! filesystem read must go through [`validate_path`] first.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SecurityError {
    #[error("path outside repository: '{attempted}'")]
    OutsideRepository { attempted: String },

    #[error("absolute path not allowed: '{path}'")]
    AbsolutePath { path: String },
}

/// Resolves `user_path` against `root` and guarantees the result is a
/// descendant of `root`'s canonical form, rejecting absolute input and any
/// `..` escape regardless of whether the target currently exists.
pub fn validate_path(root: &Path, user_path: &str) -> Result<PathBuf, SecurityError> {
    let user_path_obj = Path::new(user_path);

    if user_path_obj.is_absolute() {
        return Err(SecurityError::AbsolutePath {
            path: user_path.to_string(),
        });
    }

    let normalized = normalize_path(user_path_obj);
    for component in normalized.components() {
        if matches!(component, Component::ParentDir) {
            return Err(SecurityError::OutsideRepository {
                attempted: user_path.to_string(),
            });
        }
    }

    let canonical_root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let joined = canonical_root.join(&normalized);

    let resolved = if joined.exists() {
        joined.canonicalize().map_err(|_| SecurityError::OutsideRepository {
            attempted: user_path.to_string(),
        })?
    } else {
        joined
    };

    if !resolved.starts_with(&canonical_root) {
        return Err(SecurityError::OutsideRepository {
            attempted: user_path.to_string(),
        });
    }

    Ok(resolved)
}

/// Resolves `.`/`..` components without touching the filesystem.
fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if components.last().is_some_and(|c| !matches!(c, Component::ParentDir)) {
                    components.pop();
                } else {
                    components.push(component);
                }
            }
            _ => components.push(component),
        }
    }
    components.iter().collect()
}
