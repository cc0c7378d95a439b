use crate::error::StorageError;
use std::path::{Component, Path, PathBuf};

fn escape(path: &Path, reason: &'static str) -> StorageError {
    StorageError::PathTraversalAttempt {
        message: path.display().to_string().into(),
        context: Some(reason.into()),
    }
}

/// Collapses `.` and `..` lexically; `..` may never climb above the relative base.
fn normalize_relative(path: &Path) -> Result<PathBuf, StorageError> {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::Normal(segment) => out.push(segment),
            Component::ParentDir => {
                if !out.pop() {
                    return Err(escape(path, "Path climbs above the storage root"));
                }
            },
            Component::RootDir | Component::Prefix(_) => {
                return Err(escape(path, "Absolute paths are not allowed"));
            },
        }
    }

    if out.as_os_str().is_empty() {
        return Err(escape(path, "Path names no file"));
    }

    Ok(out)
}

/// Joins `path` to `root`, refusing anything that would land outside `root`.
///
/// Existing targets are canonicalized so symlinks are followed before the check; for
/// targets that do not exist yet the nearest existing ancestor is checked instead.
pub(crate) fn resolve_path(root: &Path, path: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
    let path = path.as_ref();
    if path.is_absolute() {
        return Err(escape(path, "Absolute paths are not allowed"));
    }

    let joined = root.join(normalize_relative(path)?);

    match joined.canonicalize() {
        Ok(canonical) if canonical.starts_with(root) => Ok(canonical),
        Ok(canonical) => Err(escape(&canonical, "Symlink resolves outside the storage root")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => check_ancestors(root, joined),
        Err(e) => Err(StorageError::Io { source: e, context: Some("Path resolution failed".into()) }),
    }
}

fn check_ancestors(root: &Path, joined: PathBuf) -> Result<PathBuf, StorageError> {
    let mut current = joined.parent();

    while let Some(path) = current {
        if path == root {
            return Ok(joined);
        }
        if path.exists() {
            return match path.canonicalize() {
                Ok(canonical) if canonical.starts_with(root) => Ok(joined),
                Ok(_) => Err(escape(path, "Ancestor directory resolves outside the storage root")),
                Err(e) => Err(StorageError::Io {
                    source: e,
                    context: Some("Failed to verify parent directory".into()),
                }),
            };
        }
        current = path.parent();
    }

    Err(escape(&joined, "No ancestor inside the storage root"))
}
