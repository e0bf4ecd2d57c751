//! Path containment checks for batch targets.
//!
//! Resolution here is strictly lexical: `.` and `..` are folded without
//! consulting the filesystem, so symlinks are never followed. Containment is
//! decided with `Path::starts_with`, which compares whole path segments, so
//! `/home/user` is not a prefix of `/home/userx`.

use std::path::{Component, Path, PathBuf};

use crate::domain::error::DomainError;

/// Resolve `path` against `root` and require the result to stay inside it.
///
/// The root must be absolute; a relative `path` is interpreted relative to
/// the root. Returns the normalized absolute target on success.
pub fn validate(path: &Path, root: &Path) -> Result<PathBuf, DomainError> {
    if !root.is_absolute() {
        return Err(DomainError::PathNotAbsolute {
            path: root.to_path_buf(),
        });
    }

    let root = normalize(root);
    let candidate = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };
    let resolved = normalize(&candidate);

    if resolved.starts_with(&root) {
        Ok(resolved)
    } else {
        Err(DomainError::PathTraversal {
            path: resolved,
            root,
        })
    }
}

/// Fold `.` and `..` components without touching the filesystem.
///
/// `..` pops the previous normal segment; above the root of an absolute
/// path it is ignored (POSIX `/..` is `/`), while a relative path keeps
/// leading `..` segments since there is nothing to pop.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let poppable = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if poppable {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}
