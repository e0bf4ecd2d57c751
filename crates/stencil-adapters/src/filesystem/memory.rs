//! In-memory filesystem adapter for testing.

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use stencil_core::application::ports::Filesystem;
use stencil_core::application::ApplicationError;
use stencil_core::error::StencilResult;

/// In-memory filesystem for testing.
#[derive(Debug, Clone)]
pub struct MemoryFilesystem {
    inner: Arc<RwLock<MemoryFilesystemInner>>,
}

#[derive(Debug, Default)]
struct MemoryFilesystemInner {
    files: HashMap<PathBuf, Vec<u8>>,
    directories: HashSet<PathBuf>,
}

impl MemoryFilesystem {
    /// Create a new empty memory filesystem.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryFilesystemInner::default())),
        }
    }

    /// Read a file's content (testing helper).
    pub fn file_content(&self, path: &Path) -> Option<Vec<u8>> {
        let inner = self.inner.read().ok()?;
        inner.files.get(path).cloned()
    }

    /// List all files.
    pub fn list_files(&self) -> Vec<PathBuf> {
        let inner = self.inner.read().unwrap();
        inner.files.keys().cloned().collect()
    }

    /// Clear all contents.
    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap();
        inner.files.clear();
        inner.directories.clear();
    }
}

impl Default for MemoryFilesystem {
    fn default() -> Self {
        Self::new()
    }
}

impl Filesystem for MemoryFilesystem {
    fn create_dir_all(&self, path: &Path) -> StencilResult<()> {
        let mut inner = self.inner.write().map_err(|_| ApplicationError::LockPoisoned)?;

        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            inner.directories.insert(current.clone());
        }

        Ok(())
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> StencilResult<()> {
        let mut inner = self.inner.write().map_err(|_| ApplicationError::LockPoisoned)?;

        // Ensure parent exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !inner.directories.contains(parent) {
                return Err(ApplicationError::FilesystemError {
                    path: path.to_path_buf(),
                    reason: "Parent directory does not exist".into(),
                }
                .into());
            }
        }

        inner.files.insert(path.to_path_buf(), content.to_vec());
        Ok(())
    }

    fn read_file(&self, path: &Path) -> StencilResult<Vec<u8>> {
        let inner = self.inner.read().map_err(|_| ApplicationError::LockPoisoned)?;

        inner.files.get(path).cloned().ok_or_else(|| {
            ApplicationError::FilesystemError {
                path: path.to_path_buf(),
                reason: "No such file".into(),
            }
            .into()
        })
    }

    fn rename(&self, from: &Path, to: &Path) -> StencilResult<()> {
        let mut inner = self.inner.write().map_err(|_| ApplicationError::LockPoisoned)?;

        if let Some(content) = inner.files.remove(from) {
            inner.files.insert(to.to_path_buf(), content);
            return Ok(());
        }

        if inner.directories.contains(from) {
            let moved_dirs: Vec<PathBuf> = inner
                .directories
                .iter()
                .filter(|p| p.starts_with(from))
                .cloned()
                .collect();
            for dir in moved_dirs {
                inner.directories.remove(&dir);
                if let Ok(rest) = dir.strip_prefix(from) {
                    inner.directories.insert(to.join(rest));
                }
            }

            let moved_files: Vec<PathBuf> = inner
                .files
                .keys()
                .filter(|p| p.starts_with(from))
                .cloned()
                .collect();
            for file in moved_files {
                if let (Some(content), Ok(rest)) =
                    (inner.files.remove(&file), file.strip_prefix(from))
                {
                    inner.files.insert(to.join(rest), content);
                }
            }
            return Ok(());
        }

        Err(ApplicationError::FilesystemError {
            path: from.to_path_buf(),
            reason: "No such file or directory".into(),
        }
        .into())
    }

    fn remove_file(&self, path: &Path) -> StencilResult<()> {
        let mut inner = self.inner.write().map_err(|_| ApplicationError::LockPoisoned)?;

        if inner.files.remove(path).is_none() {
            return Err(ApplicationError::FilesystemError {
                path: path.to_path_buf(),
                reason: "No such file".into(),
            }
            .into());
        }
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> StencilResult<()> {
        let mut inner = self.inner.write().map_err(|_| ApplicationError::LockPoisoned)?;

        inner.directories.retain(|p| !p.starts_with(path));
        inner.files.retain(|p, _| !p.starts_with(path));

        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let inner = self.inner.read().unwrap();
        inner.files.contains_key(path) || inner.directories.contains(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        let inner = self.inner.read().unwrap();
        inner.directories.contains(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_requires_an_existing_parent() {
        let fs = MemoryFilesystem::new();
        assert!(fs.write_file(Path::new("/a/b.txt"), b"x").is_err());

        fs.create_dir_all(Path::new("/a")).unwrap();
        fs.write_file(Path::new("/a/b.txt"), b"x").unwrap();
        assert_eq!(fs.read_file(Path::new("/a/b.txt")).unwrap(), b"x");
    }

    #[test]
    fn rename_moves_a_file() {
        let fs = MemoryFilesystem::new();
        fs.create_dir_all(Path::new("/a")).unwrap();
        fs.write_file(Path::new("/a/old.txt"), b"x").unwrap();

        fs.rename(Path::new("/a/old.txt"), Path::new("/a/new.txt"))
            .unwrap();
        assert!(!fs.exists(Path::new("/a/old.txt")));
        assert_eq!(fs.read_file(Path::new("/a/new.txt")).unwrap(), b"x");
    }

    #[test]
    fn rename_moves_a_directory_tree() {
        let fs = MemoryFilesystem::new();
        fs.create_dir_all(Path::new("/a/sub")).unwrap();
        fs.write_file(Path::new("/a/sub/f.txt"), b"x").unwrap();

        fs.rename(Path::new("/a"), Path::new("/b")).unwrap();
        assert!(fs.is_dir(Path::new("/b/sub")));
        assert_eq!(fs.read_file(Path::new("/b/sub/f.txt")).unwrap(), b"x");
        assert!(!fs.exists(Path::new("/a/sub/f.txt")));
    }

    #[test]
    fn remove_dir_all_takes_the_whole_subtree() {
        let fs = MemoryFilesystem::new();
        fs.create_dir_all(Path::new("/a/b")).unwrap();
        fs.write_file(Path::new("/a/b/f.txt"), b"x").unwrap();

        fs.remove_dir_all(Path::new("/a")).unwrap();
        assert!(!fs.exists(Path::new("/a")));
        assert!(!fs.exists(Path::new("/a/b/f.txt")));
    }
}
