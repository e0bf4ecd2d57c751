use std::collections::HashSet;
use std::path::PathBuf;

use crate::domain::{error::DomainError, path_guard};

/// Final batch plan ready for application.
///
/// This is the input to `BatchService::apply`: one absolute root plus the
/// entries to materialize beneath it. It contains no orchestration logic,
/// only data and its validation.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    pub(crate) root: PathBuf,
    pub(crate) entries: Vec<PlanEntry>,
}

impl BatchPlan {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: Vec::new(),
        }
    }

    pub fn add_file(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.entries.push(PlanEntry::File(FileToWrite {
            path: path.into(),
            content: content.into(),
        }));
    }

    pub fn add_directory(&mut self, path: impl Into<PathBuf>) {
        self.entries.push(PlanEntry::Dir(DirToCreate { path: path.into() }));
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.add_file(path, content);
        self
    }

    pub fn with_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.add_directory(path);
        self
    }

    /// Structural validation: absolute root, at least one entry, relative
    /// entry paths, no two entries resolving to the same target.
    ///
    /// Duplicate detection runs on lexically normalized paths, so `a/b` and
    /// `a/./b` count as the same target.
    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.root.is_absolute() {
            return Err(DomainError::PathNotAbsolute {
                path: self.root.clone(),
            });
        }

        if self.entries.is_empty() {
            return Err(DomainError::EmptyPlan);
        }

        let mut seen = HashSet::new();
        for entry in &self.entries {
            let path = entry.path();

            if path.is_absolute() {
                return Err(DomainError::AbsolutePathNotAllowed {
                    path: path.display().to_string(),
                });
            }

            let normalized = path_guard::normalize(path);
            if !seen.insert(normalized) {
                return Err(DomainError::DuplicatePath {
                    path: path.display().to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn files(&self) -> impl Iterator<Item = &FileToWrite> {
        self.entries.iter().filter_map(|e| match e {
            PlanEntry::File(f) => Some(f),
            _ => None,
        })
    }

    pub fn directories(&self) -> impl Iterator<Item = &DirToCreate> {
        self.entries.iter().filter_map(|e| match e {
            PlanEntry::Dir(d) => Some(d),
            _ => None,
        })
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone)]
pub enum PlanEntry {
    File(FileToWrite),
    Dir(DirToCreate),
}

impl PlanEntry {
    /// Target path of this entry, relative to the plan root.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::File(f) => &f.path,
            Self::Dir(d) => &d.path,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileToWrite {
    pub path: PathBuf,
    pub content: String,
}

impl FileToWrite {
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}

#[derive(Debug, Clone)]
pub struct DirToCreate {
    pub path: PathBuf,
}
