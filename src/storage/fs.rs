//! Filesystem artifact store
//!
//! Artifacts live as plain files under a root directory.

use crate::storage::traits::{ArtifactStore, StorageError, StorageResult};
use std::path::{Component, Path, PathBuf};

/// Artifact store backed by a directory on disk
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Creates a store rooted at `root`
    ///
    /// The directory itself is created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory of this store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a store-relative path, rejecting absolute or escaping paths
    fn resolve(&self, path: &Path) -> StorageResult<PathBuf> {
        let escapes = path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

        if escapes {
            return Err(StorageError::InvalidPath(path.to_path_buf()));
        }

        Ok(self.root.join(path))
    }

    fn ensure_parent(full: &Path) -> StorageResult<()> {
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        Ok(())
    }

    fn list_entries(&self, dir: &Path, want_dirs: bool) -> StorageResult<Vec<PathBuf>> {
        let full = self.resolve(dir)?;
        if !full.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&full).map_err(|e| io_error(&full, e))? {
            let entry = entry.map_err(|e| io_error(&full, e))?;
            let file_type = entry.file_type().map_err(|e| io_error(&entry.path(), e))?;
            if file_type.is_dir() == want_dirs {
                entries.push(dir.join(entry.file_name()));
            }
        }

        entries.sort();
        Ok(entries)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl ArtifactStore for FsArtifactStore {
    fn write(&self, path: &Path, bytes: &[u8]) -> StorageResult<()> {
        let full = self.resolve(path)?;
        Self::ensure_parent(&full)?;
        std::fs::write(&full, bytes).map_err(|e| io_error(&full, e))
    }

    fn rename(&self, from: &Path, to: &Path) -> StorageResult<()> {
        let source = self.resolve(from)?;
        let target = self.resolve(to)?;
        Self::ensure_parent(&target)?;
        std::fs::rename(&source, &target).map_err(|e| io_error(&source, e))
    }

    fn copy(&self, from: &Path, to: &Path) -> StorageResult<()> {
        let source = self.resolve(from)?;
        let target = self.resolve(to)?;
        Self::ensure_parent(&target)?;
        std::fs::copy(&source, &target)
            .map(|_| ())
            .map_err(|e| io_error(&source, e))
    }

    fn remove(&self, path: &Path) -> StorageResult<()> {
        let full = self.resolve(path)?;
        match std::fs::remove_file(&full) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&full, e)),
        }
    }

    fn reset_dir(&self, dir: &Path) -> StorageResult<()> {
        let full = self.resolve(dir)?;
        if full.is_dir() {
            std::fs::remove_dir_all(&full).map_err(|e| io_error(&full, e))?;
        }
        std::fs::create_dir_all(&full).map_err(|e| io_error(&full, e))
    }

    fn read(&self, path: &Path) -> StorageResult<Vec<u8>> {
        let full = self.resolve(path)?;
        std::fs::read(&full).map_err(|e| io_error(&full, e))
    }

    fn list(&self, dir: &Path) -> StorageResult<Vec<PathBuf>> {
        self.list_entries(dir, false)
    }

    fn list_dirs(&self, dir: &Path) -> StorageResult<Vec<PathBuf>> {
        self.list_entries(dir, true)
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).map(|p| p.exists()).unwrap_or(false)
    }
}
