//! Artifact store trait and error types
//!
//! This module defines the trait interface for artifact storage backends and
//! the associated error type.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during artifact storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid artifact path: {0}")]
    InvalidPath(PathBuf),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for artifact storage backends
///
/// All paths are relative to the store's root. Implementations must be safe
/// to share between concurrent harvest tasks; each task only ever touches
/// its own artifacts.
pub trait ArtifactStore: Send + Sync {
    // ===== Writes =====

    /// Writes `bytes` to `path`, replacing any previous content
    ///
    /// Parent directories are created as needed.
    fn write(&self, path: &Path, bytes: &[u8]) -> StorageResult<()>;

    /// Atomically renames an artifact
    fn rename(&self, from: &Path, to: &Path) -> StorageResult<()>;

    /// Copies an artifact, creating the destination's parent directories
    fn copy(&self, from: &Path, to: &Path) -> StorageResult<()>;

    /// Removes one artifact; a missing artifact is not an error
    fn remove(&self, path: &Path) -> StorageResult<()>;

    /// Removes a directory and everything under it, then recreates it empty
    fn reset_dir(&self, dir: &Path) -> StorageResult<()>;

    // ===== Reads =====

    /// Reads an artifact's bytes
    fn read(&self, path: &Path) -> StorageResult<Vec<u8>>;

    /// Lists the files directly inside `dir`, sorted by name
    ///
    /// A missing directory lists as empty.
    fn list(&self, dir: &Path) -> StorageResult<Vec<PathBuf>>;

    /// Lists the subdirectories directly inside `dir`, sorted by name
    fn list_dirs(&self, dir: &Path) -> StorageResult<Vec<PathBuf>>;

    /// Returns true if an artifact exists at `path`
    fn exists(&self, path: &Path) -> bool;
}
