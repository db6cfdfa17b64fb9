// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Solstice Pay

//! Filesystem persistence.
//!
//! Everything is JSON, file-per-entry, written atomically: serialize to a
//! temp file in the same directory, then rename over the final path. A crash
//! mid-write leaves either the old file or the new one, never a torn half.
//!
//! Two stores live here: the transaction record repository
//! ([`records::TransactionRepository`]) and a generic [`BlobStore`] for
//! encrypted key blobs. Neither holds open handles between operations.

pub mod records;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Storage layer failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Layout of the service's data directory.
#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Transaction records, one JSON file per transfer.
    pub fn transfers_dir(&self) -> PathBuf {
        self.root.join("transfers")
    }

    /// Encrypted key blobs.
    pub fn vault_dir(&self) -> PathBuf {
        self.root.join("vault")
    }

    /// Create the directory tree if missing.
    pub fn ensure(&self) -> Result<(), StorageError> {
        fs::create_dir_all(self.transfers_dir())?;
        fs::create_dir_all(self.vault_dir())?;
        Ok(())
    }
}

/// Write `bytes` to `path` atomically via a sibling temp file.
pub(crate) fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Keyed byte storage for encrypted key blobs.
pub trait BlobStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
    fn set(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;
    fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Filesystem-backed blob store, one file per key.
pub struct FsBlobStore {
    dir: PathBuf,
}

impl FsBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.blob"))
    }
}

impl BlobStore for FsBlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        atomic_write(&self.path_for(key), bytes)?;
        debug!(key, "blob stored");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
