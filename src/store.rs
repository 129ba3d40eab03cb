//! Persisted per-employee reference embeddings.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::embedding::Embedding;

/// One employee's enrolled reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub id: String,
    pub embedding: Embedding,
}

/// Insertion-ordered reference store.
///
/// Records live in a Vec so iteration (and therefore the first-wins tie rule
/// during matching) follows enrollment order, and postcard round-trips that
/// order verbatim.
#[derive(Debug, Default)]
pub struct ReferenceStore {
    records: Vec<EmployeeRecord>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read reference store {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("reference store {} is corrupt", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: postcard::Error,
    },
    #[error("failed to encode reference store")]
    Encode(#[source] postcard::Error),
    #[error("failed to write reference store {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to remove reference store {}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the store from disk. An absent file is an empty store, not an
    /// error.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let data = std::fs::read(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let records = postcard::from_bytes(&data).map_err(|source| StoreError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { records })
    }

    /// Write the whole store to `path`, replacing previous content
    /// atomically: encode into a uniquely named sibling file, then rename it
    /// over the target. Readers see either the old store or the new one.
    pub fn persist(&self, path: &Path) -> Result<(), StoreError> {
        let data = postcard::to_allocvec(&self.records).map_err(StoreError::Encode)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                    path: path.to_path_buf(),
                    source,
                })?;
            }
        }

        let tmp = tmp_sibling(path);
        std::fs::write(&tmp, &data).map_err(|source| StoreError::Write {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, path).map_err(|source| {
            let _ = std::fs::remove_file(&tmp);
            StoreError::Write {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    /// Delete the store file. Absent file is fine.
    pub fn purge(path: &Path) -> Result<(), StoreError> {
        if path.exists() {
            std::fs::remove_file(path).map_err(|source| StoreError::Remove {
                path: path.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&EmployeeRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Insert a reference, fully replacing any previous one for the same id.
    /// A replaced id keeps its original position.
    pub fn upsert(&mut self, id: &str, embedding: Embedding) {
        match self.records.iter_mut().find(|r| r.id == id) {
            Some(record) => record.embedding = embedding,
            None => self.records.push(EmployeeRecord {
                id: id.to_string(),
                embedding,
            }),
        }
    }

    /// Remove one employee's reference. Returns whether it existed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        self.records.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &EmployeeRecord> {
        self.records.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.id.as_str())
    }
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "references.bin".into());
    name.push(format!(".{}.tmp", uuid::Uuid::new_v4()));
    path.with_file_name(name)
}
