//! On-disk storage for uploaded media blobs.
//!
//! Blobs live outside the database and are addressed by the generated name
//! stored in `media.link`. The database row is authoritative; removing a blob
//! is not transactional with the row that references it.

use std::path::{Component, Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Invalid blob name: {0}")]
    InvalidName(String),

    #[error("Empty blob")]
    Empty,

    #[error("I/O error on blob {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

pub trait BlobStore: Send + Sync {
    fn put(&self, name: &str, data: &[u8]) -> Result<(), BlobError>;

    fn get(&self, name: &str) -> Result<Vec<u8>, BlobError>;

    fn delete(&self, name: &str) -> Result<(), BlobError>;

    fn exists(&self, name: &str) -> bool;
}

/// Blob store backed by a flat directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    base_path: PathBuf,
}

impl FsBlobStore {
    pub fn new(base_path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;
        tracing::info!(path = %base_path.display(), "Blob store initialized");
        Ok(Self { base_path })
    }

    /// Resolve `name` inside the base directory, refusing anything that is not
    /// a single plain file name.
    fn blob_path(&self, name: &str) -> Result<PathBuf, BlobError> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) if !name.contains('\\') => {
                Ok(self.base_path.join(name))
            }
            _ => Err(BlobError::InvalidName(name.to_string())),
        }
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, name: &str, data: &[u8]) -> Result<(), BlobError> {
        if data.is_empty() {
            return Err(BlobError::Empty);
        }
        let path = self.blob_path(name)?;
        std::fs::write(&path, data).map_err(|source| BlobError::Io {
            name: name.to_string(),
            source,
        })?;
        debug!(name, size = data.len(), "Stored blob");
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Vec<u8>, BlobError> {
        let path = self.blob_path(name)?;
        std::fs::read(&path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => BlobError::NotFound(name.to_string()),
            _ => BlobError::Io {
                name: name.to_string(),
                source,
            },
        })
    }

    fn delete(&self, name: &str) -> Result<(), BlobError> {
        let path = self.blob_path(name)?;
        std::fs::remove_file(&path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => BlobError::NotFound(name.to_string()),
            _ => BlobError::Io {
                name: name.to_string(),
                source,
            },
        })?;
        debug!(name, "Deleted blob");
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.blob_path(name).map(|p| p.is_file()).unwrap_or(false)
    }
}

/// Unique storage name for an upload, keeping a short alphanumeric extension
/// from the client's file name.
pub fn generate_blob_name(original: Option<&str>) -> String {
    let ext = original
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "bin".to_string());
    format!("{}.{}", Uuid::new_v4(), ext)
}
