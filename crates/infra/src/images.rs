//! Part image files on local disk, served under `/static/images`.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument};

use mast_inventory::StoredImageName;

#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("image i/o failed in {operation}: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: io::Error,
    },
}

impl ImageStoreError {
    fn io(operation: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| Self::Io { operation, source }
    }
}

/// Directory of stored images (`<static_dir>/images`).
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(static_dir: impl AsRef<Path>) -> Self {
        Self {
            root: static_dir.as_ref().join("images"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_dir(&self) -> Result<(), ImageStoreError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(ImageStoreError::io("ensure_dir"))
    }

    #[instrument(skip(self, bytes), fields(name = name.as_str(), size = bytes.len()), err)]
    pub async fn save(&self, name: &StoredImageName, bytes: &[u8]) -> Result<(), ImageStoreError> {
        self.ensure_dir().await?;
        tokio::fs::write(self.root.join(name.as_str()), bytes)
            .await
            .map_err(ImageStoreError::io("save"))?;
        debug!("image stored");
        Ok(())
    }

    /// `None` when no such file exists.
    pub async fn load(&self, name: &StoredImageName) -> Result<Option<Vec<u8>>, ImageStoreError> {
        match tokio::fs::read(self.root.join(name.as_str())).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ImageStoreError::io("load")(e)),
        }
    }

    /// Remove a stored image; a missing file is not an error.
    pub async fn remove(&self, name: &StoredImageName) -> Result<(), ImageStoreError> {
        match tokio::fs::remove_file(self.root.join(name.as_str())).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ImageStoreError::io("remove")(e)),
        }
    }
}
