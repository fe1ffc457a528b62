//! Photo storage

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{ProductoError, ProductoResult};

/// Writes uploaded bytes under a destination filename
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileSink: Send + Sync {
    async fn write(&self, filename: &str, data: Bytes) -> ProductoResult<()>;
}

/// `<uuid-v4>-<original>` with spaces, `:` and `\` removed from the original
pub fn photo_filename(original: &str) -> String {
    let sanitized: String = original
        .chars()
        .filter(|c| !matches!(c, ' ' | ':' | '\\'))
        .collect();
    format!("{}-{}", Uuid::new_v4(), sanitized)
}

/// [`FileSink`] writing into a local directory
#[derive(Debug, Clone)]
pub struct LocalFileSink {
    upload_dir: PathBuf,
}

impl LocalFileSink {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Create the upload directory and its parents if missing
    pub async fn ensure_dir(&self) -> ProductoResult<()> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        Ok(())
    }
}

#[async_trait]
impl FileSink for LocalFileSink {
    #[instrument(skip(self, data), fields(size = data.len()))]
    async fn write(&self, filename: &str, data: Bytes) -> ProductoResult<()> {
        // Only a bare file name may be joined onto the upload dir.
        if Path::new(filename).file_name().and_then(|n| n.to_str()) != Some(filename) {
            return Err(ProductoError::Storage(format!(
                "refusing to write outside the upload directory: {filename}"
            )));
        }

        let path = self.upload_dir.join(filename);
        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(&data).await?;
        file.flush().await?;

        tracing::info!(foto = %filename, "Photo written");
        Ok(())
    }
}
