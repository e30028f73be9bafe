//! Persists artifacts to the local filesystem.
//!
//! Targets mirror the media library's own directory layout, so parent
//! directories are expected to exist already. Nothing here creates them.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::StreamExt;
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use super::{AssetStream, CatalogError};

/// Errors that can occur while writing an artifact
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("download for {path} broke off: {source}")]
    Stream {
        path: PathBuf,
        #[source]
        source: CatalogError,
    },
}

/// Destination for exported artifacts
#[async_trait]
pub trait ArtifactWriter: Send + Sync {
    /// Write `contents` to `path`, replacing any existing file
    async fn write(&self, path: &Path, contents: &[u8]) -> Result<(), WriteError>;

    /// Copy a streamed asset to `path`, replacing any existing file.
    /// Returns the number of bytes written.
    async fn write_stream(&self, path: &Path, stream: AssetStream) -> Result<u64, WriteError>;
}

/// [`ArtifactWriter`] backed by `tokio::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct FsArtifactWriter;

impl FsArtifactWriter {
    pub fn new() -> Self {
        Self
    }

    async fn copy_stream(file: &mut File, path: &Path, mut stream: AssetStream) -> Result<u64, WriteError> {
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| WriteError::Stream {
                path: path.to_path_buf(),
                source,
            })?;
            file.write_all(&chunk).await.map_err(|source| io_error(path, source))?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(|source| io_error(path, source))?;
        Ok(written)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> WriteError {
    WriteError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl ArtifactWriter for FsArtifactWriter {
    async fn write(&self, path: &Path, contents: &[u8]) -> Result<(), WriteError> {
        fs::write(path, contents)
            .await
            .map_err(|source| io_error(path, source))
    }

    async fn write_stream(&self, path: &Path, stream: AssetStream) -> Result<u64, WriteError> {
        let mut file = File::create(path)
            .await
            .map_err(|source| io_error(path, source))?;

        match Self::copy_stream(&mut file, path, stream).await {
            Ok(written) => Ok(written),
            Err(e) => {
                // Don't leave a truncated image behind
                drop(file);
                let _ = fs::remove_file(path).await;
                Err(e)
            }
        }
    }
}
