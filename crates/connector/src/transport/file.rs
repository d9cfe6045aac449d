//! Local filesystem repositories (`file:` URLs).
//!
//! Layout:
//! ```text
//! <root>/
//!   <resource path>          committed resources
//!   <resource path>.<id>.tmp  uploads in flight
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use depot_protocol::{BoxFuture, ConnectorError, RemoteRepository, TransferError};
use depot_transfer::validate_resource_path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use super::{RemoteReader, RemoteWriter, Transport, TransportProvider};

/// A repository rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FileTransport {
    root: PathBuf,
}

impl FileTransport {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, TransferError> {
        validate_resource_path(path)?;
        Ok(self.root.join(path))
    }
}

fn map_open_error(e: std::io::Error, path: &str) -> TransferError {
    match e.kind() {
        ErrorKind::NotFound => TransferError::NotFound(path.to_string()),
        ErrorKind::PermissionDenied => TransferError::Unauthorized(path.to_string()),
        _ => TransferError::Io(e),
    }
}

impl Transport for FileTransport {
    fn open_read<'a>(
        &'a self,
        path: &'a str,
    ) -> BoxFuture<'a, Result<Box<dyn RemoteReader>, TransferError>> {
        Box::pin(async move {
            let full = self.resolve(path)?;
            let file = tokio::fs::File::open(&full)
                .await
                .map_err(|e| map_open_error(e, path))?;
            let metadata = file.metadata().await?;
            if !metadata.is_file() {
                return Err(TransferError::NotFound(path.to_string()));
            }
            Ok::<_, TransferError>(Box::new(FileReader {
                file,
                length: metadata.len(),
            }) as Box<dyn RemoteReader>)
        })
    }

    fn open_write<'a>(
        &'a self,
        path: &'a str,
    ) -> BoxFuture<'a, Result<Box<dyn RemoteWriter>, TransferError>> {
        Box::pin(async move {
            let target = self.resolve(path)?;
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| map_open_error(e, path))?;
            }
            let file_name = target
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let temp = target.with_file_name(format!("{file_name}.{}.tmp", uuid::Uuid::new_v4()));
            let file = tokio::fs::File::create(&temp)
                .await
                .map_err(|e| map_open_error(e, path))?;
            Ok::<_, TransferError>(Box::new(FileWriter {
                file: Some(file),
                temp,
                target,
                committed: false,
            }) as Box<dyn RemoteWriter>)
        })
    }
}

struct FileReader {
    file: tokio::fs::File,
    length: u64,
}

impl RemoteReader for FileReader {
    fn content_length(&self) -> Option<u64> {
        Some(self.length)
    }

    fn read_chunk<'a>(
        &'a mut self,
        buf: &'a mut [u8],
    ) -> BoxFuture<'a, Result<usize, TransferError>> {
        Box::pin(async move { Ok::<_, TransferError>(self.file.read(buf).await?) })
    }
}

struct FileWriter {
    file: Option<tokio::fs::File>,
    temp: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl RemoteWriter for FileWriter {
    fn write_chunk<'a>(&'a mut self, data: &'a [u8]) -> BoxFuture<'a, Result<(), TransferError>> {
        Box::pin(async move {
            let file = self
                .file
                .as_mut()
                .ok_or_else(|| TransferError::Transport("writer already closed".into()))?;
            file.write_all(data).await?;
            Ok::<_, TransferError>(())
        })
    }

    fn commit(&mut self) -> BoxFuture<'_, Result<(), TransferError>> {
        Box::pin(async move {
            let mut file = self
                .file
                .take()
                .ok_or_else(|| TransferError::Transport("writer already closed".into()))?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&self.temp, &self.target).await?;
            self.committed = true;
            debug!(path = %self.target.display(), "resource committed");
            Ok::<_, TransferError>(())
        })
    }

    fn abort(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.file.take();
            let _ = tokio::fs::remove_file(&self.temp).await;
        })
    }
}

impl Drop for FileWriter {
    fn drop(&mut self) {
        if !self.committed {
            self.file.take();
            let _ = std::fs::remove_file(&self.temp);
        }
    }
}

/// Serves `file:` repositories.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTransportProvider;

impl TransportProvider for FileTransportProvider {
    fn schemes(&self) -> &[&'static str] {
        &["file"]
    }

    fn new_transport(
        &self,
        repository: &RemoteRepository,
    ) -> Result<Arc<dyn Transport>, ConnectorError> {
        let root = file_url_to_path(&repository.url).ok_or_else(|| ConnectorError::NoConnector {
            repository: repository.id.clone(),
            reason: format!("not a file URL: {}", repository.url),
        })?;
        debug!(repository = %repository.id, root = %root.display(), "file transport created");
        Ok(Arc::new(FileTransport::new(root)))
    }
}

/// Converts `file:///abs/path`, `file://localhost/abs/path` or
/// `file:rel/path` into a filesystem path.
pub(crate) fn file_url_to_path(url: &str) -> Option<PathBuf> {
    let (scheme, rest) = url.split_once(':')?;
    if !scheme.eq_ignore_ascii_case("file") {
        return None;
    }
    let path = match rest.strip_prefix("//") {
        Some(after) => {
            let after = after.strip_prefix("localhost").unwrap_or(after);
            if !after.starts_with('/') {
                return None;
            }
            // `/C:/repo` on Windows.
            let bytes = after.as_bytes();
            if bytes.len() >= 3 && bytes[2] == b':' && bytes[1].is_ascii_alphabetic() {
                &after[1..]
            } else {
                after
            }
        }
        None => rest,
    };
    if path.is_empty() {
        return None;
    }
    Some(PathBuf::from(path))
}
