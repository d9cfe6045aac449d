use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use depot_protocol::TransferError;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use crate::DEFAULT_CHUNK_SIZE;

// ---------------------------------------------------------------------------
// Checksum helpers
// ---------------------------------------------------------------------------

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Incremental SHA-256 over the chunks of one transfer.
#[derive(Clone, Default)]
pub struct Sha256Digest {
    hasher: Sha256,
}

impl Sha256Digest {
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Hex-encoded digest of everything fed so far.
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Reads an upload source in fixed-size chunks.
///
/// Chunks are handed out as `Arc<[u8]>` so the PROGRESSED event reporting
/// one can share its bytes.
pub struct ChunkReader {
    file: tokio::fs::File,
    chunk_size: usize,
    offset: u64,
    file_size: u64,
}

impl ChunkReader {
    /// Opens `path` for chunked reading.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] is used.
    pub async fn open(path: &Path, chunk_size: usize) -> Result<Self, TransferError> {
        let file = tokio::fs::File::open(path).await?;
        let file_size = file.metadata().await?.len();
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Ok(Self {
            file,
            chunk_size,
            offset: 0,
            file_size,
        })
    }

    /// Reads the next chunk. Returns `None` once `file_size` bytes were read.
    ///
    /// A file that shrinks while being read fails with
    /// [`TransferError::Truncated`].
    pub async fn next_chunk(&mut self) -> Result<Option<Arc<[u8]>>, TransferError> {
        let remaining = self.remaining();
        if remaining == 0 {
            return Ok(None);
        }

        let read_size = remaining.min(self.chunk_size as u64) as usize;
        let mut buf = vec![0u8; read_size];
        let n = self.file.read(&mut buf).await?;
        if n == 0 {
            return Err(TransferError::Truncated {
                expected: self.file_size,
                actual: self.offset,
            });
        }
        buf.truncate(n);
        self.offset += n as u64;
        Ok(Some(Arc::from(buf)))
    }

    /// Size of the file when it was opened.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Bytes remaining to read.
    pub fn remaining(&self) -> u64 {
        self.file_size.saturating_sub(self.offset)
    }
}

// ---------------------------------------------------------------------------
// PartFileWriter
// ---------------------------------------------------------------------------

/// Writes a download to `<target>.part` and moves it into place only when
/// [`persist`](Self::persist) is called.
///
/// Dropping the writer without persisting removes the partial file.
pub struct PartFileWriter {
    target: PathBuf,
    part: PathBuf,
    file: Option<tokio::fs::File>,
    written: u64,
    finished: bool,
}

impl PartFileWriter {
    /// Creates the partial file, including missing parent directories.
    pub async fn create(target: &Path) -> Result<Self, TransferError> {
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let part = part_path(target);
        let file = tokio::fs::File::create(&part).await?;
        Ok(Self {
            target: target.to_path_buf(),
            part,
            file: Some(file),
            written: 0,
            finished: false,
        })
    }

    /// Appends `data` to the partial file.
    pub async fn write_chunk(&mut self, data: &[u8]) -> Result<(), TransferError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| TransferError::Transport("partial file already closed".into()))?;
        file.write_all(data).await?;
        self.written += data.len() as u64;
        Ok(())
    }

    /// Flushes and renames the partial file onto the target.
    pub async fn persist(mut self) -> Result<PathBuf, TransferError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        tokio::fs::rename(&self.part, &self.target).await?;
        self.finished = true;
        debug!(path = %self.target.display(), bytes = self.written, "download persisted");
        Ok(self.target.clone())
    }

    /// Removes the partial file.
    pub async fn discard(mut self) {
        self.file.take();
        match tokio::fs::remove_file(&self.part).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                debug!(path = %self.part.display(), error = %e, "failed to remove partial file");
            }
            _ => {}
        }
        self.finished = true;
    }

    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn part_path(&self) -> &Path {
        &self.part
    }
}

impl Drop for PartFileWriter {
    fn drop(&mut self) {
        if !self.finished {
            self.file.take();
            let _ = std::fs::remove_file(&self.part);
        }
    }
}

fn part_path(target: &Path) -> PathBuf {
    let mut name: OsString = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    target.with_file_name(name)
}
