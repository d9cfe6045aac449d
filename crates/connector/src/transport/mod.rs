//! Transport trait and built-in transports.
//!
//! A [`Transport`] moves raw bytes of one repository path at a time; the
//! connector owns chunking, events, checksums and timeouts. Using a trait
//! keeps the connector independent of any wire library and testable with
//! in-memory transports.

mod file;
mod memory;
mod registry;

pub use file::{FileTransport, FileTransportProvider};
pub use memory::{MemoryStore, MemoryTransport, MemoryTransportProvider};
pub use registry::TransportRegistry;

use std::sync::Arc;

use depot_protocol::{BoxFuture, ConnectorError, RemoteRepository, TransferError};

/// Byte access to one remote repository.
pub trait Transport: Send + Sync {
    /// Opens `path` for reading.
    ///
    /// A missing resource fails with [`TransferError::NotFound`].
    fn open_read<'a>(
        &'a self,
        path: &'a str,
    ) -> BoxFuture<'a, Result<Box<dyn RemoteReader>, TransferError>>;

    /// Opens `path` for writing. Nothing is visible at `path` before
    /// [`RemoteWriter::commit`].
    fn open_write<'a>(
        &'a self,
        path: &'a str,
    ) -> BoxFuture<'a, Result<Box<dyn RemoteWriter>, TransferError>>;

    /// Releases connections and pools.
    fn close(&self) {}
}

/// An open remote resource being read.
pub trait RemoteReader: Send {
    /// Size announced by the remote side, if any.
    fn content_length(&self) -> Option<u64>;

    /// Reads up to `buf.len()` bytes. `Ok(0)` means end of resource.
    fn read_chunk<'a>(
        &'a mut self,
        buf: &'a mut [u8],
    ) -> BoxFuture<'a, Result<usize, TransferError>>;
}

/// An open remote resource being written.
pub trait RemoteWriter: Send {
    fn write_chunk<'a>(&'a mut self, data: &'a [u8]) -> BoxFuture<'a, Result<(), TransferError>>;

    /// Publishes everything written so far at the target path.
    fn commit(&mut self) -> BoxFuture<'_, Result<(), TransferError>>;

    /// Drops everything written so far.
    fn abort(&mut self) -> BoxFuture<'_, ()>;
}

/// Creates transports for the URL schemes it handles.
pub trait TransportProvider: Send + Sync {
    /// Lower-case URL schemes served by this provider.
    fn schemes(&self) -> &[&'static str];

    fn new_transport(
        &self,
        repository: &RemoteRepository,
    ) -> Result<Arc<dyn Transport>, ConnectorError>;

    /// Called once when the owning connector closes.
    fn release(&self, transport: &dyn Transport) {
        transport.close();
    }
}

/// Reads a small remote resource completely, giving up past `limit` bytes.
pub(crate) async fn read_to_end(
    reader: &mut dyn RemoteReader,
    limit: usize,
) -> Result<Vec<u8>, TransferError> {
    let mut content = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = reader.read_chunk(&mut buf).await?;
        if n == 0 {
            break;
        }
        content.extend_from_slice(&buf[..n]);
        if content.len() > limit {
            return Err(TransferError::Transport(format!(
                "resource exceeds {limit} bytes"
            )));
        }
    }
    Ok(content)
}
