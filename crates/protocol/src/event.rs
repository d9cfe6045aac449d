//! Transfer events.
//!
//! Events are immutable snapshots. A PROGRESSED event owns a
//! reference-counted copy of the chunk it reports, so listeners may keep
//! events (and their buffers) after the callback returns.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use crate::error::TransferError;
use crate::request::Direction;
use crate::resource::Resource;

/// State reached by a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferEventType {
    Initiated,
    Started,
    Progressed,
    Succeeded,
    Failed,
    Corrupted,
}

impl TransferEventType {
    /// Whether no further event may follow for the same transfer.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TransferEventType::Succeeded | TransferEventType::Failed | TransferEventType::Corrupted
        )
    }
}

impl fmt::Display for TransferEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransferEventType::Initiated => "INITIATED",
            TransferEventType::Started => "STARTED",
            TransferEventType::Progressed => "PROGRESSED",
            TransferEventType::Succeeded => "SUCCEEDED",
            TransferEventType::Failed => "FAILED",
            TransferEventType::Corrupted => "CORRUPTED",
        };
        f.write_str(s)
    }
}

/// The resource a transfer moves, as seen by the transport.
#[derive(Debug)]
pub struct TransferResource {
    repository_url: String,
    resource_name: String,
    file: PathBuf,
    resource: Resource,
    content_length: OnceLock<u64>,
}

impl TransferResource {
    pub fn new(
        repository_url: impl Into<String>,
        resource_name: impl Into<String>,
        file: impl Into<PathBuf>,
        resource: Resource,
    ) -> Self {
        Self {
            repository_url: repository_url.into(),
            resource_name: resource_name.into(),
            file: file.into(),
            resource,
            content_length: OnceLock::new(),
        }
    }

    /// Base URL of the repository, ending in `/`.
    pub fn repository_url(&self) -> &str {
        &self.repository_url
    }

    /// Path of the resource relative to the repository base.
    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    /// Local file read from or written to.
    pub fn file(&self) -> &PathBuf {
        &self.file
    }

    /// Descriptor of the artifact or metadata being moved.
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Total size in bytes, once the transport knows it.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length.get().copied()
    }

    /// Records the total size. Only the first call has an effect.
    pub fn set_content_length(&self, length: u64) {
        let _ = self.content_length.set(length);
    }
}

impl fmt::Display for TransferResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.repository_url, self.resource_name)
    }
}

/// The chunk reported by a PROGRESSED event.
///
/// Well formed iff `offset < length` and `offset + length <= buffer.len()`.
#[derive(Debug, Clone)]
pub struct DataWindow {
    buffer: Arc<[u8]>,
    offset: usize,
    length: usize,
}

impl DataWindow {
    /// Builds a window without validating it; see [`is_well_formed`](Self::is_well_formed).
    pub fn new(buffer: Arc<[u8]>, offset: usize, length: usize) -> Self {
        Self {
            buffer,
            offset,
            length,
        }
    }

    /// A window covering the whole chunk.
    pub fn from_chunk(chunk: Arc<[u8]>) -> Self {
        let length = chunk.len();
        Self::new(chunk, 0, length)
    }

    pub fn buffer(&self) -> &Arc<[u8]> {
        &self.buffer
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn is_well_formed(&self) -> bool {
        self.offset < self.length
            && self
                .offset
                .checked_add(self.length)
                .is_some_and(|end| end <= self.buffer.len())
    }

    /// The bytes inside the window, or an empty slice if it is malformed.
    pub fn bytes(&self) -> &[u8] {
        self.offset
            .checked_add(self.length)
            .and_then(|end| self.buffer.get(self.offset..end))
            .unwrap_or(&[])
    }
}

/// One state transition of one transfer.
#[derive(Debug, Clone)]
pub struct TransferEvent {
    event_type: TransferEventType,
    resource: Arc<TransferResource>,
    request_type: Direction,
    transferred_bytes: u64,
    data: Option<DataWindow>,
    error: Option<Arc<TransferError>>,
}

impl TransferEvent {
    pub fn new(
        event_type: TransferEventType,
        resource: Arc<TransferResource>,
        request_type: Direction,
    ) -> Self {
        Self {
            event_type,
            resource,
            request_type,
            transferred_bytes: 0,
            data: None,
            error: None,
        }
    }

    pub fn with_transferred_bytes(mut self, bytes: u64) -> Self {
        self.transferred_bytes = bytes;
        self
    }

    pub fn with_data(mut self, window: DataWindow) -> Self {
        self.data = Some(window);
        self
    }

    pub fn with_error(mut self, error: Arc<TransferError>) -> Self {
        self.error = Some(error);
        self
    }

    pub fn event_type(&self) -> TransferEventType {
        self.event_type
    }

    pub fn resource(&self) -> &Arc<TransferResource> {
        &self.resource
    }

    pub fn request_type(&self) -> Direction {
        self.request_type
    }

    /// Cumulative bytes moved when the event was emitted.
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes
    }

    /// The chunk window; `Some` only for PROGRESSED events.
    pub fn data(&self) -> Option<&DataWindow> {
        self.data.as_ref()
    }

    /// Length of the reported chunk, 0 when there is none.
    pub fn data_length(&self) -> usize {
        self.data.as_ref().map_or(0, DataWindow::length)
    }

    pub fn error(&self) -> Option<&Arc<TransferError>> {
        self.error.as_ref()
    }
}

impl fmt::Display for TransferEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ({} bytes)",
            self.event_type, self.request_type, self.resource, self.transferred_bytes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Artifact;

    fn resource() -> Arc<TransferResource> {
        Arc::new(TransferResource::new(
            "file:///repo/",
            "g/a/1/a-1.jar",
            "/tmp/a.jar",
            Artifact::new("g", "a", "", "jar", "1").into(),
        ))
    }

    #[test]
    fn full_chunk_window_is_well_formed() {
        let w = DataWindow::from_chunk(Arc::from(&b"abcd"[..]));
        assert!(w.is_well_formed());
        assert_eq!(w.bytes(), b"abcd");
    }

    #[test]
    fn overrunning_window_is_malformed() {
        let w = DataWindow::new(Arc::from(&b"abcd"[..]), 1, 4);
        assert!(!w.is_well_formed());
        assert!(w.bytes().is_empty());
    }

    #[test]
    fn empty_window_is_malformed() {
        let w = DataWindow::from_chunk(Arc::from(&b""[..]));
        assert!(!w.is_well_formed());
    }

    #[test]
    fn content_length_is_set_once() {
        let r = resource();
        assert_eq!(r.content_length(), None);
        r.set_content_length(10);
        r.set_content_length(20);
        assert_eq!(r.content_length(), Some(10));
    }

    #[test]
    fn event_display() {
        let e = TransferEvent::new(TransferEventType::Succeeded, resource(), Direction::Upload)
            .with_transferred_bytes(42);
        assert_eq!(
            e.to_string(),
            "SUCCEEDED upload file:///repo/g/a/1/a-1.jar (42 bytes)"
        );
        assert!(e.event_type().is_terminal());
        assert_eq!(e.data_length(), 0);
    }
}
