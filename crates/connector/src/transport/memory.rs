//! In-memory repositories (`mem://<name>` URLs).
//!
//! All transports created by one [`MemoryTransportProvider`] share its
//! [`MemoryStore`], keyed by `<name>/<resource path>`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use depot_protocol::{BoxFuture, ConnectorError, RemoteRepository, TransferError};
use depot_transfer::validate_resource_path;
use tracing::debug;

use super::{RemoteReader, RemoteWriter, Transport, TransportProvider};

/// Shared byte store backing in-memory repositories (thread-safe).
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Arc<[u8]>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, data: impl Into<Arc<[u8]>>) {
        let mut entries = self.entries.write().unwrap();
        entries.insert(key.into(), data.into());
    }

    pub fn get(&self, key: &str) -> Option<Arc<[u8]>> {
        self.entries.read().unwrap().get(key).cloned()
    }

    pub fn remove(&self, key: &str) -> Option<Arc<[u8]>> {
        self.entries.write().unwrap().remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().unwrap().contains_key(key)
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

/// One named repository inside a [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    store: MemoryStore,
    name: String,
}

impl MemoryTransport {
    pub fn new(store: MemoryStore, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
        }
    }

    /// Store key of a resource path in this repository.
    pub fn key(&self, path: &str) -> String {
        format!("{}/{}", self.name, path.trim_start_matches("./"))
    }
}

impl Transport for MemoryTransport {
    fn open_read<'a>(
        &'a self,
        path: &'a str,
    ) -> BoxFuture<'a, Result<Box<dyn RemoteReader>, TransferError>> {
        Box::pin(async move {
            validate_resource_path(path)?;
            let data = self
                .store
                .get(&self.key(path))
                .ok_or_else(|| TransferError::NotFound(path.to_string()))?;
            let reader = MemoryReader { data, position: 0 };
            Ok::<_, TransferError>(Box::new(reader) as Box<dyn RemoteReader>)
        })
    }

    fn open_write<'a>(
        &'a self,
        path: &'a str,
    ) -> BoxFuture<'a, Result<Box<dyn RemoteWriter>, TransferError>> {
        Box::pin(async move {
            validate_resource_path(path)?;
            Ok::<_, TransferError>(Box::new(MemoryWriter {
                store: self.store.clone(),
                key: self.key(path),
                buffer: Vec::new(),
            }) as Box<dyn RemoteWriter>)
        })
    }
}

struct MemoryReader {
    data: Arc<[u8]>,
    position: usize,
}

impl RemoteReader for MemoryReader {
    fn content_length(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    fn read_chunk<'a>(
        &'a mut self,
        buf: &'a mut [u8],
    ) -> BoxFuture<'a, Result<usize, TransferError>> {
        Box::pin(async move {
            let remaining = &self.data[self.position..];
            let n = remaining.len().min(buf.len());
            buf[..n].copy_from_slice(&remaining[..n]);
            self.position += n;
            Ok::<_, TransferError>(n)
        })
    }
}

struct MemoryWriter {
    store: MemoryStore,
    key: String,
    buffer: Vec<u8>,
}

impl RemoteWriter for MemoryWriter {
    fn write_chunk<'a>(&'a mut self, data: &'a [u8]) -> BoxFuture<'a, Result<(), TransferError>> {
        Box::pin(async move {
            self.buffer.extend_from_slice(data);
            Ok::<_, TransferError>(())
        })
    }

    fn commit(&mut self) -> BoxFuture<'_, Result<(), TransferError>> {
        Box::pin(async move {
            let data = std::mem::take(&mut self.buffer);
            debug!(key = %self.key, bytes = data.len(), "resource committed");
            self.store.insert(self.key.clone(), data);
            Ok::<_, TransferError>(())
        })
    }

    fn abort(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.buffer.clear();
        })
    }
}

/// Serves `mem://<name>` repositories from one shared store.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransportProvider {
    store: MemoryStore,
}

impl MemoryTransportProvider {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

impl TransportProvider for MemoryTransportProvider {
    fn schemes(&self) -> &[&'static str] {
        &["mem"]
    }

    fn new_transport(
        &self,
        repository: &RemoteRepository,
    ) -> Result<Arc<dyn Transport>, ConnectorError> {
        let name = repository
            .url
            .split_once("://")
            .map(|(_, rest)| rest.trim_end_matches('/'))
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ConnectorError::NoConnector {
                repository: repository.id.clone(),
                reason: format!("not a mem URL: {}", repository.url),
            })?;
        Ok(Arc::new(MemoryTransport::new(self.store.clone(), name)))
    }
}
