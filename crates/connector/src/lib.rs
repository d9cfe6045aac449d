//! Repository connector for Depot.
//!
//! Moves artifacts and metadata between local files and a remote
//! repository through a pluggable [`Transport`](transport::Transport),
//! emitting one well-ordered event sequence per request.
//!
//! # Pieces
//!
//! 1. **Factory**: [`BasicConnectorFactory`] picks a transport by URL scheme
//!    from a [`TransportRegistry`] and a layout by content type.
//! 2. **Connector**: [`BasicRepositoryConnector`] runs `put`/`get` batches
//!    concurrently, bounded by [`ConnectorConfig::max_concurrent_transfers`].
//! 3. **Transports**: `file` and `mem` are built in; others register a
//!    [`TransportProvider`].

pub mod config;
pub mod connector;
pub mod factory;
pub mod layout;
pub mod listener;
pub mod transport;

pub use config::{ConfigError, ConnectorConfig};
pub use connector::BasicRepositoryConnector;
pub use factory::BasicConnectorFactory;
pub use layout::RepositoryLayout;
pub use listener::LoggingTransferListener;
pub use transport::{
    FileTransport, FileTransportProvider, MemoryStore, MemoryTransport, MemoryTransportProvider,
    RemoteReader, RemoteWriter, Transport, TransportProvider, TransportRegistry,
};
