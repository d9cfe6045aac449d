//! Repository connector protocol for Depot.
//!
//! Defines the values that flow between a resolver and a transport:
//! resource descriptors, the four transfer request kinds, transfer events
//! and the listener that observes them, plus the [`RepositoryConnector`]
//! and [`RepositoryConnectorFactory`] contracts every transport
//! implementation satisfies.
//!
//! # Event sequence
//!
//! Every request handed to a connector produces exactly one sequence:
//!
//! ```text
//! INITIATED -> STARTED -> PROGRESSED* -> SUCCEEDED | FAILED | CORRUPTED
//! ```
//!
//! A failure while opening either end of the transfer may jump from
//! INITIATED straight to FAILED.

pub mod connector;
pub mod error;
pub mod event;
pub mod listener;
pub mod repository;
pub mod request;
pub mod resource;

pub use connector::{BoxFuture, RepositoryConnector, RepositoryConnectorFactory};
pub use error::{ConnectorError, TransferError};
pub use event::{DataWindow, TransferEvent, TransferEventType, TransferResource};
pub use listener::{NoopTransferListener, TransferListener};
pub use repository::{RemoteRepository, RepositorySession};
pub use request::{
    ArtifactDownload, ArtifactUpload, ChecksumPolicy, Direction, Download, MetadataDownload,
    MetadataUpload, TransferRequest, Upload,
};
pub use resource::{Artifact, Metadata, MetadataNature, Resource};
