//! Connector and factory contracts.
//!
//! Methods return boxed futures so implementations can be used as trait
//! objects (`Box<dyn RepositoryConnector>`).

use std::future::Future;
use std::pin::Pin;

use crate::error::ConnectorError;
use crate::repository::{RemoteRepository, RepositorySession};
use crate::request::{ArtifactDownload, ArtifactUpload, MetadataDownload, MetadataUpload};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Executes batches of transfers against one remote repository.
///
/// A batch call returns `Ok(())` once every request reached a terminal
/// event, whatever that event was. An `Err` means the call was rejected
/// before any event was emitted.
pub trait RepositoryConnector: Send + Sync {
    /// Uploads both batches. An empty slice skips that kind.
    fn put<'a>(
        &'a self,
        artifact_uploads: &'a [ArtifactUpload],
        metadata_uploads: &'a [MetadataUpload],
    ) -> BoxFuture<'a, Result<(), ConnectorError>>;

    /// Downloads both batches. An empty slice skips that kind.
    fn get<'a>(
        &'a self,
        artifact_downloads: &'a [ArtifactDownload],
        metadata_downloads: &'a [MetadataDownload],
    ) -> BoxFuture<'a, Result<(), ConnectorError>>;

    /// Best-effort abort: transfers that have not finished end FAILED.
    fn abort(&self) {}

    /// Releases transport resources. Calling it again has no effect.
    fn close(&self);
}

/// Creates connectors for (session, repository) pairs.
pub trait RepositoryConnectorFactory: Send + Sync {
    /// Fails with [`ConnectorError::NoConnector`] when no transport or
    /// layout matches `repository`.
    fn new_instance(
        &self,
        session: &RepositorySession,
        repository: &RemoteRepository,
    ) -> Result<Box<dyn RepositoryConnector>, ConnectorError>;
}
