//! Batch execution of uploads and downloads against one repository.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use depot_protocol::{
    ArtifactDownload, ArtifactUpload, BoxFuture, ChecksumPolicy, ConnectorError, Direction,
    MetadataDownload, MetadataUpload, RemoteRepository, RepositoryConnector, RepositorySession,
    TransferError, TransferRequest, TransferResource,
};
use depot_transfer::{
    ChunkReader, PartFileWriter, Sha256Digest, TransferMonitor, parse_checksum_file,
    verify_checksum,
};
use futures_util::StreamExt;
use futures_util::stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ConnectorConfig;
use crate::layout::RepositoryLayout;
use crate::transport::{RemoteReader, RemoteWriter, Transport, TransportProvider, read_to_end};

/// Largest checksum sidecar accepted on download.
const MAX_CHECKSUM_FILE_SIZE: usize = 4096;

/// Runs `fut` unless `cancel` fires or `limit` elapses first.
async fn guarded<T, F>(
    cancel: &CancellationToken,
    limit: Duration,
    fut: F,
) -> Result<T, TransferError>
where
    F: Future<Output = Result<T, TransferError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TransferError::Cancelled),
        result = tokio::time::timeout(limit, fut) => {
            result.unwrap_or(Err(TransferError::Timeout(limit)))
        }
    }
}

/// Connector moving resources through one [`Transport`].
///
/// Every request of a batch gets its own event sequence; a failing request
/// never affects the others. At most
/// [`ConnectorConfig::max_concurrent_transfers`] requests run at once, all
/// polled by the task awaiting the batch call.
pub struct BasicRepositoryConnector {
    session: RepositorySession,
    repository: RemoteRepository,
    layout: RepositoryLayout,
    provider: Arc<dyn TransportProvider>,
    transport: Arc<dyn Transport>,
    config: ConnectorConfig,
    cancel: Mutex<CancellationToken>,
    closed: AtomicBool,
}

impl BasicRepositoryConnector {
    /// Opens a transport for `repository` through `provider`.
    pub fn new(
        session: RepositorySession,
        repository: RemoteRepository,
        layout: RepositoryLayout,
        provider: Arc<dyn TransportProvider>,
        config: ConnectorConfig,
    ) -> Result<Self, ConnectorError> {
        let transport = provider.new_transport(&repository)?;
        debug!(repository = %repository, "connector opened");
        Ok(Self {
            session,
            repository,
            layout,
            provider,
            transport,
            config,
            cancel: Mutex::new(CancellationToken::new()),
            closed: AtomicBool::new(false),
        })
    }

    pub fn repository(&self) -> &RemoteRepository {
        &self.repository
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn execute(&self, requests: Vec<TransferRequest>) -> Result<(), ConnectorError> {
        if self.is_closed() {
            return Err(ConnectorError::Closed(self.repository.id.clone()));
        }
        for request in &requests {
            request.validate()?;
        }
        if requests.is_empty() {
            return Ok(());
        }

        let cancel = self.cancel.lock().unwrap().clone();
        let started = Instant::now();
        debug!(
            repository = %self.repository.id,
            transfers = requests.len(),
            "batch started"
        );

        // Built up front so the stream holds no higher-ranked closure.
        let transfers: Vec<_> = requests
            .iter()
            .map(|request| self.transfer(request, &cancel))
            .collect();
        stream::iter(transfers)
            .buffer_unordered(self.config.concurrency())
            .collect::<Vec<()>>()
            .await;

        debug!(
            repository = %self.repository.id,
            transfers = requests.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch finished"
        );
        Ok(())
    }

    async fn transfer(&self, request: &TransferRequest, cancel: &CancellationToken) {
        let resource = Arc::new(TransferResource::new(
            self.repository.base_url(),
            self.layout.path(&request.resource),
            self.session.resolve_local(request.file()),
            request.resource.clone(),
        ));
        let mut monitor = TransferMonitor::new(
            Arc::clone(self.session.listener()),
            Arc::clone(&resource),
            request.direction,
        );
        monitor.initiated();

        let result = match request.direction {
            Direction::Upload => self.upload(request, &mut monitor, cancel).await,
            Direction::Download => self.download(request, &mut monitor, cancel).await,
        };

        match result {
            Ok(()) => monitor.succeeded(),
            Err(e) => {
                warn!(
                    resource = %resource,
                    direction = %request.direction,
                    context = request.context.as_deref().unwrap_or(""),
                    error = %e,
                    "transfer failed"
                );
                monitor.failed(e);
            }
        }
    }

    async fn upload(
        &self,
        request: &TransferRequest,
        monitor: &mut TransferMonitor,
        cancel: &CancellationToken,
    ) -> Result<(), TransferError> {
        let resource = Arc::clone(monitor.resource());
        let path = resource.resource_name();

        let mut reader = ChunkReader::open(resource.file(), self.config.chunk_size()).await?;
        resource.set_content_length(reader.file_size());

        let mut writer = self
            .open_with_retry(cancel, path, || self.transport.open_write(path))
            .await?;
        monitor.started();

        let mut digest = Sha256Digest::default();
        let sent = self
            .send_chunks(&mut reader, writer.as_mut(), &mut digest, monitor, cancel)
            .await;
        let committed = match sent {
            Ok(()) => guarded(cancel, self.config.read_timeout(), writer.commit()).await,
            Err(e) => Err(e),
        };
        if let Err(e) = committed {
            writer.abort().await;
            return Err(e);
        }

        let sidecar = self.layout.checksum_path(&request.resource);
        if let Err(e) = self.write_sidecar(&sidecar, digest.finish(), cancel).await {
            warn!(path = %sidecar, error = %e, "failed to publish checksum");
        }
        Ok(())
    }

    async fn send_chunks(
        &self,
        reader: &mut ChunkReader,
        writer: &mut dyn RemoteWriter,
        digest: &mut Sha256Digest,
        monitor: &mut TransferMonitor,
        cancel: &CancellationToken,
    ) -> Result<(), TransferError> {
        while let Some(chunk) = reader.next_chunk().await? {
            guarded(
                cancel,
                self.config.read_timeout(),
                writer.write_chunk(&chunk),
            )
            .await?;
            digest.update(&chunk);
            monitor.progressed(chunk);
        }
        Ok(())
    }

    async fn write_sidecar(
        &self,
        path: &str,
        digest: String,
        cancel: &CancellationToken,
    ) -> Result<(), TransferError> {
        let mut writer = guarded(
            cancel,
            self.config.connect_timeout(),
            self.transport.open_write(path),
        )
        .await?;
        let limit = self.config.read_timeout();
        let written = match guarded(cancel, limit, writer.write_chunk(digest.as_bytes())).await {
            Ok(()) => guarded(cancel, limit, writer.commit()).await,
            Err(e) => Err(e),
        };
        if written.is_err() {
            writer.abort().await;
        }
        written
    }

    async fn download(
        &self,
        request: &TransferRequest,
        monitor: &mut TransferMonitor,
        cancel: &CancellationToken,
    ) -> Result<(), TransferError> {
        let resource = Arc::clone(monitor.resource());
        let path = resource.resource_name();

        let mut reader = self
            .open_with_retry(cancel, path, || self.transport.open_read(path))
            .await?;
        let announced = reader.content_length();
        if let Some(length) = announced {
            resource.set_content_length(length);
        }

        let mut part = PartFileWriter::create(resource.file()).await?;
        monitor.started();

        let mut digest = Sha256Digest::default();
        if let Err(e) = self
            .receive_chunks(reader.as_mut(), &mut part, &mut digest, monitor, cancel)
            .await
        {
            part.discard().await;
            return Err(e);
        }

        if let Some(expected) = announced {
            if part.written() != expected {
                let actual = part.written();
                part.discard().await;
                return Err(TransferError::Truncated { expected, actual });
            }
        }

        let policy = request
            .checksum_policy
            .unwrap_or(self.session.checksum_policy());
        if policy != ChecksumPolicy::Ignore {
            let verified = match self.fetch_checksum(request, policy, cancel).await {
                Ok(expected) => {
                    verify_checksum(policy, path, expected.as_deref(), &digest.finish())
                }
                Err(e) => Err(e),
            };
            if let Err(e) = verified {
                part.discard().await;
                return Err(e);
            }
        }

        part.persist().await?;
        Ok(())
    }

    async fn receive_chunks(
        &self,
        reader: &mut dyn RemoteReader,
        part: &mut PartFileWriter,
        digest: &mut Sha256Digest,
        monitor: &mut TransferMonitor,
        cancel: &CancellationToken,
    ) -> Result<(), TransferError> {
        let mut buf = vec![0u8; self.config.chunk_size()];
        loop {
            let n = guarded(cancel, self.config.read_timeout(), reader.read_chunk(&mut buf)).await?;
            if n == 0 {
                return Ok(());
            }
            let chunk: Arc<[u8]> = Arc::from(&buf[..n]);
            part.write_chunk(&chunk).await?;
            digest.update(&chunk);
            monitor.progressed(chunk);
        }
    }

    /// Published digest of a download, `None` when the repository has none.
    ///
    /// Under [`ChecksumPolicy::Warn`] an unreadable sidecar counts as absent.
    async fn fetch_checksum(
        &self,
        request: &TransferRequest,
        policy: ChecksumPolicy,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, TransferError> {
        let path = self.layout.checksum_path(&request.resource);
        let fetched = match guarded(
            cancel,
            self.config.connect_timeout(),
            self.transport.open_read(&path),
        )
        .await
        {
            Ok(mut reader) => {
                guarded(
                    cancel,
                    self.config.read_timeout(),
                    read_to_end(reader.as_mut(), MAX_CHECKSUM_FILE_SIZE),
                )
                .await
            }
            Err(e) => Err(e),
        };

        match fetched {
            Ok(content) => {
                let digest = parse_checksum_file(&String::from_utf8_lossy(&content));
                if digest.is_none() {
                    warn!(path = %path, "unreadable checksum file ignored");
                }
                Ok(digest)
            }
            Err(TransferError::NotFound(_)) => Ok(None),
            Err(TransferError::Cancelled) => Err(TransferError::Cancelled),
            Err(e) if policy == ChecksumPolicy::Warn => {
                warn!(path = %path, error = %e, "failed to fetch checksum");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Opens a remote stream, retrying transient failures with linear backoff.
    async fn open_with_retry<'a, T, F>(
        &self,
        cancel: &CancellationToken,
        path: &str,
        mut open: F,
    ) -> Result<T, TransferError>
    where
        F: FnMut() -> BoxFuture<'a, Result<T, TransferError>>,
    {
        let mut attempt = 0;
        loop {
            match guarded(cancel, self.config.connect_timeout(), open()).await {
                Ok(stream) => return Ok(stream),
                Err(e) if e.is_transient() && attempt < self.config.retry_attempts => {
                    attempt += 1;
                    let delay = self.config.retry_backoff() * attempt;
                    warn!(
                        path,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "open failed, retrying"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(TransferError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl RepositoryConnector for BasicRepositoryConnector {
    fn put<'a>(
        &'a self,
        artifact_uploads: &'a [ArtifactUpload],
        metadata_uploads: &'a [MetadataUpload],
    ) -> BoxFuture<'a, Result<(), ConnectorError>> {
        let requests = artifact_uploads
            .iter()
            .map(TransferRequest::from)
            .chain(metadata_uploads.iter().map(TransferRequest::from))
            .collect();
        Box::pin(self.execute(requests))
    }

    fn get<'a>(
        &'a self,
        artifact_downloads: &'a [ArtifactDownload],
        metadata_downloads: &'a [MetadataDownload],
    ) -> BoxFuture<'a, Result<(), ConnectorError>> {
        let requests = artifact_downloads
            .iter()
            .map(TransferRequest::from)
            .chain(metadata_downloads.iter().map(TransferRequest::from))
            .collect();
        Box::pin(self.execute(requests))
    }

    /// Cancels the transfers of every running batch; later batches start
    /// normally.
    fn abort(&self) {
        let mut cancel = self.cancel.lock().unwrap();
        cancel.cancel();
        *cancel = CancellationToken::new();
        info!(repository = %self.repository.id, "transfers aborted");
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.provider.release(self.transport.as_ref());
        debug!(repository = %self.repository.id, "connector closed");
    }
}

impl Drop for BasicRepositoryConnector {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for BasicRepositoryConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicRepositoryConnector")
            .field("repository", &self.repository)
            .field("layout", &self.layout)
            .field("closed", &self.is_closed())
            .finish()
    }
}
