//! Per-test repositories, payloads and request builders.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use depot_protocol::{
    Artifact, ArtifactDownload, ArtifactUpload, ChecksumPolicy, Download, Metadata,
    MetadataDownload, MetadataNature, MetadataUpload, RemoteRepository, RepositorySession, Upload,
};
use tempfile::TempDir;
use tracing::debug;

const PAYLOAD_PATTERN: &[u8] = b"tmpFile";

/// A session and repository private to one test.
///
/// Everything lives under a temporary directory removed on drop:
/// `repository/` backs the default `file:` repository and `local/` is the
/// session's local cache root.
pub struct ConnectorTestContext {
    session: RepositorySession,
    repository: RemoteRepository,
    listener: Arc<crate::RecordingTransferListener>,
    dir: TempDir,
}

impl ConnectorTestContext {
    pub fn session(&self) -> &RepositorySession {
        &self.session
    }

    pub fn repository(&self) -> &RemoteRepository {
        &self.repository
    }

    pub fn listener(&self) -> &Arc<crate::RecordingTransferListener> {
        &self.listener
    }

    /// Scratch directory for payloads and download destinations.
    pub fn work_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Directory backing the default `file:` repository.
    pub fn repository_dir(&self) -> PathBuf {
        self.dir.path().join("repository")
    }

    /// Local cache root of the session.
    pub fn local_dir(&self) -> PathBuf {
        self.dir.path().join("local")
    }
}

/// A context whose repository is a fresh `file:` directory.
pub fn setup_test_context() -> std::io::Result<ConnectorTestContext> {
    let dir = tempfile::tempdir()?;
    let repository_dir = dir.path().join("repository");
    std::fs::create_dir_all(&repository_dir)?;
    build_context(dir, file_url(&repository_dir))
}

/// A context whose repository lives at `url`, e.g. `mem://central`.
pub fn setup_test_context_with_url(
    url: impl Into<String>,
) -> std::io::Result<ConnectorTestContext> {
    build_context(tempfile::tempdir()?, url.into())
}

fn build_context(dir: TempDir, url: String) -> std::io::Result<ConnectorTestContext> {
    let listener = Arc::new(crate::RecordingTransferListener::new());
    let session = RepositorySession::new(listener.clone())
        .with_local_cache_root(dir.path().join("local"));
    let repository = RemoteRepository::new("test-repo", "default", url);
    debug!(repository = %repository, "test repository ready");
    Ok(ConnectorTestContext {
        session,
        repository,
        listener,
        dir,
    })
}

/// `file:` URL of a local directory.
pub fn file_url(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    if path.starts_with('/') {
        format!("file://{path}")
    } else {
        format!("file:///{path}")
    }
}

/// Creates a file of exactly `size` bytes in `dir`, filled with the
/// repeated pattern `tmpFile`.
pub fn create_temp_file(dir: &Path, size: usize) -> std::io::Result<PathBuf> {
    let content: Vec<u8> = PAYLOAD_PATTERN.iter().copied().cycle().take(size).collect();
    let mut file = tempfile::Builder::new()
        .prefix("payload-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    file.write_all(&content)?;
    file.flush()?;
    let (_, path) = file.keep().map_err(|e| e.error)?;
    Ok(path)
}

/// The `index`-th test artifact: `testGroup:testArtifact:jar:sources:<index+1>-test`.
pub fn stub_artifact(index: usize) -> Artifact {
    Artifact::new(
        "testGroup",
        "testArtifact",
        "sources",
        "jar",
        format!("{}-test", index + 1),
    )
}

/// The `index`-th test metadata document.
pub fn stub_metadata(index: usize) -> Metadata {
    Metadata::new(
        "testGroup",
        "testArtifact",
        format!("{}test", index + 1),
        "jar",
        MetadataNature::ReleaseOrSnapshot,
    )
}

pub fn artifact_uploads(count: usize, file: &Path) -> Vec<ArtifactUpload> {
    (0..count)
        .map(|i| Upload::new(stub_artifact(i), file))
        .collect()
}

/// Downloads skip checksum verification: the harness checks events, not
/// integrity.
pub fn artifact_downloads(count: usize, file: &Path) -> Vec<ArtifactDownload> {
    (0..count)
        .map(|i| Download::new(stub_artifact(i), file).with_checksum_policy(ChecksumPolicy::Ignore))
        .collect()
}

pub fn metadata_uploads(count: usize, file: &Path) -> Vec<MetadataUpload> {
    (0..count)
        .map(|i| Upload::new(stub_metadata(i), file))
        .collect()
}

pub fn metadata_downloads(count: usize, file: &Path) -> Vec<MetadataDownload> {
    (0..count)
        .map(|i| Download::new(stub_metadata(i), file).with_checksum_policy(ChecksumPolicy::Ignore))
        .collect()
}
