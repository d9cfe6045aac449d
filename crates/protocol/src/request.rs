//! The four transfer request kinds.
//!
//! Uploads and downloads are generic over the resource they move, so
//! `ArtifactUpload`, `ArtifactDownload`, `MetadataUpload` and
//! `MetadataDownload` are aliases of [`Upload`] and [`Download`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConnectorError;
use crate::resource::{Artifact, Metadata, Resource};

/// Which way the bytes move relative to the local file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Local file to remote repository.
    Upload,
    /// Remote repository to local file.
    Download,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Upload => f.write_str("upload"),
            Direction::Download => f.write_str("download"),
        }
    }
}

/// How checksum verification failures of a download are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumPolicy {
    /// Do not verify.
    Ignore,
    /// Verify; on mismatch log a warning and still succeed.
    #[default]
    Warn,
    /// Verify; on mismatch the transfer ends CORRUPTED.
    Fail,
}

impl FromStr for ChecksumPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(ChecksumPolicy::Ignore),
            "warn" => Ok(ChecksumPolicy::Warn),
            "fail" => Ok(ChecksumPolicy::Fail),
            other => Err(format!("unknown checksum policy: {other}")),
        }
    }
}

/// Uploads `file` as `resource`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload<R> {
    pub resource: R,
    pub file: PathBuf,
}

impl<R> Upload<R> {
    pub fn new(resource: R, file: impl Into<PathBuf>) -> Self {
        Self {
            resource,
            file: file.into(),
        }
    }
}

/// Downloads `resource` into `file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download<R> {
    pub resource: R,
    pub file: PathBuf,
    /// `None` falls back to the session default.
    pub checksum_policy: Option<ChecksumPolicy>,
    /// Free-form provenance tag recorded by the resolver.
    pub context: Option<String>,
}

impl<R> Download<R> {
    pub fn new(resource: R, file: impl Into<PathBuf>) -> Self {
        Self {
            resource,
            file: file.into(),
            checksum_policy: None,
            context: None,
        }
    }

    pub fn with_checksum_policy(mut self, policy: ChecksumPolicy) -> Self {
        self.checksum_policy = Some(policy);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

pub type ArtifactUpload = Upload<Artifact>;
pub type ArtifactDownload = Download<Artifact>;
pub type MetadataUpload = Upload<Metadata>;
pub type MetadataDownload = Download<Metadata>;

/// A request of any kind, flattened for dispatch.
///
/// Connectors turn the typed batches they receive into a list of these
/// before scheduling, and match on [`Direction`] to pick the code path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub resource: Resource,
    pub file: PathBuf,
    pub direction: Direction,
    pub checksum_policy: Option<ChecksumPolicy>,
    pub context: Option<String>,
}

impl TransferRequest {
    /// Rejects requests that can never be executed.
    pub fn validate(&self) -> Result<(), ConnectorError> {
        if self.file.as_os_str().is_empty() {
            return Err(ConnectorError::InvalidRequest(format!(
                "{} of {} has an empty local file path",
                self.direction, self.resource
            )));
        }
        Ok(())
    }

    pub fn file(&self) -> &Path {
        &self.file
    }
}

impl<R: Clone + Into<Resource>> From<&Upload<R>> for TransferRequest {
    fn from(u: &Upload<R>) -> Self {
        Self {
            resource: u.resource.clone().into(),
            file: u.file.clone(),
            direction: Direction::Upload,
            checksum_policy: None,
            context: None,
        }
    }
}

impl<R: Clone + Into<Resource>> From<&Download<R>> for TransferRequest {
    fn from(d: &Download<R>) -> Self {
        Self {
            resource: d.resource.clone().into(),
            file: d.file.clone(),
            direction: Direction::Download,
            checksum_policy: d.checksum_policy,
            context: d.context.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::MetadataNature;

    fn artifact() -> Artifact {
        Artifact::new("g", "a", "", "jar", "1.0")
    }

    #[test]
    fn checksum_policy_parses_case_insensitively() {
        assert_eq!("FAIL".parse::<ChecksumPolicy>(), Ok(ChecksumPolicy::Fail));
        assert_eq!(" warn ".parse::<ChecksumPolicy>(), Ok(ChecksumPolicy::Warn));
        assert_eq!("ignore".parse::<ChecksumPolicy>(), Ok(ChecksumPolicy::Ignore));
        assert!("strict".parse::<ChecksumPolicy>().is_err());
    }

    #[test]
    fn download_flattens_with_policy_and_context() {
        let d = ArtifactDownload::new(artifact(), "/tmp/a.jar")
            .with_checksum_policy(ChecksumPolicy::Fail)
            .with_context("project");
        let req = TransferRequest::from(&d);
        assert_eq!(req.direction, Direction::Download);
        assert_eq!(req.checksum_policy, Some(ChecksumPolicy::Fail));
        assert_eq!(req.context.as_deref(), Some("project"));
        assert!(req.resource.as_artifact().is_some());
    }

    #[test]
    fn upload_flattens_metadata() {
        let m = Metadata::new("g", "a", "", "maven-metadata.xml", MetadataNature::Release);
        let req = TransferRequest::from(&MetadataUpload::new(m, "/tmp/m.xml"));
        assert_eq!(req.direction, Direction::Upload);
        assert!(req.checksum_policy.is_none());
        assert!(req.resource.as_metadata().is_some());
    }

    #[test]
    fn empty_path_is_rejected() {
        let req = TransferRequest::from(&ArtifactUpload::new(artifact(), ""));
        let err = req.validate().unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidRequest(_)));
        assert!(err.to_string().contains("g:a:jar:1.0"));
    }
}
