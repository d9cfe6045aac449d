use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::listener::{NoopTransferListener, TransferListener};
use crate::request::ChecksumPolicy;

/// A remote repository a connector talks to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRepository {
    pub id: String,
    /// Layout tag, e.g. `default`.
    pub content_type: String,
    pub url: String,
}

impl RemoteRepository {
    pub fn new(
        id: impl Into<String>,
        content_type: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            content_type: content_type.into(),
            url: url.into(),
        }
    }

    /// Lower-cased URL scheme, if the URL has one.
    pub fn scheme(&self) -> Option<String> {
        let (scheme, _) = self.url.split_once(':')?;
        let valid = !scheme.is_empty()
            && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        valid.then(|| scheme.to_ascii_lowercase())
    }

    /// The URL with exactly one trailing `/`.
    pub fn base_url(&self) -> String {
        format!("{}/", self.url.trim_end_matches('/'))
    }
}

impl fmt::Display for RemoteRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.id, self.url, self.content_type)
    }
}

/// Session-scoped settings shared by every connector of one resolution.
///
/// Read-only from the connector's point of view.
#[derive(Clone)]
pub struct RepositorySession {
    listener: Arc<dyn TransferListener>,
    local_cache_root: Option<PathBuf>,
    checksum_policy: ChecksumPolicy,
}

impl Default for RepositorySession {
    fn default() -> Self {
        Self::new(Arc::new(NoopTransferListener))
    }
}

impl RepositorySession {
    pub fn new(listener: Arc<dyn TransferListener>) -> Self {
        Self {
            listener,
            local_cache_root: None,
            checksum_policy: ChecksumPolicy::default(),
        }
    }

    pub fn with_local_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.local_cache_root = Some(root.into());
        self
    }

    pub fn with_checksum_policy(mut self, policy: ChecksumPolicy) -> Self {
        self.checksum_policy = policy;
        self
    }

    pub fn listener(&self) -> &Arc<dyn TransferListener> {
        &self.listener
    }

    pub fn local_cache_root(&self) -> Option<&Path> {
        self.local_cache_root.as_deref()
    }

    /// Policy applied to downloads that do not name one.
    pub fn checksum_policy(&self) -> ChecksumPolicy {
        self.checksum_policy
    }

    /// Resolves a request's local path: relative paths are placed under the
    /// local cache root when one is configured.
    pub fn resolve_local(&self, file: &Path) -> PathBuf {
        match &self.local_cache_root {
            Some(root) if file.is_relative() => root.join(file),
            _ => file.to_path_buf(),
        }
    }
}

impl fmt::Debug for RepositorySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositorySession")
            .field("local_cache_root", &self.local_cache_root)
            .field("checksum_policy", &self.checksum_policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_is_extracted_and_lowercased() {
        let repo = RemoteRepository::new("r", "default", "FILE:///tmp/repo");
        assert_eq!(repo.scheme().as_deref(), Some("file"));

        let repo = RemoteRepository::new("r", "default", "mem://central");
        assert_eq!(repo.scheme().as_deref(), Some("mem"));
    }

    #[test]
    fn url_without_scheme() {
        let repo = RemoteRepository::new("r", "default", "/tmp/repo");
        assert_eq!(repo.scheme(), None);
    }

    #[test]
    fn base_url_has_single_trailing_slash() {
        let repo = RemoteRepository::new("r", "default", "mem://central//");
        assert_eq!(repo.base_url(), "mem://central/");
    }

    #[test]
    fn relative_paths_resolve_under_cache_root() {
        let session = RepositorySession::default().with_local_cache_root("/cache");
        assert_eq!(
            session.resolve_local(Path::new("g/a.jar")),
            PathBuf::from("/cache/g/a.jar")
        );
        assert_eq!(
            session.resolve_local(Path::new("/abs/a.jar")),
            PathBuf::from("/abs/a.jar")
        );
    }

    #[test]
    fn default_policy_is_warn() {
        assert_eq!(
            RepositorySession::default().checksum_policy(),
            ChecksumPolicy::Warn
        );
    }
}
