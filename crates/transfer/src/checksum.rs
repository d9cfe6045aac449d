use depot_protocol::{ChecksumPolicy, TransferError};
use tracing::{debug, warn};

/// Suffix of the sidecar file holding a resource's SHA-256 digest.
pub const CHECKSUM_EXTENSION: &str = ".sha256";

/// Extracts the digest from a sidecar file.
///
/// Accepts a bare hex digest or `sha256sum` output (`<digest>  <name>`).
/// Returns `None` if the first token is not a SHA-256 hex digest.
pub fn parse_checksum_file(content: &str) -> Option<String> {
    let token = content.split_whitespace().next()?;
    let valid = token.len() == 64 && token.chars().all(|c| c.is_ascii_hexdigit());
    valid.then(|| token.to_ascii_lowercase())
}

/// Applies `policy` to a downloaded resource's digest.
///
/// `expected` is the digest published by the repository, `None` if it has
/// none. Under [`ChecksumPolicy::Warn`] every problem is logged and the
/// transfer is allowed to succeed.
pub fn verify_checksum(
    policy: ChecksumPolicy,
    resource: &str,
    expected: Option<&str>,
    actual: &str,
) -> Result<(), TransferError> {
    if policy == ChecksumPolicy::Ignore {
        return Ok(());
    }

    let Some(expected) = expected else {
        return match policy {
            ChecksumPolicy::Fail => Err(TransferError::ChecksumMissing(resource.to_string())),
            _ => {
                warn!(resource, "no checksum published, skipping verification");
                Ok(())
            }
        };
    };

    if expected.eq_ignore_ascii_case(actual) {
        debug!(resource, "checksum verified");
        return Ok(());
    }

    match policy {
        ChecksumPolicy::Fail => Err(TransferError::ChecksumMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }),
        _ => {
            warn!(resource, expected, actual, "checksum mismatch");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum_bytes;

    #[test]
    fn parses_bare_and_sha256sum_formats() {
        let digest = checksum_bytes(b"x");
        assert_eq!(parse_checksum_file(&digest), Some(digest.clone()));
        assert_eq!(
            parse_checksum_file(&format!("{}  lib-1.0.jar\n", digest.to_uppercase())),
            Some(digest)
        );
    }

    #[test]
    fn rejects_garbage_sidecar() {
        assert_eq!(parse_checksum_file(""), None);
        assert_eq!(parse_checksum_file("not-a-digest"), None);
        assert_eq!(parse_checksum_file("abcd"), None);
    }

    #[test]
    fn ignore_never_fails() {
        assert!(verify_checksum(ChecksumPolicy::Ignore, "r", Some("00"), "ff").is_ok());
        assert!(verify_checksum(ChecksumPolicy::Ignore, "r", None, "ff").is_ok());
    }

    #[test]
    fn warn_tolerates_mismatch_and_missing() {
        assert!(verify_checksum(ChecksumPolicy::Warn, "r", Some("00"), "ff").is_ok());
        assert!(verify_checksum(ChecksumPolicy::Warn, "r", None, "ff").is_ok());
    }

    #[test]
    fn fail_rejects_mismatch_and_missing() {
        let err = verify_checksum(ChecksumPolicy::Fail, "r", Some("00"), "ff").unwrap_err();
        assert!(err.is_corruption());

        let err = verify_checksum(ChecksumPolicy::Fail, "r", None, "ff").unwrap_err();
        assert!(matches!(err, TransferError::ChecksumMissing(_)));
    }

    #[test]
    fn match_is_case_insensitive() {
        assert!(verify_checksum(ChecksumPolicy::Fail, "r", Some("ABCD"), "abcd").is_ok());
    }
}
