use std::path::{Component, Path};

use depot_protocol::TransferError;

/// Checks a path produced by a repository layout before a transport
/// resolves it against the repository base.
///
/// Layout paths are relative and only descend from the base, so any
/// component that could leave it (`..`, a root, a drive prefix) is refused
/// along with the empty path. `.` segments are harmless and kept.
pub fn validate_resource_path(resource_path: &str) -> Result<(), TransferError> {
    if resource_path.is_empty() {
        return Err(TransferError::Transport("layout produced an empty path".into()));
    }

    let escapes = Path::new(resource_path).components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(TransferError::Transport(format!(
            "{resource_path} is outside the repository"
        )));
    }
    Ok(())
}
