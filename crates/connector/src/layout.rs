//! Mapping of resources to repository paths.

use depot_protocol::{Artifact, Metadata, Resource};
use depot_transfer::CHECKSUM_EXTENSION;

/// How resources are arranged inside a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryLayout {
    /// `group/as/dirs/artifact/version/artifact-version[-classifier].ext`
    Default,
}

impl RepositoryLayout {
    /// Layout for a repository content type, `None` if unsupported.
    pub fn for_content_type(content_type: &str) -> Option<Self> {
        match content_type {
            "" | "default" => Some(RepositoryLayout::Default),
            _ => None,
        }
    }

    /// Path of `resource` relative to the repository base.
    pub fn path(&self, resource: &Resource) -> String {
        match resource {
            Resource::Artifact(a) => artifact_path(a),
            Resource::Metadata(m) => metadata_path(m),
        }
    }

    /// Path of the checksum sidecar of `resource`.
    pub fn checksum_path(&self, resource: &Resource) -> String {
        format!("{}{CHECKSUM_EXTENSION}", self.path(resource))
    }
}

fn artifact_path(a: &Artifact) -> String {
    let mut file_name = format!("{}-{}", a.artifact_id(), a.version());
    if !a.classifier().is_empty() {
        file_name.push('-');
        file_name.push_str(a.classifier());
    }
    if !a.extension().is_empty() {
        file_name.push('.');
        file_name.push_str(a.extension());
    }
    format!(
        "{}/{}/{}/{}",
        a.group_id().replace('.', "/"),
        a.artifact_id(),
        a.version(),
        file_name
    )
}

fn metadata_path(m: &Metadata) -> String {
    let group = m.group_id().replace('.', "/");
    [group.as_str(), m.artifact_id(), m.version(), m.doc_type()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_protocol::MetadataNature;

    #[test]
    fn artifact_with_classifier() {
        let a = Artifact::new("org.example", "lib", "sources", "jar", "1.0");
        assert_eq!(
            RepositoryLayout::Default.path(&a.into()),
            "org/example/lib/1.0/lib-1.0-sources.jar"
        );
    }

    #[test]
    fn artifact_without_classifier() {
        let a = Artifact::new("org.example", "lib", "", "pom", "2.1");
        assert_eq!(
            RepositoryLayout::Default.path(&a.into()),
            "org/example/lib/2.1/lib-2.1.pom"
        );
    }

    #[test]
    fn metadata_omits_empty_segments() {
        let m = Metadata::new(
            "org.example",
            "lib",
            "",
            "maven-metadata.xml",
            MetadataNature::Release,
        );
        assert_eq!(
            RepositoryLayout::Default.path(&m.into()),
            "org/example/lib/maven-metadata.xml"
        );
    }

    #[test]
    fn checksum_sidecar_path() {
        let a = Artifact::new("g", "a", "", "jar", "1");
        assert_eq!(
            RepositoryLayout::Default.checksum_path(&a.into()),
            "g/a/1/a-1.jar.sha256"
        );
    }

    #[test]
    fn unknown_content_type() {
        assert_eq!(
            RepositoryLayout::for_content_type("default"),
            Some(RepositoryLayout::Default)
        );
        assert_eq!(RepositoryLayout::for_content_type("legacy"), None);
    }
}
