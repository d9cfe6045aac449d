use std::fmt;

use serde::{Deserialize, Serialize};

/// A versioned, typed binary unit identified by its coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    group_id: String,
    artifact_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    classifier: String,
    extension: String,
    version: String,
}

impl Artifact {
    /// Creates an artifact descriptor. An empty `classifier` means none.
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        classifier: impl Into<String>,
        extension: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            classifier: classifier.into(),
            extension: extension.into(),
            version: version.into(),
        }
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn classifier(&self) -> &str {
        &self.classifier
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for Artifact {
    /// `group:artifact:extension[:classifier]:version`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.extension)?;
        if !self.classifier.is_empty() {
            write!(f, ":{}", self.classifier)?;
        }
        write!(f, ":{}", self.version)
    }
}

/// Which kinds of versions a metadata document covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataNature {
    Release,
    Snapshot,
    ReleaseOrSnapshot,
}

/// An auxiliary repository document such as a version listing.
///
/// Any of `group_id`, `artifact_id` and `version` may be empty, which
/// places the document higher up in the repository tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    group_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    artifact_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    version: String,
    doc_type: String,
    nature: MetadataNature,
}

impl Metadata {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
        doc_type: impl Into<String>,
        nature: MetadataNature,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            doc_type: doc_type.into(),
            nature,
        }
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Name of the document, e.g. `maven-metadata.xml`.
    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    pub fn nature(&self) -> MetadataNature {
        self.nature
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let coords: Vec<&str> = [
            self.group_id.as_str(),
            self.artifact_id.as_str(),
            self.version.as_str(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();
        if coords.is_empty() {
            write!(f, "{}", self.doc_type)
        } else {
            write!(f, "{}/{}", coords.join(":"), self.doc_type)
        }
    }
}

/// Identifies what a transfer moves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resource {
    Artifact(Artifact),
    Metadata(Metadata),
}

impl Resource {
    pub fn as_artifact(&self) -> Option<&Artifact> {
        match self {
            Resource::Artifact(a) => Some(a),
            Resource::Metadata(_) => None,
        }
    }

    pub fn as_metadata(&self) -> Option<&Metadata> {
        match self {
            Resource::Artifact(_) => None,
            Resource::Metadata(m) => Some(m),
        }
    }
}

impl From<Artifact> for Resource {
    fn from(a: Artifact) -> Self {
        Resource::Artifact(a)
    }
}

impl From<Metadata> for Resource {
    fn from(m: Metadata) -> Self {
        Resource::Metadata(m)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Artifact(a) => a.fmt(f),
            Resource::Metadata(m) => m.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_display_with_classifier() {
        let a = Artifact::new("org.example", "lib", "sources", "jar", "1.0");
        assert_eq!(a.to_string(), "org.example:lib:jar:sources:1.0");
    }

    #[test]
    fn artifact_display_without_classifier() {
        let a = Artifact::new("org.example", "lib", "", "jar", "1.0");
        assert_eq!(a.to_string(), "org.example:lib:jar:1.0");
    }

    #[test]
    fn metadata_display_skips_empty_coordinates() {
        let m = Metadata::new(
            "org.example",
            "lib",
            "",
            "maven-metadata.xml",
            MetadataNature::Release,
        );
        assert_eq!(m.to_string(), "org.example:lib/maven-metadata.xml");

        let root = Metadata::new("", "", "", "index.xml", MetadataNature::Snapshot);
        assert_eq!(root.to_string(), "index.xml");
    }

    #[test]
    fn resource_accessors_match_variant() {
        let r: Resource = Artifact::new("g", "a", "", "jar", "1").into();
        assert!(r.as_artifact().is_some());
        assert!(r.as_metadata().is_none());

        let r: Resource =
            Metadata::new("g", "a", "1", "m.xml", MetadataNature::ReleaseOrSnapshot).into();
        assert_eq!(
            r.as_metadata().map(Metadata::nature),
            Some(MetadataNature::ReleaseOrSnapshot)
        );
    }
}
