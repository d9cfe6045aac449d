//! Conformance harness for Depot repository connectors.
//!
//! [`test_transfer_events`] drives any [`RepositoryConnectorFactory`]
//! through one upload and one download of each resource kind and asserts
//! that every transfer produced a well-formed event sequence:
//!
//! ```text
//! INITIATED -> STARTED -> PROGRESSED* -> SUCCEEDED
//! ```
//!
//! The checks are plain functions ([`check_events`], [`check_properties`],
//! [`check_failed_events`]) so transport crates can also apply them to
//! their own failure scenarios. Violations panic with a description of the
//! offending sequence.
//!
//! [`RepositoryConnectorFactory`]: depot_protocol::RepositoryConnectorFactory

mod conformance;
mod fixture;
mod logging;
mod recording;

pub use conformance::{
    DEFAULT_PAYLOAD_SIZE, check_events, check_failed_events, check_properties,
    group_by_transfer, test_transfer_events, test_transfer_events_with,
};
pub use fixture::{
    ConnectorTestContext, artifact_downloads, artifact_uploads, create_temp_file, file_url,
    metadata_downloads, metadata_uploads, setup_test_context, setup_test_context_with_url,
    stub_artifact, stub_metadata,
};
pub use logging::init_test_logging;
pub use recording::RecordingTransferListener;
