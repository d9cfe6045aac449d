use std::path::Path;
use std::sync::Arc;

use depot_protocol::{
    RepositoryConnector, RepositoryConnectorFactory, TransferEvent, TransferEventType,
};
use tracing::info;

use crate::fixture::{
    ConnectorTestContext, artifact_downloads, artifact_uploads, create_temp_file,
    metadata_downloads, metadata_uploads, setup_test_context,
};

/// Payload size used by [`test_transfer_events`].
pub const DEFAULT_PAYLOAD_SIZE: usize = 10_000;

/// Runs the conformance scenario against `factory` with a fresh `file:`
/// repository and a 10 000 byte payload.
pub async fn test_transfer_events(factory: &dyn RepositoryConnectorFactory) {
    let ctx = setup_test_context()
        .unwrap_or_else(|e| panic!("failed to set up test repository: {e}"));
    test_transfer_events_with(factory, &ctx, DEFAULT_PAYLOAD_SIZE).await;
}

/// Runs the conformance scenario in `ctx` with a payload of `size` bytes.
///
/// Uploads an artifact, downloads it back, then does the same for a
/// metadata document. Every transfer must produce a sequence accepted by
/// [`check_events`] and the downloaded files must equal the payload.
pub async fn test_transfer_events_with(
    factory: &dyn RepositoryConnectorFactory,
    ctx: &ConnectorTestContext,
    size: usize,
) {
    let payload = create_temp_file(ctx.work_dir(), size)
        .unwrap_or_else(|e| panic!("failed to create {size} byte payload: {e}"));
    let connector = factory
        .new_instance(ctx.session(), ctx.repository())
        .unwrap_or_else(|e| panic!("factory rejected {}: {e}", ctx.repository()));
    let listener = ctx.listener();
    listener.clear();

    info!(repository = %ctx.repository(), size, "checking transfer events");

    connector
        .put(&artifact_uploads(1, &payload), &[])
        .await
        .unwrap_or_else(|e| panic!("artifact upload batch rejected: {e}"));
    check_batch("artifact upload", &listener.take(), 1, size as u64);

    let artifact_copy = ctx.work_dir().join("downloaded-artifact");
    connector
        .get(&artifact_downloads(1, &artifact_copy), &[])
        .await
        .unwrap_or_else(|e| panic!("artifact download batch rejected: {e}"));
    check_batch("artifact download", &listener.take(), 1, size as u64);
    check_same_content(&payload, &artifact_copy);

    connector
        .put(&[], &metadata_uploads(1, &payload))
        .await
        .unwrap_or_else(|e| panic!("metadata upload batch rejected: {e}"));
    check_batch("metadata upload", &listener.take(), 1, size as u64);

    let metadata_copy = ctx.work_dir().join("downloaded-metadata");
    connector
        .get(&[], &metadata_downloads(1, &metadata_copy))
        .await
        .unwrap_or_else(|e| panic!("metadata download batch rejected: {e}"));
    check_batch("metadata download", &listener.take(), 1, size as u64);
    check_same_content(&payload, &metadata_copy);

    close(connector);
}

fn close(connector: Box<dyn RepositoryConnector>) {
    connector.close();
    connector.close();
}

fn check_batch(label: &str, events: &[TransferEvent], transfers: usize, expected_bytes: u64) {
    let groups = group_by_transfer(events);
    assert_eq!(
        groups.len(),
        transfers,
        "{label}: expected {transfers} transfer(s), got events for {}:\n{}",
        groups.len(),
        describe(events)
    );
    for group in &groups {
        check_events(group, expected_bytes);
    }
}

fn check_same_content(expected: &Path, actual: &Path) {
    let expected_content = std::fs::read(expected)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", expected.display()));
    let actual_content = std::fs::read(actual)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", actual.display()));
    assert!(
        expected_content == actual_content,
        "{} differs from {} ({} vs {} bytes)",
        actual.display(),
        expected.display(),
        actual_content.len(),
        expected_content.len()
    );
}

/// Asserts that `events` is the complete, successful sequence of one
/// transfer of `expected_bytes` bytes.
pub fn check_events(events: &[TransferEvent], expected_bytes: u64) {
    for event in events {
        check_properties(event);
    }
    assert!(
        events.len() >= 3,
        "a transfer needs INITIATED, STARTED and SUCCEEDED, got:\n{}",
        describe(events)
    );
    assert_eq!(
        events[0].event_type(),
        TransferEventType::Initiated,
        "first event must be INITIATED:\n{}",
        describe(events)
    );
    assert_eq!(
        events[1].event_type(),
        TransferEventType::Started,
        "second event must be STARTED:\n{}",
        describe(events)
    );

    let (last, progressed) = events[2..]
        .split_last()
        .unwrap_or_else(|| panic!("missing terminal event:\n{}", describe(events)));
    assert_eq!(
        last.event_type(),
        TransferEventType::Succeeded,
        "last event must be SUCCEEDED:\n{}",
        describe(events)
    );

    let mut previous = 0u64;
    let mut total = 0u64;
    for event in progressed {
        assert_eq!(
            event.event_type(),
            TransferEventType::Progressed,
            "only PROGRESSED may appear between STARTED and SUCCEEDED:\n{}",
            describe(events)
        );
        let window = event
            .data()
            .unwrap_or_else(|| panic!("PROGRESSED event without data: {event}"));
        assert!(
            window.is_well_formed(),
            "malformed data window (offset {}, length {}, buffer {}): {event}",
            window.offset(),
            window.length(),
            window.buffer().len()
        );
        assert!(
            event.transferred_bytes() > previous,
            "transferred bytes must strictly increase ({} after {previous}): {event}",
            event.transferred_bytes()
        );
        previous = event.transferred_bytes();
        total += window.length() as u64;
    }

    assert_eq!(
        total, expected_bytes,
        "PROGRESSED chunks add up to {total} bytes, expected {expected_bytes}"
    );
    assert_eq!(
        last.transferred_bytes(),
        expected_bytes,
        "SUCCEEDED reports {} bytes, expected {expected_bytes}",
        last.transferred_bytes()
    );
}

/// Asserts the fields every event must carry.
pub fn check_properties(event: &TransferEvent) {
    let resource = event.resource();
    assert!(
        !resource.resource_name().is_empty(),
        "event without resource name: {event}"
    );
    assert!(
        !resource.repository_url().is_empty(),
        "event without repository URL: {event}"
    );
    if event.event_type() != TransferEventType::Progressed {
        assert!(event.data().is_none(), "{} event carries data: {event}", event.event_type());
    }
}

/// Asserts that `events` is the sequence of one transfer that ended with
/// `terminal` (FAILED or CORRUPTED) and never succeeded.
pub fn check_failed_events(events: &[TransferEvent], terminal: TransferEventType) {
    assert!(
        matches!(terminal, TransferEventType::Failed | TransferEventType::Corrupted),
        "{terminal} is not a failure"
    );
    for event in events {
        check_properties(event);
    }
    let (last, rest) = events
        .split_last()
        .unwrap_or_else(|| panic!("no events recorded"));
    assert_eq!(
        last.event_type(),
        terminal,
        "expected the transfer to end {terminal}:\n{}",
        describe(events)
    );
    assert!(
        last.error().is_some(),
        "{terminal} event carries no error: {last}"
    );
    assert_eq!(
        rest.first().map(|e| e.event_type()),
        Some(TransferEventType::Initiated),
        "first event must be INITIATED:\n{}",
        describe(events)
    );

    let mut previous = 0u64;
    for (i, event) in rest.iter().enumerate().skip(1) {
        match event.event_type() {
            TransferEventType::Started => assert_eq!(
                i,
                1,
                "STARTED must directly follow INITIATED:\n{}",
                describe(events)
            ),
            TransferEventType::Progressed => {
                assert_eq!(
                    rest[1].event_type(),
                    TransferEventType::Started,
                    "PROGRESSED before STARTED:\n{}",
                    describe(events)
                );
                assert!(
                    event.transferred_bytes() > previous,
                    "transferred bytes must strictly increase: {event}"
                );
                previous = event.transferred_bytes();
            }
            other => panic!(
                "unexpected {other} before the terminal event:\n{}",
                describe(events)
            ),
        }
    }
}

/// Splits interleaved events into per-transfer sequences, in order of each
/// transfer's first event.
///
/// A connector shares one [`TransferResource`] among all events of a
/// transfer, so transfers are told apart by that allocation. Two requests
/// for the same resource in one batch stay separate.
///
/// [`TransferResource`]: depot_protocol::TransferResource
pub fn group_by_transfer(events: &[TransferEvent]) -> Vec<Vec<TransferEvent>> {
    let mut groups: Vec<Vec<TransferEvent>> = Vec::new();
    for event in events {
        let existing = groups
            .iter_mut()
            .find(|group| Arc::ptr_eq(group[0].resource(), event.resource()));
        match existing {
            Some(group) => group.push(event.clone()),
            None => groups.push(vec![event.clone()]),
        }
    }
    groups
}

fn describe(events: &[TransferEvent]) -> String {
    events
        .iter()
        .map(|e| format!("  {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}
