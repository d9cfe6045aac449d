//! Transfer protocol conformance of the built-in transports, plus failure
//! scenarios that the generic harness does not cover.

use std::path::Path;
use std::sync::Arc;

use depot_connector::{
    BasicConnectorFactory, ConnectorConfig, MemoryStore, MemoryTransportProvider,
    RepositoryLayout, TransportRegistry,
};
use depot_connector_test::{
    ConnectorTestContext, check_events, check_failed_events, create_temp_file,
    group_by_transfer, init_test_logging, setup_test_context, setup_test_context_with_url,
    stub_artifact, test_transfer_events, test_transfer_events_with,
};
use depot_protocol::{
    ChecksumPolicy, ConnectorError, Download, RemoteRepository, RepositoryConnector,
    RepositoryConnectorFactory, TransferError, TransferEventType, Upload,
};

fn memory_factory() -> BasicConnectorFactory {
    BasicConnectorFactory::with_defaults()
        .with_provider(Arc::new(MemoryTransportProvider::new(MemoryStore::new())))
}

fn connect(ctx: &ConnectorTestContext) -> Box<dyn RepositoryConnector> {
    BasicConnectorFactory::with_defaults()
        .new_instance(ctx.session(), ctx.repository())
        .unwrap()
}

/// Repository file of the first stub artifact.
fn stored_artifact(ctx: &ConnectorTestContext) -> std::path::PathBuf {
    let path = RepositoryLayout::Default.path(&stub_artifact(0).into());
    ctx.repository_dir().join(path)
}

/// Uploads `size` bytes as the first stub artifact, sidecar included.
async fn publish(ctx: &ConnectorTestContext, connector: &dyn RepositoryConnector, size: usize) {
    let payload = create_temp_file(ctx.work_dir(), size).unwrap();
    connector
        .put(&[Upload::new(stub_artifact(0), &payload)], &[])
        .await
        .unwrap();
    ctx.listener().clear();
}

fn assert_no_leftovers(dest: &Path) {
    assert!(!dest.exists(), "{} must not exist", dest.display());
    let part = dest.with_file_name(format!(
        "{}.part",
        dest.file_name().unwrap().to_string_lossy()
    ));
    assert!(!part.exists(), "{} must not exist", part.display());
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

#[tokio::test]
async fn file_transport_conforms() {
    init_test_logging();
    test_transfer_events(&BasicConnectorFactory::with_defaults()).await;
}

#[tokio::test]
async fn file_transport_conforms_for_one_byte() {
    let ctx = setup_test_context().unwrap();
    test_transfer_events_with(&BasicConnectorFactory::with_defaults(), &ctx, 1).await;
}

#[tokio::test]
async fn file_transport_conforms_for_empty_payload() {
    let ctx = setup_test_context().unwrap();
    test_transfer_events_with(&BasicConnectorFactory::with_defaults(), &ctx, 0).await;
}

#[tokio::test]
async fn memory_transport_conforms() {
    init_test_logging();
    let factory = memory_factory();
    for size in [10_000, 1, 0] {
        let ctx = setup_test_context_with_url("mem://central").unwrap();
        test_transfer_events_with(&factory, &ctx, size).await;
    }
}

#[tokio::test]
async fn small_chunks_and_low_concurrency_conform() {
    let config = ConnectorConfig {
        chunk_size: 7,
        max_concurrent_transfers: 1,
        ..ConnectorConfig::default()
    };
    let factory = BasicConnectorFactory::new(TransportRegistry::with_defaults(), config);
    let ctx = setup_test_context().unwrap();
    test_transfer_events_with(&factory, &ctx, 100).await;
}

// ---------------------------------------------------------------------------
// Checksum policies
// ---------------------------------------------------------------------------

#[tokio::test]
async fn corrupted_download_under_fail_policy() {
    init_test_logging();
    let ctx = setup_test_context().unwrap();
    let connector = connect(&ctx);
    publish(&ctx, connector.as_ref(), 1000).await;
    std::fs::write(stored_artifact(&ctx), vec![b'x'; 1000]).unwrap();

    let dest = ctx.work_dir().join("corrupted.jar");
    let downloads = vec![
        Download::new(stub_artifact(0), &dest).with_checksum_policy(ChecksumPolicy::Fail),
    ];
    connector.get(&downloads, &[]).await.unwrap();

    let events = ctx.listener().take();
    check_failed_events(&events, TransferEventType::Corrupted);
    assert_eq!(events[1].event_type(), TransferEventType::Started);
    assert!(
        events
            .iter()
            .all(|e| e.event_type() != TransferEventType::Succeeded)
    );
    assert!(matches!(
        events.last().unwrap().error().map(|e| e.as_ref()),
        Some(TransferError::ChecksumMismatch { .. })
    ));
    assert_no_leftovers(&dest);
}

#[tokio::test]
async fn corrupted_download_under_warn_policy_succeeds() {
    let ctx = setup_test_context().unwrap();
    let connector = connect(&ctx);
    publish(&ctx, connector.as_ref(), 500).await;
    std::fs::write(stored_artifact(&ctx), vec![b'y'; 500]).unwrap();

    let dest = ctx.work_dir().join("warned.jar");
    let downloads = vec![
        Download::new(stub_artifact(0), &dest).with_checksum_policy(ChecksumPolicy::Warn),
    ];
    connector.get(&downloads, &[]).await.unwrap();

    check_events(&ctx.listener().take(), 500);
    assert_eq!(std::fs::read(&dest).unwrap(), vec![b'y'; 500]);
}

#[tokio::test]
async fn intact_download_under_fail_policy_succeeds() {
    let ctx = setup_test_context().unwrap();
    let connector = connect(&ctx);
    publish(&ctx, connector.as_ref(), 2048).await;

    let dest = ctx.work_dir().join("verified.jar");
    let downloads = vec![
        Download::new(stub_artifact(0), &dest).with_checksum_policy(ChecksumPolicy::Fail),
    ];
    connector.get(&downloads, &[]).await.unwrap();

    check_events(&ctx.listener().take(), 2048);
    assert!(dest.exists());
}

#[tokio::test]
async fn missing_checksum_under_fail_policy() {
    let ctx = setup_test_context().unwrap();
    let stored = stored_artifact(&ctx);
    std::fs::create_dir_all(stored.parent().unwrap()).unwrap();
    std::fs::write(&stored, b"no sidecar").unwrap();

    let connector = connect(&ctx);
    let dest = ctx.work_dir().join("unverified.jar");
    let downloads = vec![
        Download::new(stub_artifact(0), &dest).with_checksum_policy(ChecksumPolicy::Fail),
    ];
    connector.get(&downloads, &[]).await.unwrap();

    let events = ctx.listener().take();
    check_failed_events(&events, TransferEventType::Failed);
    assert!(matches!(
        events.last().unwrap().error().map(|e| e.as_ref()),
        Some(TransferError::ChecksumMissing(_))
    ));
    assert_no_leftovers(&dest);
}

#[tokio::test]
async fn session_policy_applies_when_request_names_none() {
    let ctx = setup_test_context().unwrap();
    let stored = stored_artifact(&ctx);
    std::fs::create_dir_all(stored.parent().unwrap()).unwrap();
    std::fs::write(&stored, b"no sidecar").unwrap();

    let session = ctx.session().clone().with_checksum_policy(ChecksumPolicy::Fail);
    let connector = BasicConnectorFactory::with_defaults()
        .new_instance(&session, ctx.repository())
        .unwrap();
    let dest = ctx.work_dir().join("strict.jar");
    connector
        .get(&[Download::new(stub_artifact(0), &dest)], &[])
        .await
        .unwrap();

    check_failed_events(&ctx.listener().take(), TransferEventType::Failed);
}

// ---------------------------------------------------------------------------
// Batches and setup faults
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failing_request_does_not_affect_batch_siblings() {
    let ctx = setup_test_context().unwrap();
    let connector = connect(&ctx);
    publish(&ctx, connector.as_ref(), 300).await;

    let present = ctx.work_dir().join("present.jar");
    let absent = ctx.work_dir().join("absent.jar");
    let downloads = vec![
        Download::new(stub_artifact(0), &present).with_checksum_policy(ChecksumPolicy::Ignore),
        Download::new(stub_artifact(1), &absent).with_checksum_policy(ChecksumPolicy::Ignore),
    ];
    connector.get(&downloads, &[]).await.unwrap();

    let groups = group_by_transfer(&ctx.listener().take());
    assert_eq!(groups.len(), 2);
    for group in &groups {
        match group.last().unwrap().event_type() {
            TransferEventType::Succeeded => check_events(group, 300),
            TransferEventType::Failed => {
                check_failed_events(group, TransferEventType::Failed);
                assert!(matches!(
                    group.last().unwrap().error().map(|e| e.as_ref()),
                    Some(TransferError::NotFound(_))
                ));
            }
            other => panic!("unexpected terminal event {other}"),
        }
    }
    assert!(present.exists());
    assert!(!absent.exists());
}

#[tokio::test]
async fn same_artifact_to_two_destinations_is_two_transfers() {
    let ctx = setup_test_context().unwrap();
    let connector = connect(&ctx);
    publish(&ctx, connector.as_ref(), 100).await;

    let one = ctx.work_dir().join("one.jar");
    let two = ctx.work_dir().join("two.jar");
    let downloads = vec![
        Download::new(stub_artifact(0), &one).with_checksum_policy(ChecksumPolicy::Ignore),
        Download::new(stub_artifact(0), &two).with_checksum_policy(ChecksumPolicy::Ignore),
    ];
    connector.get(&downloads, &[]).await.unwrap();

    let events = ctx.listener().take();
    assert_eq!(events.len(), 8);
    let groups = group_by_transfer(&events);
    assert_eq!(groups.len(), 2);
    for group in &groups {
        check_events(group, 100);
    }
    assert_eq!(std::fs::read(&one).unwrap().len(), 100);
    assert_eq!(std::fs::read(&two).unwrap().len(), 100);
}

#[tokio::test]
async fn large_batch_settles_every_request() {
    let config = ConnectorConfig {
        max_concurrent_transfers: 3,
        chunk_size: 256,
        ..ConnectorConfig::default()
    };
    let factory = BasicConnectorFactory::new(TransportRegistry::with_defaults(), config);
    let ctx = setup_test_context().unwrap();
    let connector = factory.new_instance(ctx.session(), ctx.repository()).unwrap();

    let payload = create_temp_file(ctx.work_dir(), 1500).unwrap();
    let uploads: Vec<_> = (0..8)
        .map(|i| Upload::new(stub_artifact(i), &payload))
        .collect();
    connector.put(&uploads, &[]).await.unwrap();

    let groups = group_by_transfer(&ctx.listener().take());
    assert_eq!(groups.len(), 8);
    for group in &groups {
        check_events(group, 1500);
    }
}

#[tokio::test]
async fn missing_upload_source_fails_after_initiated() {
    let ctx = setup_test_context().unwrap();
    let connector = connect(&ctx);
    let missing = ctx.work_dir().join("does-not-exist.jar");
    connector
        .put(&[Upload::new(stub_artifact(0), &missing)], &[])
        .await
        .unwrap();

    let events = ctx.listener().take();
    assert_eq!(
        events.iter().map(|e| e.event_type()).collect::<Vec<_>>(),
        vec![TransferEventType::Initiated, TransferEventType::Failed]
    );
    check_failed_events(&events, TransferEventType::Failed);
}

#[tokio::test]
async fn relative_paths_resolve_under_local_cache_root() {
    let ctx = setup_test_context().unwrap();
    let connector = connect(&ctx);
    publish(&ctx, connector.as_ref(), 64).await;

    let downloads = vec![
        Download::new(stub_artifact(0), "cache/a.jar").with_checksum_policy(ChecksumPolicy::Ignore),
    ];
    connector.get(&downloads, &[]).await.unwrap();

    let events = ctx.listener().take();
    check_events(&events, 64);
    let expected = ctx.local_dir().join("cache/a.jar");
    assert_eq!(events[0].resource().file(), &expected);
    assert!(expected.exists());
}

#[tokio::test]
async fn empty_local_path_rejects_whole_batch() {
    let ctx = setup_test_context().unwrap();
    let connector = connect(&ctx);
    let payload = create_temp_file(ctx.work_dir(), 10).unwrap();
    let uploads = vec![
        Upload::new(stub_artifact(0), &payload),
        Upload::new(stub_artifact(1), ""),
    ];

    let result = connector.put(&uploads, &[]).await;
    assert!(matches!(result, Err(ConnectorError::InvalidRequest(_))));
    assert!(ctx.listener().events().is_empty());
}

#[tokio::test]
async fn unknown_scheme_has_no_connector() {
    let ctx = setup_test_context().unwrap();
    let repository = RemoteRepository::new("remote", "default", "ftp://example.org/repo");
    let result = BasicConnectorFactory::with_defaults().new_instance(ctx.session(), &repository);
    assert!(matches!(result, Err(ConnectorError::NoConnector { .. })));
}

#[tokio::test]
async fn closed_connector_rejects_batches() {
    let ctx = setup_test_context().unwrap();
    let connector = connect(&ctx);
    connector.close();

    let payload = create_temp_file(ctx.work_dir(), 10).unwrap();
    let result = connector
        .put(&[Upload::new(stub_artifact(0), &payload)], &[])
        .await;
    assert!(matches!(result, Err(ConnectorError::Closed(_))));
    assert!(ctx.listener().events().is_empty());
}

#[tokio::test]
async fn empty_batches_emit_nothing() {
    let ctx = setup_test_context().unwrap();
    let connector = connect(&ctx);
    connector.put(&[], &[]).await.unwrap();
    connector.get(&[], &[]).await.unwrap();
    assert!(ctx.listener().events().is_empty());
}
