//! Tests for pending-transmission GC and telemetry forwarding

use ocrnode_core::{Database, MonitoringEndpoint};
use ocrnode_managed::telemetry::forward_telemetry;
use ocrnode_managed::{collect_garbage, GC_MAX_AGE};
use ocrnode_protocol::TelemetrySender;
use ocrnode_storage::InMemoryDatabase;
use ocrnode_testkit::RecordingMonitoringEndpoint;
use ocrnode_types::{ConfigDigest, PendingTransmission, ReportTimestamp};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;

fn create_test_transmission(time: SystemTime) -> PendingTransmission {
    PendingTransmission {
        time,
        extra_hash: [0; 32],
        report: b"report".to_vec(),
        attributed_signatures: Vec::new(),
    }
}

#[tokio::test]
async fn test_gc_deletes_only_stale_transmissions() {
    let database = InMemoryDatabase::new();
    let digest = ConfigDigest::new([0x01; 32]);
    let other_digest = ConfigDigest::new([0x02; 32]);
    let now = SystemTime::now();

    let stale = now - GC_MAX_AGE - Duration::from_secs(60);
    database
        .store_pending_transmission(
            ReportTimestamp::new(digest, 1, 1),
            &create_test_transmission(stale),
        )
        .await
        .unwrap();
    database
        .store_pending_transmission(
            ReportTimestamp::new(other_digest, 1, 1),
            &create_test_transmission(stale),
        )
        .await
        .unwrap();
    database
        .store_pending_transmission(
            ReportTimestamp::new(digest, 1, 2),
            &create_test_transmission(now - Duration::from_secs(60)),
        )
        .await
        .unwrap();

    collect_garbage(&database, Duration::from_secs(1), &CancellationToken::new()).await;

    assert_eq!(database.pending_transmission_count(), 1);
    let remaining = database
        .pending_transmissions_with_config_digest(digest)
        .await
        .unwrap();
    assert!(remaining.contains_key(&ReportTimestamp::new(digest, 1, 2)));
}

#[tokio::test]
async fn test_gc_cancelled_leaves_database_untouched() {
    let database = InMemoryDatabase::new();
    let digest = ConfigDigest::new([0x01; 32]);
    database
        .store_pending_transmission(
            ReportTimestamp::new(digest, 1, 1),
            &create_test_transmission(SystemTime::UNIX_EPOCH),
        )
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    collect_garbage(&database, Duration::from_secs(1), &cancel).await;
    assert_eq!(database.pending_transmission_count(), 1);
}

#[tokio::test]
async fn test_telemetry_forwarded_in_order() {
    let endpoint = Arc::new(RecordingMonitoringEndpoint::new());
    let (sender, rx) = TelemetrySender::channel();
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(forward_telemetry(
        Some(endpoint.clone() as Arc<dyn MonitoringEndpoint>),
        rx,
        cancel.clone(),
    ));

    sender.send(b"one".to_vec());
    sender.send(b"two".to_vec());
    drop(sender);
    handle.await.unwrap();

    assert_eq!(endpoint.logs(), vec![b"one".to_vec(), b"two".to_vec()]);
}

#[tokio::test]
async fn test_telemetry_without_endpoint_is_drained() {
    let (sender, rx) = TelemetrySender::channel();
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(forward_telemetry(None, rx, cancel.clone()));

    for i in 0..10u8 {
        sender.send(vec![i]);
    }
    cancel.cancel();
    handle.await.unwrap();
}
