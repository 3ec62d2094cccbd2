//! Integration tests for the JSON-file database

use ocrnode_core::{Database, DatabaseError};
use ocrnode_storage::FileDatabase;
use ocrnode_types::{
    ConfigDigest, ContractConfig, PendingTransmission, PersistentState, ReportTimestamp,
};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tempfile::TempDir;

async fn create_test_db() -> (FileDatabase, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = FileDatabase::open(temp_dir.path().join("ocr.json"))
        .await
        .unwrap();
    (db, temp_dir)
}

fn create_test_config() -> ContractConfig {
    ContractConfig {
        config_digest: ConfigDigest::new([9; 32]),
        config_count: 2,
        signers: vec![vec![1; 20], vec![2; 20], vec![3; 20], vec![4; 20]],
        transmitters: vec!["t0".into(), "t1".into(), "t2".into(), "t3".into()],
        f: 1,
        onchain_config: vec![0xC0],
        offchain_config_version: 2,
        offchain_config: b"{}".to_vec(),
    }
}

#[tokio::test]
async fn test_open_empty() {
    let (db, _temp_dir) = create_test_db().await;
    assert_eq!(db.read_config().await.unwrap(), None);
    assert!(!db.path().exists());
}

#[tokio::test]
async fn test_contents_survive_reopen() {
    let (db, temp_dir) = create_test_db().await;
    let digest = ConfigDigest::new([9; 32]);
    let ts = ReportTimestamp::new(digest, 5, 1);
    // whole seconds, so the value survives JSON exactly
    let time = UNIX_EPOCH + Duration::from_secs(1_900_000_000);
    let transmission = PendingTransmission {
        time,
        extra_hash: [3; 32],
        report: b"r".to_vec(),
        attributed_signatures: vec![],
    };
    let state = PersistentState {
        epoch: 5,
        highest_sent_epoch: 5,
        highest_received_epoch: vec![5, 5, 4, 0],
    };

    db.write_config(&create_test_config()).await.unwrap();
    db.write_state(digest, &state).await.unwrap();
    db.store_pending_transmission(ts, &transmission).await.unwrap();
    let path = db.path().to_path_buf();
    drop(db);

    let reopened = FileDatabase::open(&path).await.unwrap();
    assert_eq!(reopened.read_config().await.unwrap(), Some(create_test_config()));
    assert_eq!(reopened.read_state(digest).await.unwrap(), Some(state));
    let pending = reopened
        .pending_transmissions_with_config_digest(digest)
        .await
        .unwrap();
    assert_eq!(pending.get(&ts), Some(&transmission));
    drop(temp_dir);
}

#[tokio::test]
async fn test_delete_is_persisted() {
    let (db, _temp_dir) = create_test_db().await;
    let ts = ReportTimestamp::new(ConfigDigest::new([1; 32]), 1, 1);
    let transmission = PendingTransmission {
        time: SystemTime::now(),
        extra_hash: [0; 32],
        report: vec![],
        attributed_signatures: vec![],
    };

    db.store_pending_transmission(ts, &transmission).await.unwrap();
    db.delete_pending_transmission(ts).await.unwrap();

    let reopened = FileDatabase::open(db.path()).await.unwrap();
    assert!(reopened
        .pending_transmissions_with_config_digest(ts.config_digest)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_corrupt_file_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("ocr.json");
    std::fs::write(&path, b"not json").unwrap();

    let result = FileDatabase::open(&path).await;
    assert!(matches!(result, Err(DatabaseError::Corruption(_))));
}
