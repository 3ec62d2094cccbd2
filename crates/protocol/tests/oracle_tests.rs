//! Tests for the oracle runtime: routing through a real endpoint and shutdown

use ocrnode_protocol::endpoint::encode;
use ocrnode_protocol::{
    AttestedReportMany, Oracle, PhaseContext, ProtocolMessage, SerializingEndpoint,
    TelemetrySender,
};
use ocrnode_storage::InMemoryDatabase;
use ocrnode_testkit::{
    LoopbackNetwork, MockReportingPlugin, RecordingTransmitter, ScriptedPhases, TestCluster,
};
use ocrnode_types::{ConfigDigest, OracleId};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct TestOracle {
    network: Arc<LoopbackNetwork>,
    config_digest: ConfigDigest,
    phases: Arc<ScriptedPhases>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl TestOracle {
    fn inject(&self, from: u8, msg: ProtocolMessage) {
        self.network.inject(
            self.config_digest,
            OracleId(from),
            OracleId(0),
            encode(&msg).unwrap(),
        );
    }
}

async fn create_test_oracle() -> TestOracle {
    let cluster = TestCluster::new(4, 1);
    let (shared, oracle_id) = cluster.shared_config(0);
    let config_digest = shared.config_digest;

    let network = LoopbackNetwork::new();
    let endpoint = Arc::new(SerializingEndpoint::new(
        network.endpoint(config_digest, oracle_id, 4),
        64 * 1024,
    ));
    let inbound = endpoint.start().await.unwrap();

    let (telemetry, _telemetry_rx) = TelemetrySender::channel();
    let oracle = &cluster.oracles[0];
    let ctx = PhaseContext {
        config: Arc::new(shared),
        oracle_id,
        report_quorum: 3,
        local_config: Default::default(),
        plugin: Arc::new(MockReportingPlugin::new()),
        offchain_keyring: oracle.offchain_keyring.clone(),
        onchain_keyring: oracle.onchain_keyring.clone(),
        database: Arc::new(InMemoryDatabase::new()),
        network: endpoint,
        telemetry,
    };

    let phases = ScriptedPhases::new();
    let transmitter = Arc::new(RecordingTransmitter::new("0xtransmitter0".into()));
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(
        Oracle::new(ctx, phases.clone(), transmitter).run(inbound, cancel.clone()),
    );

    TestOracle {
        network,
        config_digest,
        phases,
        cancel,
        handle,
    }
}

fn observe_req(epoch: u32, round: u8) -> ProtocolMessage {
    ProtocolMessage::ObserveReq {
        epoch,
        round,
        query: vec![round],
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_current_epoch_message_reaches_report_generation() {
    let oracle = create_test_oracle().await;

    oracle.inject(2, observe_req(0, 1));

    let phases = oracle.phases.clone();
    wait_until(|| phases.report_generation_messages().len() == 1).await;
    let received = &oracle.phases.report_generation_messages()[0];
    assert_eq!(received.sender, OracleId(2));
    assert_eq!(received.msg, observe_req(0, 1));
    assert_eq!(oracle.phases.report_quorum(), Some(3));

    oracle.cancel.cancel();
    oracle.handle.await.unwrap();
}

#[tokio::test]
async fn test_future_epoch_message_released_on_epoch_change() {
    let oracle = create_test_oracle().await;

    oracle.inject(1, observe_req(1, 1));
    oracle.inject(1, observe_req(3, 1));
    // marker to know the runtime has routed the messages above
    oracle.inject(2, ProtocolMessage::Final {
        epoch: 0,
        round: 1,
        query: Vec::new(),
        report: AttestedReportMany {
            report: Vec::new(),
            attributed_signatures: Vec::new(),
        },
    });
    let phases = oracle.phases.clone();
    wait_until(|| phases.finalization_messages().len() == 1).await;
    assert!(oracle.phases.report_generation_messages().is_empty());

    oracle.inject(3, ProtocolMessage::NewEpoch { epoch: 1 });
    wait_until(|| phases.report_generation_messages().len() == 1).await;
    assert_eq!(
        oracle.phases.report_generation_messages()[0].msg,
        observe_req(1, 1)
    );

    oracle.cancel.cancel();
    oracle.handle.await.unwrap();
}

#[tokio::test]
async fn test_past_epoch_message_dropped() {
    let oracle = create_test_oracle().await;

    oracle.inject(1, ProtocolMessage::NewEpoch { epoch: 5 });
    oracle.inject(1, observe_req(5, 1));
    let phases = oracle.phases.clone();
    wait_until(|| phases.report_generation_messages().len() == 1).await;

    oracle.inject(1, observe_req(4, 2));
    oracle.inject(1, observe_req(5, 3));
    wait_until(|| phases.report_generation_messages().len() == 2).await;
    assert_eq!(
        oracle.phases.report_generation_messages()[1].msg,
        observe_req(5, 3)
    );

    oracle.cancel.cancel();
    oracle.handle.await.unwrap();
}

#[tokio::test]
async fn test_garbage_frames_are_dropped() {
    let oracle = create_test_oracle().await;

    oracle.network.inject(
        oracle.config_digest,
        OracleId(1),
        OracleId(0),
        vec![0xFF; 7].into(),
    );
    oracle.network.inject(
        oracle.config_digest,
        OracleId(1),
        OracleId(0),
        vec![0u8; 128 * 1024].into(),
    );
    oracle.inject(1, observe_req(0, 9));

    let phases = oracle.phases.clone();
    wait_until(|| phases.report_generation_messages().len() == 1).await;
    assert_eq!(
        oracle.phases.report_generation_messages()[0].msg,
        observe_req(0, 9)
    );

    oracle.cancel.cancel();
    oracle.handle.await.unwrap();
}

#[tokio::test]
async fn test_shutdown_waits_for_every_phase() {
    let oracle = create_test_oracle().await;
    let phases = oracle.phases.clone();
    wait_until(|| phases.report_quorum().is_some()).await;

    oracle.cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), oracle.handle)
        .await
        .expect("runtime did not shut down")
        .unwrap();

    assert_eq!(phases.exited(), 2);
}
