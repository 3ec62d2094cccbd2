//! End-to-end tests for the config lifecycle of ManagedOracle

use ocrnode_config::{LocalConfig, PlaintextOffchainConfigDecoder};
use ocrnode_core::Database;
use ocrnode_managed::{Backoff, ManagedOracle, ManagedOracleArgs};
use ocrnode_storage::InMemoryDatabase;
use ocrnode_testkit::{
    LoopbackEndpointFactory, LoopbackNetwork, MockConfigTracker, MockReportingPluginFactory,
    RecordingMonitoringEndpoint, RecordingTransmitter, ScriptedPhases, TestCluster, TestOracle,
};
use ocrnode_types::{ConfigDigest, ReportingPluginLimits, MAX_MAX_REPORT_LENGTH};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct TestManagedOracle {
    tracker: Arc<MockConfigTracker>,
    plugin_factory: Arc<MockReportingPluginFactory>,
    endpoint_factory: Arc<LoopbackEndpointFactory>,
    phases: Arc<ScriptedPhases>,
    database: Arc<InMemoryDatabase>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl TestManagedOracle {
    /// Oracle with the keys of `me` that accepts configs digested like
    /// `cluster`'s, not yet running.
    fn new(cluster: &TestCluster, me: &TestOracle) -> (Self, ManagedOracleArgs) {
        let tracker = Arc::new(MockConfigTracker::with_notify());
        tracker.set_block_height(1_000);
        let plugin_factory = Arc::new(MockReportingPluginFactory::new(true));
        let endpoint_factory = Arc::new(LoopbackEndpointFactory::new(
            LoopbackNetwork::new(),
            me.identity.peer_id.clone(),
        ));
        let phases = ScriptedPhases::new();
        let database = Arc::new(InMemoryDatabase::new());

        let args = ManagedOracleArgs {
            local_config: LocalConfig {
                skip_contract_config_confirmations: true,
                ..LocalConfig::default()
            },
            contract_config_tracker: tracker.clone(),
            contract_transmitter: Arc::new(RecordingTransmitter::new(
                me.identity.transmit_account.clone(),
            )),
            database: database.clone(),
            offchain_config_digester: Arc::new(cluster.digester()),
            offchain_config_decoder: Arc::new(PlaintextOffchainConfigDecoder),
            offchain_keyring: me.offchain_keyring.clone(),
            onchain_keyring: me.onchain_keyring.clone(),
            reporting_plugin_factory: plugin_factory.clone(),
            network_endpoint_factory: endpoint_factory.clone(),
            protocol_phases: phases.clone(),
            monitoring_endpoint: Some(Arc::new(RecordingMonitoringEndpoint::new())),
        };

        let test = Self {
            tracker,
            plugin_factory,
            endpoint_factory,
            phases,
            database,
            cancel: CancellationToken::new(),
            handle: None,
        };
        (test, args)
    }

    fn start(&mut self, args: ManagedOracleArgs) {
        let oracle = ManagedOracle::new(args).with_backoff(Backoff::new(
            Duration::from_secs(1),
            Duration::from_secs(8),
            2,
            0.0,
        ));
        self.handle = Some(tokio::spawn(oracle.run(self.cancel.clone())));
    }

    fn created_digests(&self) -> Vec<ConfigDigest> {
        self.endpoint_factory
            .created()
            .into_iter()
            .map(|(digest, _)| digest)
            .collect()
    }

    async fn shutdown(mut self) -> Self {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle.await.unwrap();
        }
        self
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(120), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn create_next_cluster(config_count: u64) -> TestCluster {
    let mut cluster = TestCluster::new(4, 1);
    cluster.config_count = config_count;
    cluster
}

#[tokio::test(start_paused = true)]
async fn test_new_config_starts_pipeline() {
    let cluster = TestCluster::new(4, 1);
    let cc = cluster.contract_config();
    let (mut test, args) = TestManagedOracle::new(&cluster, &cluster.oracles[2]);
    test.tracker.set_config(cc.clone(), 10);
    test.start(args);

    wait_until(|| test.phases.report_quorum().is_some()).await;
    assert_eq!(test.created_digests(), vec![cc.config_digest]);
    // unique reports with N=4, F=1
    assert_eq!(test.phases.report_quorum(), Some(3));

    let configs = test.plugin_factory.configs();
    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0].config_digest, cc.config_digest);
    assert_eq!(configs[0].oracle_id.index(), 2);
    assert_eq!(configs[0].n, 4);
    assert_eq!(configs[0].f, 1);
    assert_eq!(configs[0].estimated_round_interval, Duration::from_secs(1));

    let endpoint = &test.endpoint_factory.endpoints()[0];
    assert!(endpoint.is_started());

    let database = test.database.clone();
    let mut persisted = None;
    for _ in 0..100 {
        persisted = database.read_config().await.unwrap();
        if persisted.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(persisted, Some(cc));

    let test = test.shutdown().await;
    assert!(test.endpoint_factory.endpoints()[0].is_closed());
    assert_eq!(test.plugin_factory.plugin.close_count(), 1);
    assert_eq!(test.phases.exited(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_non_unique_plugin_uses_f_plus_one_quorum() {
    let cluster = TestCluster::new(4, 1);
    let (mut test, mut args) = TestManagedOracle::new(&cluster, &cluster.oracles[0]);
    args.reporting_plugin_factory = Arc::new(MockReportingPluginFactory::new(false));
    test.tracker.set_config(cluster.contract_config(), 10);
    test.start(args);

    wait_until(|| test.phases.report_quorum().is_some()).await;
    assert_eq!(test.phases.report_quorum(), Some(2));
    test.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_restores_config_from_database() {
    let cluster = TestCluster::new(4, 1);
    let cc = cluster.contract_config();
    let (mut test, args) = TestManagedOracle::new(&cluster, &cluster.oracles[0]);
    test.database.write_config(&cc).await.unwrap();
    test.start(args);

    wait_until(|| !test.created_digests().is_empty()).await;
    assert_eq!(test.created_digests(), vec![cc.config_digest]);

    // the tracker reports nothing new, so the restored config keeps running
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(test.created_digests().len(), 1);
    assert!(test.tracker.detail_calls() > 0);
    test.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_restored_config_not_restarted_by_tracker() {
    let cluster = TestCluster::new(4, 1);
    let cc = cluster.contract_config();
    let (mut test, args) = TestManagedOracle::new(&cluster, &cluster.oracles[0]);
    test.database.write_config(&cc).await.unwrap();
    test.tracker.set_config(cc.clone(), 10);
    test.start(args);

    wait_until(|| !test.created_digests().is_empty()).await;
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(test.created_digests(), vec![cc.config_digest]);
    assert_eq!(test.plugin_factory.configs().len(), 1);
    test.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_restored_config_with_bad_digest_ignored() {
    let cluster = TestCluster::new(4, 1);
    let mut cc = cluster.contract_config();
    cc.config_digest = ConfigDigest::new([0x11; 32]);
    let (mut test, args) = TestManagedOracle::new(&cluster, &cluster.oracles[0]);
    test.database.write_config(&cc).await.unwrap();
    test.start(args);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(test.created_digests().is_empty());
    assert!(test.plugin_factory.configs().is_empty());
    test.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_config_change_replaces_pipeline() {
    let first = TestCluster::new(4, 1).contract_config();
    let second = create_next_cluster(2).contract_config();
    let cluster = TestCluster::new(4, 1);
    let (mut test, args) = TestManagedOracle::new(&cluster, &cluster.oracles[1]);
    test.tracker.set_config(first.clone(), 10);
    test.start(args);

    wait_until(|| test.created_digests().len() == 1).await;
    wait_until(|| test.phases.report_quorum().is_some()).await;

    test.tracker.set_config(second.clone(), 20);
    wait_until(|| {
        test.endpoint_factory
            .endpoints()
            .get(1)
            .is_some_and(|endpoint| endpoint.is_started())
    })
    .await;

    assert_eq!(
        test.created_digests(),
        vec![first.config_digest, second.config_digest]
    );
    let endpoints = test.endpoint_factory.endpoints();
    assert!(endpoints[0].is_closed());
    assert!(endpoints[1].is_started());
    assert!(!endpoints[1].is_closed());
    // the first pipeline was fully torn down before the second started
    assert_eq!(test.phases.exited(), 2);
    assert_eq!(test.plugin_factory.plugin.close_count(), 1);

    let test = test.shutdown().await;
    assert_eq!(test.phases.exited(), 4);
    assert_eq!(test.plugin_factory.plugin.close_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_node_outside_config_does_not_start() {
    let cluster = TestCluster::new(4, 1);
    let outsider = TestOracle::new(9);
    let (mut test, args) = TestManagedOracle::new(&cluster, &outsider);
    test.tracker.set_config(cluster.contract_config(), 10);
    test.start(args);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(test.plugin_factory.configs().is_empty());
    assert!(test.created_digests().is_empty());
    test.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_oversized_plugin_limits_abort_cycle() {
    let cluster = TestCluster::new(4, 1);
    let (mut test, args) = TestManagedOracle::new(&cluster, &cluster.oracles[0]);
    test.plugin_factory.set_limits(ReportingPluginLimits {
        max_query_length: 1024,
        max_observation_length: 1024,
        max_report_length: MAX_MAX_REPORT_LENGTH + 1,
    });
    test.tracker.set_config(cluster.contract_config(), 10);
    test.start(args);

    wait_until(|| test.plugin_factory.plugin.close_count() == 1).await;
    tokio::time::sleep(Duration::from_secs(120)).await;

    // not retried: the limits will not change for this config
    assert_eq!(test.plugin_factory.configs().len(), 1);
    assert!(test.created_digests().is_empty());
    assert!(test.database.read_config().await.unwrap().is_none());
    test.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_plugin_failure_retried_with_backoff() {
    let cluster = TestCluster::new(4, 1);
    let cc = cluster.contract_config();
    let (mut test, args) = TestManagedOracle::new(&cluster, &cluster.oracles[0]);
    test.plugin_factory.fail_next(2);
    test.tracker.set_config(cc.clone(), 10);

    let started = tokio::time::Instant::now();
    test.start(args);

    wait_until(|| !test.created_digests().is_empty()).await;
    assert_eq!(test.plugin_factory.configs().len(), 3);
    assert_eq!(test.created_digests(), vec![cc.config_digest]);
    // 1s then 2s between attempts
    assert!(started.elapsed() >= Duration::from_secs(3));
    test.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_without_config() {
    let cluster = TestCluster::new(4, 1);
    let (mut test, args) = TestManagedOracle::new(&cluster, &cluster.oracles[0]);
    test.start(args);

    tokio::time::sleep(Duration::from_secs(30)).await;
    let test = test.shutdown().await;
    assert!(test.created_digests().is_empty());
    assert_eq!(test.phases.exited(), 0);
}
