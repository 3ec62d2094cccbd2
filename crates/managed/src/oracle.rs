//! The long-running oracle: restarts the protocol on every config change.
//!
//! ```text
//! ManagedOracle::run
//!   ├── telemetry forwarding   (node lifetime)
//!   ├── pending-transmission GC (node lifetime)
//!   ├── ConfigTracker ──(ContractConfig)──┐
//!   └── config cycle  ◄───────────────────┘
//!         close old: Oracle ─► endpoint ─► plugin
//!         start new: plugin ─► endpoint ─► Oracle
//! ```
//!
//! A cycle that fails to start is logged and abandoned. Failures of a
//! collaborator are retried with [`Backoff`] until the next config change.

use crate::backoff::Backoff;
use crate::config_digest::PrefixCheckConfigDigester;
use crate::database::{load_config_from_database, write_config_to_database};
use crate::error::ManagedError;
use crate::gc::run_gc;
use crate::limits::{network_limits, report_quorum, validate_plugin_limits};
use crate::telemetry::forward_telemetry;
use crate::track_config::{ConfigTracker, CONFIG_CHANNEL_CAPACITY};
use anyhow::Context;
use ocrnode_config::{LocalConfig, LocalIdentity, OffchainConfigDecoder, SharedConfig};
use ocrnode_core::{
    BinaryNetworkEndpointFactory, ContractConfigTracker, ContractTransmitter, Database,
    MonitoringEndpoint, OffchainConfigDigester, OffchainKeyring, OnchainKeyring, ReportingPlugin,
    ReportingPluginFactory,
};
use ocrnode_protocol::{
    with_timeout, Oracle, PhaseContext, ProtocolPhases, SerializingEndpoint, TelemetrySender,
};
use ocrnode_types::{ConfigDigest, ContractConfig, ReportingPluginConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Time budget for closing an endpoint or plugin of a finished cycle.
const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Collaborators of a [`ManagedOracle`].
#[derive(Clone)]
pub struct ManagedOracleArgs {
    /// Local timeouts and chain settings
    pub local_config: LocalConfig,
    /// Source of contract configs
    pub contract_config_tracker: Arc<dyn ContractConfigTracker>,
    /// Sends reports to the contract
    pub contract_transmitter: Arc<dyn ContractTransmitter>,
    /// Persistent state
    pub database: Arc<dyn Database>,
    /// Computes config digests
    pub offchain_config_digester: Arc<dyn OffchainConfigDigester>,
    /// Decodes the offchain part of a contract config
    pub offchain_config_decoder: Arc<dyn OffchainConfigDecoder>,
    /// Signs protocol messages
    pub offchain_keyring: Arc<dyn OffchainKeyring>,
    /// Signs reports
    pub onchain_keyring: Arc<dyn OnchainKeyring>,
    /// Creates a reporting plugin per config
    pub reporting_plugin_factory: Arc<dyn ReportingPluginFactory>,
    /// Creates a network endpoint per config
    pub network_endpoint_factory: Arc<dyn BinaryNetworkEndpointFactory>,
    /// Pacemaker and report finalization
    pub protocol_phases: Arc<dyn ProtocolPhases>,
    /// Telemetry sink; telemetry is dropped without one
    pub monitoring_endpoint: Option<Arc<dyn MonitoringEndpoint>>,
}

/// Everything that lives exactly as long as one configuration.
struct RunningConfig {
    config_digest: ConfigDigest,
    cancel: CancellationToken,
    oracle: JoinHandle<()>,
    endpoint: Arc<SerializingEndpoint>,
    plugin: Arc<dyn ReportingPlugin>,
}

impl RunningConfig {
    async fn close(self) {
        debug!(config_digest = %self.config_digest, "Closing config");
        self.cancel.cancel();
        if let Err(e) = self.oracle.await {
            error!(error = %e, "Oracle task failed");
        }
        close_endpoint(&self.endpoint).await;
        close_plugin(self.plugin.as_ref()).await;
    }
}

async fn close_endpoint(endpoint: &SerializingEndpoint) {
    match tokio::time::timeout(TEARDOWN_TIMEOUT, endpoint.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "Error closing network endpoint"),
        Err(_) => error!("Closing network endpoint timed out"),
    }
}

async fn close_plugin(plugin: &dyn ReportingPlugin) {
    match tokio::time::timeout(TEARDOWN_TIMEOUT, plugin.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "Error closing reporting plugin"),
        Err(_) => error!("Closing reporting plugin timed out"),
    }
}

/// A config whose start failed and is scheduled to be tried again.
struct PendingRetry {
    contract_config: ContractConfig,
    at: Instant,
}

/// Runs the oracle protocol for whatever configuration the contract holds.
pub struct ManagedOracle {
    args: ManagedOracleArgs,
    digester: PrefixCheckConfigDigester,
    telemetry: TelemetrySender,
    telemetry_rx: Option<mpsc::Receiver<Vec<u8>>>,
    running: Option<RunningConfig>,
    retry: Option<PendingRetry>,
    backoff: Backoff,
}

impl ManagedOracle {
    /// Create an oracle. Nothing runs until [`run`](Self::run).
    pub fn new(args: ManagedOracleArgs) -> Self {
        let digester = PrefixCheckConfigDigester::new(Arc::clone(&args.offchain_config_digester));
        let (telemetry, telemetry_rx) = TelemetrySender::channel();
        Self {
            args,
            digester,
            telemetry,
            telemetry_rx: Some(telemetry_rx),
            running: None,
            retry: None,
            backoff: Backoff::default(),
        }
    }

    /// Override the retry policy for failed config cycles.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Run until `cancel` fires, then close the current configuration and
    /// wait for every task.
    #[instrument(skip_all, name = "managed_oracle")]
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("ManagedOracle: running");
        let database_timeout = self.args.local_config.database_timeout();
        let mut tasks = JoinSet::new();

        if let Some(telemetry_rx) = self.telemetry_rx.take() {
            tasks.spawn(forward_telemetry(
                self.args.monitoring_endpoint.clone(),
                telemetry_rx,
                cancel.clone(),
            ));
        }
        tasks.spawn(run_gc(
            Arc::clone(&self.args.database),
            database_timeout,
            cancel.clone(),
        ));

        let restored = load_config_from_database(
            self.args.database.as_ref(),
            database_timeout,
            &self.digester,
            &cancel,
        )
        .await;
        let initial_digest = restored
            .as_ref()
            .map_or(ConfigDigest::ZERO, |cc| cc.config_digest);
        if let Some(cc) = restored {
            info!(config_digest = %cc.config_digest, "ManagedOracle: restored config from database");
            self.config_changed(cc, &cancel).await;
        }

        let (configs_tx, mut configs_rx) = mpsc::channel(CONFIG_CHANNEL_CAPACITY);
        let tracker = ConfigTracker::new(
            Arc::clone(&self.args.contract_config_tracker),
            self.digester.clone(),
            self.args.local_config.clone(),
            initial_digest,
        );
        tasks.spawn(tracker.run(configs_tx, cancel.clone()));

        loop {
            let retry_at = self.retry.as_ref().map(|retry| retry.at);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                Some(cc) = configs_rx.recv() => {
                    self.backoff.reset();
                    self.config_changed(cc, &cancel).await;
                }
                _ = sleep_until(retry_at) => {
                    if let Some(retry) = self.retry.take() {
                        info!(
                            config_digest = %retry.contract_config.config_digest,
                            attempt = self.backoff.attempt(),
                            "ManagedOracle: retrying config"
                        );
                        self.config_changed(retry.contract_config, &cancel).await;
                    }
                }
            }

            if cancel.is_cancelled() {
                break;
            }
        }

        debug!("ManagedOracle: winding down");
        if let Some(running) = self.running.take() {
            running.close().await;
        }
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "ManagedOracle: task failed");
            }
        }
        info!("ManagedOracle: exiting");
    }

    async fn config_changed(&mut self, cc: ContractConfig, cancel: &CancellationToken) {
        if let Some(running) = self.running.take() {
            running.close().await;
        }
        self.retry = None;
        if cancel.is_cancelled() {
            return;
        }

        let config_digest = cc.config_digest;
        match self.start_config(&cc, cancel).await {
            Ok(running) => {
                info!(%config_digest, "ManagedOracle: running new config");
                self.running = Some(running);
                write_config_to_database(
                    self.args.database.as_ref(),
                    self.args.local_config.database_timeout(),
                    &cc,
                    cancel,
                )
                .await;
            }
            Err(e) => {
                let retriable = e
                    .downcast_ref::<ManagedError>()
                    .is_some_and(ManagedError::is_retriable);
                if retriable && !cancel.is_cancelled() {
                    let delay = self.backoff.next_delay();
                    warn!(
                        error = %format!("{e:#}"),
                        %config_digest,
                        delay_ms = delay.as_millis() as u64,
                        "ManagedOracle: failed to start config, will retry"
                    );
                    self.retry = Some(PendingRetry {
                        contract_config: cc,
                        at: Instant::now() + delay,
                    });
                } else {
                    error!(
                        error = %format!("{e:#}"),
                        %config_digest,
                        "ManagedOracle: failed to start config"
                    );
                }
            }
        }
    }

    async fn start_config(
        &self,
        cc: &ContractConfig,
        cancel: &CancellationToken,
    ) -> anyhow::Result<RunningConfig> {
        let args = &self.args;

        let transmit_account = args
            .contract_transmitter
            .from_account()
            .map_err(ManagedError::from)
            .context("fetching transmit account")?;
        let identity = LocalIdentity {
            offchain_public_key: args.offchain_keyring.offchain_public_key(),
            onchain_public_key: args.onchain_keyring.public_key(),
            peer_id: args.network_endpoint_factory.peer_id(),
            transmit_account,
        };
        let (shared, oracle_id) = SharedConfig::from_contract_config(
            cc,
            args.offchain_config_decoder.as_ref(),
            &args.local_config,
            &identity,
        )
        .map_err(ManagedError::from)
        .context("validating contract config")?;
        let shared = Arc::new(shared);

        let plugin_config = ReportingPluginConfig {
            config_digest: shared.config_digest,
            oracle_id,
            n: shared.n(),
            f: shared.f,
            onchain_config: shared.onchain_config.clone(),
            offchain_config: shared.reporting_plugin_config.clone(),
            estimated_round_interval: shared.estimated_round_interval(),
            max_duration_query: shared.max_duration_query,
            max_duration_observation: shared.max_duration_observation,
            max_duration_report: shared.max_duration_report,
            max_duration_should_accept_finalized_report: shared
                .max_duration_should_accept_finalized_report,
            max_duration_should_transmit_accepted_report: shared
                .max_duration_should_transmit_accepted_report,
        };
        let initialization_timeout = args.local_config.default_max_duration_initialization();
        let (plugin, info) = with_timeout(
            "ReportingPluginFactory::new_reporting_plugin",
            initialization_timeout,
            cancel,
            args.reporting_plugin_factory.new_reporting_plugin(plugin_config),
        )
        .await
        .map_err(ManagedError::from)
        .and_then(|created| created.map_err(ManagedError::from))
        .context("creating reporting plugin")?;

        info!(
            plugin = %info.name,
            unique_reports = info.unique_reports,
            max_query_length = info.limits.max_query_length,
            max_observation_length = info.limits.max_observation_length,
            max_report_length = info.limits.max_report_length,
            "Created reporting plugin"
        );

        let started = async {
            with_timeout(
                "ReportingPlugin::start",
                initialization_timeout,
                cancel,
                plugin.start(),
            )
            .await
            .map_err(ManagedError::from)
            .and_then(|started| started.map_err(ManagedError::from))
            .context("starting reporting plugin")?;
            validate_plugin_limits(&info.limits).context("checking reporting plugin limits")?;
            Ok::<_, anyhow::Error>(())
        }
        .await;
        if let Err(e) = started {
            close_plugin(plugin.as_ref()).await;
            return Err(e);
        }

        let limits = network_limits(
            &shared,
            &info.limits,
            args.onchain_keyring.max_signature_length(),
        );
        let peer_ids: Vec<_> = shared
            .oracle_identities
            .iter()
            .map(|identity| identity.peer_id.clone())
            .collect();
        let binary_endpoint = match args
            .network_endpoint_factory
            .new_endpoint(shared.config_digest, &peer_ids, shared.f, limits)
            .map_err(ManagedError::from)
            .context("creating network endpoint")
        {
            Ok(endpoint) => endpoint,
            Err(e) => {
                close_plugin(plugin.as_ref()).await;
                return Err(e);
            }
        };
        let endpoint = Arc::new(SerializingEndpoint::new(
            binary_endpoint,
            limits.max_message_length,
        ));
        let inbound = match endpoint
            .start()
            .await
            .map_err(ManagedError::from)
            .context("starting network endpoint")
        {
            Ok(inbound) => inbound,
            Err(e) => {
                close_endpoint(&endpoint).await;
                close_plugin(plugin.as_ref()).await;
                return Err(e);
            }
        };

        let ctx = PhaseContext {
            config: Arc::clone(&shared),
            oracle_id,
            report_quorum: report_quorum(shared.n(), shared.f, info.unique_reports),
            local_config: args.local_config.clone(),
            plugin: Arc::clone(&plugin),
            offchain_keyring: Arc::clone(&args.offchain_keyring),
            onchain_keyring: Arc::clone(&args.onchain_keyring),
            database: Arc::clone(&args.database),
            network: Arc::clone(&endpoint),
            telemetry: self.telemetry.clone(),
        };
        debug!(
            report_quorum = ctx.report_quorum,
            max_message_length = limits.max_message_length,
            "Starting oracle"
        );

        let child_cancel = cancel.child_token();
        let oracle = Oracle::new(
            ctx,
            Arc::clone(&args.protocol_phases),
            Arc::clone(&args.contract_transmitter),
        );
        let handle = tokio::spawn(oracle.run(inbound, child_cancel.clone()));

        Ok(RunningConfig {
            config_digest: shared.config_digest,
            cancel: child_cancel,
            oracle: handle,
            endpoint,
            plugin,
        })
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
