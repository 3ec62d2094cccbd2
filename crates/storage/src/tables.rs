//! In-memory tables shared by the database backends.

use ocrnode_types::{ConfigDigest, ContractConfig, PendingTransmission, PersistentState, ReportTimestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

/// Everything a node persists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tables {
    /// Protocol state per config digest
    pub states: HashMap<ConfigDigest, PersistentState>,
    /// Latest accepted contract config
    pub config: Option<ContractConfig>,
    /// Pending transmissions, keyed by round
    pub pending: HashMap<ReportTimestamp, PendingTransmission>,
}

impl Tables {
    /// Pending transmissions of one configuration.
    pub fn pending_with_config_digest(
        &self,
        config_digest: ConfigDigest,
    ) -> HashMap<ReportTimestamp, PendingTransmission> {
        self.pending
            .iter()
            .filter(|(ts, _)| ts.config_digest == config_digest)
            .map(|(ts, t)| (*ts, t.clone()))
            .collect()
    }

    /// Drop pending transmissions scheduled before `t`. Returns how many were removed.
    pub fn delete_pending_older_than(&mut self, t: SystemTime) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, transmission| transmission.time >= t);
        before - self.pending.len()
    }
}

/// On-disk form of [`Tables`]. JSON objects need string keys, so maps are
/// stored as entry lists.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    #[serde(default)]
    states: Vec<(ConfigDigest, PersistentState)>,
    #[serde(default)]
    config: Option<ContractConfig>,
    #[serde(default)]
    pending: Vec<(ReportTimestamp, PendingTransmission)>,
}

impl From<&Tables> for Snapshot {
    fn from(tables: &Tables) -> Self {
        Self {
            states: tables
                .states
                .iter()
                .map(|(digest, state)| (*digest, state.clone()))
                .collect(),
            config: tables.config.clone(),
            pending: tables
                .pending
                .iter()
                .map(|(ts, t)| (*ts, t.clone()))
                .collect(),
        }
    }
}

impl From<Snapshot> for Tables {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            states: snapshot.states.into_iter().collect(),
            config: snapshot.config,
            pending: snapshot.pending.into_iter().collect(),
        }
    }
}
