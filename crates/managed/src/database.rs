//! Restoring the last known configuration at startup.

use crate::config_digest::PrefixCheckConfigDigester;
use ocrnode_core::Database;
use ocrnode_protocol::with_timeout;
use ocrnode_types::ContractConfig;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Read the persisted config. Returns `None` when there is none or it is
/// unreadable or fails the digest check.
pub async fn load_config_from_database(
    database: &dyn Database,
    database_timeout: Duration,
    digester: &PrefixCheckConfigDigester,
    cancel: &CancellationToken,
) -> Option<ContractConfig> {
    let cc = match with_timeout(
        "Database::read_config",
        database_timeout,
        cancel,
        database.read_config(),
    )
    .await
    {
        Ok(Ok(Some(cc))) => cc,
        Ok(Ok(None)) => {
            info!("No config found in database");
            return None;
        }
        Ok(Err(e)) => {
            error!(error = %e, "Error reading config from database");
            return None;
        }
        Err(e) => {
            error!(error = %e, "Reading config from database did not complete");
            return None;
        }
    };

    if let Err(e) = digester.check_contract_config(&cc) {
        warn!(error = %e, config_digest = %cc.config_digest, "Config from database failed the digest check, ignoring");
        return None;
    }

    Some(cc)
}

/// Persist `cc` so it can be restored after a restart. Failures are logged.
pub async fn write_config_to_database(
    database: &dyn Database,
    database_timeout: Duration,
    cc: &ContractConfig,
    cancel: &CancellationToken,
) {
    match with_timeout(
        "Database::write_config",
        database_timeout,
        cancel,
        database.write_config(cc),
    )
    .await
    {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, config_digest = %cc.config_digest, "Error writing config to database"),
        Err(e) => error!(error = %e, config_digest = %cc.config_digest, "Writing config to database did not complete"),
    }
}
