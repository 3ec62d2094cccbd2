//! Contract transmitter that records instead of submitting.

use async_trait::async_trait;
use ocrnode_core::{ContractTransmitter, TransmitError, TransmitResult};
use ocrnode_types::{Account, AttributedOnchainSignature, ConfigDigest, ReportContext};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// One call to [`ContractTransmitter::transmit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTransmission {
    /// Context passed in
    pub report_context: ReportContext,
    /// Report bytes
    pub report: Vec<u8>,
    /// Signatures
    pub signatures: Vec<AttributedOnchainSignature>,
}

/// Records transmissions; can be told to fail them.
#[derive(Debug)]
pub struct RecordingTransmitter {
    account: Account,
    fail: AtomicBool,
    transmissions: Mutex<Vec<RecordedTransmission>>,
    transmitted: Notify,
}

impl RecordingTransmitter {
    /// Transmitter sending from `account`.
    pub fn new(account: Account) -> Self {
        Self {
            account,
            fail: AtomicBool::new(false),
            transmissions: Mutex::new(Vec::new()),
            transmitted: Notify::new(),
        }
    }

    /// Make subsequent transmissions fail (they are still recorded).
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Every transmission so far, in order.
    pub fn transmissions(&self) -> Vec<RecordedTransmission> {
        self.transmissions.lock().clone()
    }

    /// Wait for the next transmission.
    pub async fn transmitted(&self) {
        self.transmitted.notified().await;
    }
}

#[async_trait]
impl ContractTransmitter for RecordingTransmitter {
    async fn transmit(
        &self,
        report_context: ReportContext,
        report: &[u8],
        signatures: &[AttributedOnchainSignature],
    ) -> TransmitResult<()> {
        self.transmissions.lock().push(RecordedTransmission {
            report_context,
            report: report.to_vec(),
            signatures: signatures.to_vec(),
        });
        self.transmitted.notify_one();

        if self.fail.load(Ordering::SeqCst) {
            return Err(TransmitError::Rejected("configured to fail".to_string()));
        }
        Ok(())
    }

    async fn latest_config_digest_and_epoch(&self) -> TransmitResult<(ConfigDigest, u32)> {
        let last = self.transmissions.lock().last().map(|t| t.report_context);
        Ok(last.map_or((ConfigDigest::ZERO, 0), |ctx| {
            (
                ctx.report_timestamp.config_digest,
                ctx.report_timestamp.epoch,
            )
        }))
    }

    fn from_account(&self) -> TransmitResult<Account> {
        Ok(self.account.clone())
    }
}
