//! Per-round transmission schedule.
//!
//! Every oracle derives the same schedule independently, so the layout below
//! must stay bit-exact across nodes:
//!
//! 1. `seed = keccak256(order_key ‖ config_digest ‖ le64(epoch) ‖ le64(round))`
//! 2. `ChaCha20Rng::from_seed(seed)` drives a Fisher-Yates shuffle of
//!    `0..n`, walking from the last index down, each swap index drawn
//!    uniformly from `next_u64` by rejection sampling.
//! 3. The shuffled order is cut into consecutive stages of sizes `s`; the
//!    oracles of stage `i` transmit after `i * delta_stage`.
//!
//! Oracles past `sum(s)` do not transmit in that round.
//!
//! The full 32-byte seed keys the ChaCha20 stream. The seed layout and the
//! shuffle are specific to this crate, so the schedule is not wire-compatible
//! with other OCR2 node implementations sharing a configuration.

use ocrnode_crypto::keccak256_concat;
use ocrnode_types::{ConfigDigest, OracleId};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::time::Duration;

/// Seed of the transmission order of one round.
pub fn transmission_seed(
    order_key: &[u8; 16],
    config_digest: &ConfigDigest,
    epoch: u32,
    round: u8,
) -> [u8; 32] {
    keccak256_concat(&[
        order_key,
        config_digest.as_bytes(),
        &u64::from(epoch).to_le_bytes(),
        &u64::from(round).to_le_bytes(),
    ])
}

/// Pseudorandom order of the oracle indices `0..n`: `order[position] = oracle`.
pub fn transmission_order(n: usize, seed: [u8; 32]) -> Vec<usize> {
    let mut rng = ChaCha20Rng::from_seed(seed);
    let mut order: Vec<usize> = (0..n).collect();
    for i in (1..n).rev() {
        let j = uniform_below(&mut rng, i as u64 + 1) as usize;
        order.swap(i, j);
    }
    order
}

fn uniform_below(rng: &mut ChaCha20Rng, bound: u64) -> u64 {
    // largest multiple of bound not above u64::MAX
    let limit = u64::MAX - u64::MAX % bound;
    loop {
        let x = rng.next_u64();
        if x < limit {
            return x % bound;
        }
    }
}

/// Inverse of `order`: `positions[oracle] = position`.
pub fn positions(order: &[usize]) -> Vec<usize> {
    let mut positions = vec![0; order.len()];
    for (position, &oracle) in order.iter().enumerate() {
        positions[oracle] = position;
    }
    positions
}

/// Delay of the oracle at `position` given stage sizes `s`, or `None` if it
/// is not assigned to any stage.
pub fn stage_delay(position: usize, s: &[usize], delta_stage: Duration) -> Option<Duration> {
    let mut sum = 0usize;
    for (stage, &size) in s.iter().enumerate() {
        sum = sum.saturating_add(size);
        if position < sum {
            return Some(delta_stage.saturating_mul(stage as u32));
        }
    }
    None
}

/// Inputs that determine every oracle's delay for a round.
#[derive(Debug, Clone, Copy)]
pub struct DelaySchedule<'a> {
    /// Shared transmission order key of the configuration
    pub order_key: &'a [u8; 16],
    /// Digest of the configuration
    pub config_digest: &'a ConfigDigest,
    /// Number of oracles
    pub n: usize,
    /// Stage sizes
    pub s: &'a [usize],
    /// Delay between consecutive stages
    pub delta_stage: Duration,
}

impl DelaySchedule<'_> {
    /// Delay of every oracle in the round, indexed by oracle id.
    pub fn transmit_delays(&self, epoch: u32, round: u8) -> Vec<Option<Duration>> {
        let seed = transmission_seed(self.order_key, self.config_digest, epoch, round);
        positions(&transmission_order(self.n, seed))
            .into_iter()
            .map(|position| stage_delay(position, self.s, self.delta_stage))
            .collect()
    }

    /// Delay of `oracle_id` in the round; `None` if it should not transmit.
    pub fn transmit_delay(&self, epoch: u32, round: u8, oracle_id: OracleId) -> Option<Duration> {
        self.transmit_delays(epoch, round)
            .get(oracle_id.index())
            .copied()
            .flatten()
    }
}
