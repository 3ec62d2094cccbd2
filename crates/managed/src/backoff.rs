//! Exponential backoff with jitter for retrying a failed configuration.

use rand::Rng;
use std::time::Duration;

/// First retry delay.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on any retry delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(120);

/// Growth factor between consecutive attempts.
pub const DEFAULT_MULTIPLIER: u32 = 2;

/// Fraction by which a delay is randomly stretched.
pub const DEFAULT_JITTER_PERCENT: f64 = 0.1;

/// Exponential backoff: `initial * multiplier^attempt`, stretched by up to
/// `jitter_percent` and capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    /// Delay before the first retry
    pub initial: Duration,
    /// Cap on the delay
    pub max: Duration,
    /// Growth factor
    pub multiplier: u32,
    /// Random jitter in `0.0..=0.5`
    pub jitter_percent: f64,
    attempt: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(
            DEFAULT_INITIAL_DELAY,
            DEFAULT_MAX_DELAY,
            DEFAULT_MULTIPLIER,
            DEFAULT_JITTER_PERCENT,
        )
    }
}

impl Backoff {
    /// Create a backoff starting at attempt zero.
    pub fn new(initial: Duration, max: Duration, multiplier: u32, jitter_percent: f64) -> Self {
        Self {
            initial,
            max,
            multiplier: multiplier.max(1),
            jitter_percent: jitter_percent.clamp(0.0, 0.5),
            attempt: 0,
        }
    }

    /// Number of delays handed out since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Start over from `initial`.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Delay before the next attempt. Advances the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let raw = self.raw_delay(self.attempt);
        self.attempt = self.attempt.saturating_add(1);

        let with_jitter = if self.jitter_percent > 0.0 {
            let jitter_multiplier = 1.0 + rand::thread_rng().gen::<f64>() * self.jitter_percent;
            Duration::from_secs_f64(raw.as_secs_f64() * jitter_multiplier)
        } else {
            raw
        };

        with_jitter.min(self.max)
    }

    fn raw_delay(&self, attempt: u32) -> Duration {
        let mut delay = self.initial;
        for _ in 0..attempt {
            delay = delay.saturating_mul(self.multiplier);
            if delay >= self.max {
                return self.max;
            }
        }
        delay.min(self.max)
    }
}
