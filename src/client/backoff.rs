//! Reconnect backoff
//!
//! Capped exponential backoff with random jitter. The jitter only ever
//! shortens a delay, so `max_delay` is a hard ceiling.

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnect attempt
    pub initial_delay: Duration,
    /// Upper bound for any delay
    pub max_delay: Duration,
    /// Growth factor between attempts
    pub multiplier: f64,
    /// Fraction of the delay that may be randomly shaved off (0.0 to 1.0)
    pub jitter: f64,
    /// Upper bound for opening the socket and sending the auth frame
    pub connect_timeout: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.2,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    attempt: u32,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Consecutive failed attempts since the last reset
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay for the current attempt before jitter.
    pub fn base_delay(&self) -> Duration {
        let initial = self.policy.initial_delay.as_secs_f64();
        let max = self.policy.max_delay.as_secs_f64();
        let exponent = i32::try_from(self.attempt).unwrap_or(i32::MAX);
        let delay = initial * self.policy.multiplier.max(1.0).powi(exponent);
        Duration::from_secs_f64(delay.min(max))
    }

    /// Delay to wait before the next attempt; advances the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.base_delay();
        self.attempt = self.attempt.saturating_add(1);

        let jitter = self.policy.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 {
            return base;
        }
        let shave = rand::rng().random_range(0.0..=jitter);
        base.mul_f64(1.0 - shave)
    }

    /// Call after a successful handshake.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
