//! Bounded exponential backoff for calls to external collaborators
//!
//! Only errors that report themselves as transient (see
//! [`WordflowError::is_transient`]) are retried. Everything else fails on the
//! first attempt.

use crate::error::{Result, WordflowError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry configuration with exponential backoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    #[serde(default = "default_initial_delay", with = "humantime_serde")]
    pub initial_delay: Duration,

    #[serde(default = "default_max_delay", with = "humantime_serde")]
    pub max_delay: Duration,

    /// Growth factor applied per retry
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    #[serde(default)]
    pub jitter: bool,

    /// Total jitter spread as a fraction of the delay (0.0 to 1.0), centred on it
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

fn default_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_jitter_factor() -> f64 {
    0.25
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            multiplier: default_multiplier(),
            jitter: false,
            jitter_factor: default_jitter_factor(),
        }
    }
}

/// Partial policy used to override the global one for a single step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetryOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    #[serde(
        default,
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub initial_delay: Option<Duration>,
    #[serde(
        default,
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_delay: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jitter: Option<bool>,
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            attempts: 1,
            ..Self::default()
        }
    }

    /// Apply a per-step override on top of this policy
    pub fn merged(&self, overrides: Option<&RetryOverride>) -> Self {
        let Some(o) = overrides else {
            return self.clone();
        };
        Self {
            attempts: o.attempts.unwrap_or(self.attempts),
            initial_delay: o.initial_delay.unwrap_or(self.initial_delay),
            max_delay: o.max_delay.unwrap_or(self.max_delay),
            multiplier: o.multiplier.unwrap_or(self.multiplier),
            jitter: o.jitter.unwrap_or(self.jitter),
            jitter_factor: self.jitter_factor,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.attempts == 0 {
            return Err(WordflowError::config("retry attempts must be at least 1"));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(WordflowError::config(
                "retry multiplier must be a finite number >= 1.0",
            ));
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(WordflowError::config(
                "retry jitter_factor must be between 0.0 and 1.0",
            ));
        }
        if self.initial_delay > self.max_delay {
            return Err(WordflowError::config(
                "retry initial_delay must not exceed max_delay",
            ));
        }
        Ok(())
    }

    /// Delay before retry number `retry` (1-based), before jitter
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if !self.jitter {
            return delay;
        }
        let spread = delay.as_secs_f64() * self.jitter_factor;
        let offset = rand::rng().random_range(-spread / 2.0..=spread / 2.0);
        Duration::from_secs_f64((delay.as_secs_f64() + offset).max(0.0))
    }
}

/// Final result of a retried operation
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T>,
    pub attempts: u32,
}

/// Run `operation` until it succeeds, fails permanently or runs out of attempts
pub async fn retry<F, Fut, T>(
    policy: &RetryPolicy,
    context: &str,
    mut operation: F,
) -> RetryOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", context, attempt);
                }
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt,
                };
            }
            Err(err) if err.is_transient() && attempt < max_attempts => {
                let delay = policy.jittered(policy.delay_for(attempt));
                warn!(
                    "Retrying {} (attempt {}/{}) after {:?}: {}",
                    context, attempt, max_attempts, delay, err
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                return RetryOutcome {
                    result: Err(err),
                    attempts: attempt,
                };
            }
        }
    }
}
