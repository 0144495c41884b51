//! Bounded retry with randomized backoff

use crate::config::CrawlerConfig;
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// How many times an entity is attempted and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub backoff_min: Duration,
    pub backoff_max: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_attempts: config.max_retries,
            backoff_min: Duration::from_secs(config.backoff_min_secs),
            backoff_max: Duration::from_secs(config.backoff_max_secs),
        }
    }

    /// Policy that retries immediately
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff_min: Duration::ZERO,
            backoff_max: Duration::ZERO,
        }
    }

    /// Draws a backoff uniformly from the configured range
    pub fn backoff(&self) -> Duration {
        if self.backoff_max <= self.backoff_min {
            return self.backoff_min;
        }
        let millis = rand::rng().random_range(
            self.backoff_min.as_millis() as u64..=self.backoff_max.as_millis() as u64,
        );
        Duration::from_millis(millis)
    }
}

/// Every attempt failed
#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// A value together with the attempt that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
}

/// Runs `op` until it succeeds or the policy's attempts are used up
///
/// `op` receives the 1-based attempt number. Failed attempts are logged and
/// followed by a randomized backoff sleep, except after the last one.
///
/// # Arguments
///
/// * `policy` - Attempt budget and backoff range
/// * `label` - Name of the work, used in log messages
/// * `op` - The fallible async operation
///
/// # Returns
///
/// * `Ok(Attempted<T>)` - The first successful value
/// * `Err(Exhausted<E>)` - The last error once every attempt failed
pub async fn attempt<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<Attempted<T>, Exhausted<E>>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut number = 1;

    loop {
        match op(number).await {
            Ok(value) => {
                return Ok(Attempted {
                    value,
                    attempts: number,
                })
            }
            Err(e) if number >= max_attempts => {
                return Err(Exhausted {
                    attempts: number,
                    last_error: e,
                })
            }
            Err(e) => {
                let backoff = policy.backoff();
                tracing::warn!(
                    "{}: attempt {}/{} failed: {}; retrying in {:?}",
                    label,
                    number,
                    max_attempts,
                    e,
                    backoff
                );
                tokio::time::sleep(backoff).await;
                number += 1;
            }
        }
    }
}
