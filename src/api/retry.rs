//! Retry policy with exponential backoff.
//!
//! A request moves through `Idle → Attempting → BackingOff → … → Succeeded |
//! Failed`. [`RetryPolicy::after_attempt`] is the transition function and
//! [`RetryPolicy::run`] drives it, delegating waits to a [`Sleeper`] so the
//! loop can be exercised without a network or a real clock.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{DogeError, Result};


/// Blocks the current thread between attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Real-time sleeper used outside of tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<S: Sleeper + ?Sized> Sleeper for Arc<S> {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Idle,
    Attempting { attempt: u32 },
    BackingOff { attempt: u32, delay: Duration },
    Succeeded { attempts: u32 },
    Failed { attempts: u32 },
}

/// Longest `Retry-After` honored unless configured otherwise.
pub const DEFAULT_RETRY_AFTER_MAX: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Never below 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Cap on the computed backoff.
    pub max_delay: Duration,
    /// Cap on a server-requested wait. Independent of `max_delay`.
    pub retry_after_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500), Duration::from_secs(30))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            retry_after_max: DEFAULT_RETRY_AFTER_MAX,
        }
    }

    pub fn with_retry_after_max(mut self, retry_after_max: Duration) -> Self {
        self.retry_after_max = retry_after_max;
        self
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_retries, config.backoff_base, config.backoff_max)
            .with_retry_after_max(config.retry_after_max)
    }

    /// Wait after failed attempt `attempt` (1-based): the base delay doubled
    /// for every earlier failure, capped at `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Wait before retrying `error`: the server's `Retry-After` (up to
    /// `retry_after_max`) when it sent one, the exponential backoff otherwise.
    pub fn delay_for(&self, attempt: u32, error: &DogeError) -> Duration {
        match error {
            DogeError::Request(err) => match err.retry_after {
                Some(wait) => wait.min(self.retry_after_max),
                None => self.backoff(attempt),
            },
            _ => self.backoff(attempt),
        }
    }

    /// Transition out of `Attempting { attempt }` given the attempt's error
    /// (`None` on success).
    pub fn after_attempt(&self, attempt: u32, error: Option<&DogeError>) -> RetryState {
        match error {
            None => RetryState::Succeeded { attempts: attempt },
            Some(err) if err.is_retryable() && attempt < self.max_attempts => {
                RetryState::BackingOff {
                    attempt,
                    delay: self.delay_for(attempt, err),
                }
            }
            Some(_) => RetryState::Failed { attempts: attempt },
        }
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is spent. The closure receives the 1-based
    /// attempt number. On exhaustion the last error is returned unchanged.
    pub fn run<T, F, S>(&self, sleeper: &S, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Result<T>,
        S: Sleeper + ?Sized,
    {
        let mut state = RetryState::Idle;

        loop {
            state = match state {
                RetryState::Idle => RetryState::Attempting { attempt: 1 },
                RetryState::Attempting { attempt } => {
                    debug!(attempt, max_attempts = self.max_attempts, "sending request");
                    let result = operation(attempt);

                    match self.after_attempt(attempt, result.as_ref().err()) {
                        RetryState::BackingOff { attempt, delay } => {
                            if let Err(err) = &result {
                                warn!(
                                    attempt,
                                    max_attempts = self.max_attempts,
                                    wait_ms = delay.as_millis() as u64,
                                    error = %err,
                                    "attempt {}/{} failed, retrying in {:?}",
                                    attempt,
                                    self.max_attempts,
                                    delay
                                );
                            }
                            RetryState::BackingOff { attempt, delay }
                        }
                        RetryState::Succeeded { attempts } => {
                            if attempts > 1 {
                                debug!(attempts, "request succeeded after retrying");
                            }
                            return result;
                        }
                        _ => {
                            if let Err(err) = &result {
                                if err.is_retryable() {
                                    warn!(
                                        attempts = attempt,
                                        error = %err,
                                        "giving up after {} attempt(s)",
                                        attempt
                                    );
                                } else {
                                    debug!(attempt, error = %err, "not retrying");
                                }
                            }
                            return result;
                        }
                    }
                }
                RetryState::BackingOff { attempt, delay } => {
                    sleeper.sleep(delay);
                    RetryState::Attempting {
                        attempt: attempt + 1,
                    }
                }
                RetryState::Succeeded { .. } | RetryState::Failed { .. } => {
                    unreachable!("terminal states return from the attempting branch")
                }
            };
        }
    }
}
