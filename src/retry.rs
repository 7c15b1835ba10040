//! Composable bounded-retry policies.
//!
//! Two independent policies run at two layers: the document cycle retries with
//! linear backoff (`attempt * unit`), while the extraction adapter retries its
//! API calls with exponential backoff (`base ^ attempt`). Filesystem copies use
//! a third, fixed-delay policy.

use crate::layout::LayoutViolation;
use anyhow::Result;
use std::time::Duration;
use tracing::{error, warn};

#[derive(Debug, Clone, Copy)]
pub enum Backoff {
    None,
    Fixed { delay: Duration },
    Linear { unit: Duration },
    Exponential { base_secs: u64 },
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

/// Terminal state of one retried operation. `attempts` counts every attempt
/// made, including the successful or final failing one.
pub enum Attempted<T> {
    Succeeded { value: T, attempts: u32 },
    Failed { attempts: u32, error: anyhow::Error },
}

impl RetryPolicy {
    pub fn linear(max_attempts: u32, unit: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Linear { unit },
        }
    }

    pub fn exponential(max_attempts: u32, base_secs: u64) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Exponential { base_secs },
        }
    }

    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed { delay },
        }
    }

    /// Delay inserted after attempt number `attempt` (1-based) fails.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed { delay } => delay,
            Backoff::Linear { unit } => unit.saturating_mul(attempt),
            Backoff::Exponential { base_secs } => {
                Duration::from_secs(base_secs.saturating_pow(attempt.saturating_sub(1)))
            }
        }
    }

    /// Drive `op` to a terminal state. The closure receives the 1-based
    /// attempt number. Errors carrying a [`LayoutViolation`] are never
    /// retried: they indicate a planning defect, not a transient fault.
    pub fn run<T>(&self, what: &str, mut op: impl FnMut(u32) -> Result<T>) -> Attempted<T> {
        let max = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op(attempt) {
                Ok(value) => {
                    return Attempted::Succeeded {
                        value,
                        attempts: attempt,
                    };
                }
                Err(error) => {
                    if error.downcast_ref::<LayoutViolation>().is_some() {
                        error!("{what}: {error:#}; not retrying");
                        return Attempted::Failed {
                            attempts: attempt,
                            error,
                        };
                    }
                    if attempt >= max {
                        return Attempted::Failed {
                            attempts: attempt,
                            error,
                        };
                    }
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{what}: attempt {attempt}/{max} failed, retrying in {delay:?}: {error:#}"
                    );
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                }
            }
        }
    }
}

impl<T> Attempted<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            Attempted::Succeeded { attempts, .. } | Attempted::Failed { attempts, .. } => *attempts,
        }
    }
}
