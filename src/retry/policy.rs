//! Retry policy and executor
//!
//! Wraps a single backend's provider call with bounded retries, exponential
//! backoff with jitter, and a per-attempt timeout. Retry is an explicit
//! loop with exit conditions on attempt count and error classification, so
//! the policy stays inspectable and testable apart from the provider call.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use rand::Rng;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::error::{ErrorClass, ProviderError, RetryError};
use crate::observability::{AttemptEvent, Metrics, ObservabilitySink};
use crate::provider::{CapabilityProvider, ProviderInput, ProviderOutput};
use crate::types::{Attempt, AttemptOutcome, ProviderBackend};

/// Backoff configuration shared by every backend.
///
/// The delay before attempt `n + 1` is
/// `min(base_delay * 2^(n-1), max_delay) + jitter(0, base_delay)`,
/// so every wait stays strictly below `max_delay * 2`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// First-retry delay and jitter bound.
    pub base_delay: Duration,
    /// Cap on the exponential component.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(15),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base delay.
    pub const fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the maximum delay.
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Backoff before the retry that follows failed attempt `attempt`
    /// (1-based).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let capped = self.exponential_delay(attempt);
        capped + self.jitter()
    }

    /// Deterministic exponential component, capped at `max_delay`.
    fn exponential_delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(32);
        let exp = self
            .base_delay
            .as_millis()
            .saturating_mul(1u128 << shift)
            .min(self.max_delay.as_millis());
        Duration::from_millis(exp as u64)
    }

    /// Uniform jitter in `[0, min(base_delay, max_delay))`.
    fn jitter(&self) -> Duration {
        let bound = self.base_delay.min(self.max_delay).as_millis() as u64;
        if bound == 0 {
            return Duration::ZERO;
        }
        let mut rng = rand::thread_rng();
        Duration::from_millis(rng.gen_range(0..bound))
    }
}

/// Executes one backend's call with bounded retries.
///
/// The only observable side effect is one structured event per attempt.
pub struct RetryExecutor {
    policy: RetryPolicy,
    sink: Arc<dyn ObservabilitySink>,
    metrics: Arc<Metrics>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy, sink: Arc<dyn ObservabilitySink>, metrics: Arc<Metrics>) -> Self {
        Self {
            policy,
            sink,
            metrics,
        }
    }

    /// Attempt `provider.invoke(input)` up to `backend.max_attempts` times.
    ///
    /// Transient failures (including per-attempt timeouts) back off and
    /// retry; permanent failures abort immediately. Cancellation is checked
    /// before each attempt and during each backoff wait. `deadline`, when
    /// given, stops the loop between attempts even if attempts remain.
    pub async fn execute(
        &self,
        backend: &ProviderBackend,
        provider: &dyn CapabilityProvider,
        input: ProviderInput,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Result<ProviderOutput, RetryError> {
        let max_attempts = backend.max_attempts.max(1);
        let mut attempts: Vec<Attempt> = Vec::with_capacity(max_attempts as usize);
        let mut last_error: Option<ProviderError> = None;

        for attempt_number in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled {
                    backend: backend.name.clone(),
                    attempts,
                });
            }
            if let Some(deadline) = deadline
                && Instant::now() >= deadline
            {
                return Err(RetryError::DeadlineExceeded {
                    backend: backend.name.clone(),
                    attempts,
                });
            }

            let started_at = SystemTime::now();
            let started = Instant::now();
            let result = tokio::select! {
                _ = cancel.cancelled() => None,
                outcome = tokio::time::timeout(backend.timeout, provider.invoke(input.clone())) => {
                    Some(outcome)
                }
            };
            let duration = started.elapsed();

            let (outcome, error) = match &result {
                None => (AttemptOutcome::Cancelled, None),
                Some(Err(_)) => (AttemptOutcome::TimedOut, Some(ProviderError::Timeout(
                    format!("attempt exceeded {:?}", backend.timeout),
                ))),
                Some(Ok(Ok(_))) => (AttemptOutcome::Success, None),
                Some(Ok(Err(err))) => {
                    let outcome = match err.class() {
                        ErrorClass::Transient => AttemptOutcome::Transient {
                            message: err.to_string(),
                        },
                        ErrorClass::Permanent => AttemptOutcome::Permanent {
                            message: err.to_string(),
                        },
                    };
                    (outcome, Some(err.clone()))
                }
            };

            self.record_attempt(backend, attempt_number, duration, &outcome);
            attempts.push(Attempt {
                backend_name: backend.name.clone(),
                attempt_number,
                started_at,
                duration,
                outcome: outcome.clone(),
            });

            match result {
                None => {
                    return Err(RetryError::Cancelled {
                        backend: backend.name.clone(),
                        attempts,
                    });
                }
                Some(Ok(Ok(output))) => return Ok(output),
                _ => {}
            }

            let error = error.unwrap_or_else(|| {
                ProviderError::Internal("attempt failed without error".to_string())
            });
            if !error.is_retryable() {
                return Err(RetryError::Permanent {
                    backend: backend.name.clone(),
                    source: error,
                    attempts,
                });
            }
            last_error = Some(error);

            // Last attempt: no wait, fall through to exhaustion.
            if attempt_number < max_attempts {
                let delay = self.policy.calculate_delay(attempt_number);
                tokio::select! {
                    _ = cancel.cancelled() => {
                        return Err(RetryError::Cancelled {
                            backend: backend.name.clone(),
                            attempts,
                        });
                    }
                    _ = sleep(delay) => {}
                }
            }
        }

        Err(RetryError::Exhausted {
            backend: backend.name.clone(),
            last: last_error.unwrap_or_else(|| {
                ProviderError::Internal("retry loop ended without error".to_string())
            }),
            attempts,
        })
    }

    fn record_attempt(
        &self,
        backend: &ProviderBackend,
        attempt_number: u32,
        duration: Duration,
        outcome: &AttemptOutcome,
    ) {
        self.metrics.record_attempt(outcome);
        self.sink.on_attempt(&AttemptEvent {
            capability: backend.capability,
            backend: backend.name.clone(),
            attempt_number,
            outcome: outcome.clone(),
            duration,
            timestamp: chrono::Utc::now(),
        });
    }
}
