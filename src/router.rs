//! Provider Router
//!
//! A configuration-driven registry that maps each [`Capability`] to an
//! ordered list of backends and routes every call through the retry
//! executor, falling back down the priority list until one backend succeeds
//! or all are exhausted.
//!
//! The routing table is built once at startup and read-only afterwards, so
//! it is shared freely across concurrent requests behind an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::error::{BackendFailure, ConfigError, ProviderError, RetryError, RouteError};
use crate::observability::{Metrics, ObservabilitySink, TracingSink};
use crate::provider::{CapabilityProvider, ProviderInput, ProviderOutput};
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::types::{Capability, ProviderBackend};

/// One registered slot: static configuration plus the implementation.
struct BackendSlot {
    backend: ProviderBackend,
    provider: Arc<dyn CapabilityProvider>,
}

/// Per-call routing options.
///
/// `deadline` bounds the whole fallback chain: once it passes, remaining
/// backends are not tried even if their own attempts had time left.
#[derive(Debug, Clone, Default)]
pub struct RouteOptions {
    pub cancel: CancellationToken,
    pub deadline: Option<Instant>,
}

impl RouteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub const fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Builder for [`ProviderRouter`]; validates the backend table before use.
pub struct ProviderRouterBuilder {
    policy: RetryPolicy,
    sink: Arc<dyn ObservabilitySink>,
    metrics: Arc<Metrics>,
    slots: HashMap<Capability, Vec<BackendSlot>>,
}

impl Default for ProviderRouterBuilder {
    fn default() -> Self {
        Self {
            policy: RetryPolicy::default(),
            sink: Arc::new(TracingSink),
            metrics: Arc::new(Metrics::new()),
            slots: HashMap::new(),
        }
    }
}

impl ProviderRouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shared backoff policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the default tracing sink.
    pub fn with_sink(mut self, sink: Arc<dyn ObservabilitySink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Register a backend implementation under its configured slot.
    pub fn register(
        mut self,
        backend: ProviderBackend,
        provider: Arc<dyn CapabilityProvider>,
    ) -> Self {
        self.slots
            .entry(backend.capability)
            .or_default()
            .push(BackendSlot { backend, provider });
        self
    }

    /// Validate and freeze the routing table.
    ///
    /// Rejects duplicate `(capability, priority)` pairs and providers
    /// registered under a capability they do not declare.
    pub fn build(mut self) -> Result<ProviderRouter, ConfigError> {
        for (capability, slots) in &mut self.slots {
            for slot in slots.iter() {
                if slot.provider.capability() != *capability {
                    return Err(ConfigError::CapabilityMismatch {
                        backend: slot.backend.name.clone(),
                        declared: slot.provider.capability(),
                        registered: *capability,
                    });
                }
                if slot.backend.max_attempts == 0 {
                    return Err(ConfigError::InvalidValue(format!(
                        "backend '{}' has max_attempts = 0",
                        slot.backend.name
                    )));
                }
            }
            slots.sort_by_key(|slot| slot.backend.priority);
            for pair in slots.windows(2) {
                if pair[0].backend.priority == pair[1].backend.priority {
                    return Err(ConfigError::DuplicatePriority {
                        capability: *capability,
                        priority: pair[0].backend.priority,
                    });
                }
            }
        }

        Ok(ProviderRouter {
            executor: RetryExecutor::new(self.policy, self.sink, Arc::clone(&self.metrics)),
            metrics: self.metrics,
            slots: self.slots,
        })
    }
}

/// Routes capability calls across configured backends in priority order.
pub struct ProviderRouter {
    executor: RetryExecutor,
    metrics: Arc<Metrics>,
    slots: HashMap<Capability, Vec<BackendSlot>>,
}

impl ProviderRouter {
    pub fn builder() -> ProviderRouterBuilder {
        ProviderRouterBuilder::new()
    }

    /// Whether at least one backend is configured for `capability`.
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.slots
            .get(&capability)
            .is_some_and(|slots| !slots.is_empty())
    }

    /// Backend names configured for `capability`, in priority order.
    pub fn backend_names(&self, capability: Capability) -> Vec<&str> {
        self.slots
            .get(&capability)
            .map(|slots| {
                slots
                    .iter()
                    .map(|slot| slot.backend.name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Route one call: try each configured backend in ascending priority,
    /// returning the first success.
    ///
    /// Success is binary; a higher-priority backend that failed is never
    /// revisited within the same call. `NoProviderConfigured` means the
    /// feature is disabled, not broken; callers must distinguish the two.
    pub async fn route(
        &self,
        capability: Capability,
        input: ProviderInput,
        options: &RouteOptions,
    ) -> Result<ProviderOutput, RouteError> {
        let slots = self
            .slots
            .get(&capability)
            .filter(|slots| !slots.is_empty())
            .ok_or(RouteError::NoProviderConfigured(capability))?;

        let mut failures: Vec<BackendFailure> = Vec::new();
        for slot in slots {
            if options.cancel.is_cancelled() {
                return Err(RouteError::Cancelled(capability));
            }
            if let Some(deadline) = options.deadline
                && Instant::now() >= deadline
            {
                tracing::warn!(
                    capability = %capability,
                    tried = failures.len(),
                    "overall deadline exceeded, aborting remaining fallbacks"
                );
                return Err(RouteError::DeadlineExceeded(capability));
            }

            match self
                .executor
                .execute(
                    &slot.backend,
                    slot.provider.as_ref(),
                    input.clone(),
                    &options.cancel,
                    options.deadline,
                )
                .await
            {
                Ok(output) if output.capability() == capability => return Ok(output),
                Ok(output) => {
                    // Wrong output shape for the slot's capability: a
                    // contract violation, treated as a permanent failure.
                    tracing::error!(
                        capability = %capability,
                        backend = %slot.backend.name,
                        produced = %output.capability(),
                        "backend produced output for the wrong capability"
                    );
                    failures.push(BackendFailure {
                        backend: slot.backend.name.clone(),
                        priority: slot.backend.priority,
                        error: RetryError::Permanent {
                            backend: slot.backend.name.clone(),
                            source: ProviderError::UnsupportedOperation(format!(
                                "produced {} output for a {} call",
                                output.capability(),
                                capability
                            )),
                            attempts: Vec::new(),
                        },
                    });
                }
                Err(error) => {
                    tracing::warn!(
                        capability = %capability,
                        backend = %slot.backend.name,
                        priority = slot.backend.priority,
                        error = %error,
                        "backend failed, falling back"
                    );
                    failures.push(BackendFailure {
                        backend: slot.backend.name.clone(),
                        priority: slot.backend.priority,
                        error,
                    });
                }
            }
        }

        if options.cancel.is_cancelled() {
            return Err(RouteError::Cancelled(capability));
        }
        self.metrics.record_route_exhausted();
        Err(RouteError::AllBackendsFailed {
            capability,
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::types::{GenerationRequest, GenerationResponse};
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedProvider {
        capability: Capability,
        reply: Result<String, ProviderError>,
    }

    #[async_trait]
    impl CapabilityProvider for FixedProvider {
        fn capability(&self) -> Capability {
            self.capability
        }

        async fn invoke(&self, _: ProviderInput) -> Result<ProviderOutput, ProviderError> {
            self.reply
                .clone()
                .map(|message| ProviderOutput::Generated(GenerationResponse { message }))
        }
    }

    fn text_backend(name: &str, priority: u32) -> ProviderBackend {
        ProviderBackend::new(Capability::TextGeneration, name, priority)
            .with_max_attempts(2)
            .with_timeout(Duration::from_secs(1))
    }

    #[test]
    fn duplicate_priority_is_rejected_at_build() {
        let provider = Arc::new(FixedProvider {
            capability: Capability::TextGeneration,
            reply: Ok("hi".into()),
        });
        let result = ProviderRouter::builder()
            .register(text_backend("a", 1), provider.clone())
            .register(text_backend("b", 1), provider)
            .build();
        assert!(matches!(
            result.err(),
            Some(ConfigError::DuplicatePriority { priority: 1, .. })
        ));
    }

    #[test]
    fn capability_mismatch_is_rejected_at_build() {
        let provider = Arc::new(FixedProvider {
            capability: Capability::SpeechToText,
            reply: Ok("hi".into()),
        });
        let result = ProviderRouter::builder()
            .register(text_backend("a", 1), provider)
            .build();
        assert!(matches!(
            result.err(),
            Some(ConfigError::CapabilityMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn unconfigured_capability_is_distinct_from_failure() {
        let router = ProviderRouter::builder().build().unwrap();
        let result = router
            .route(
                Capability::TextGeneration,
                ProviderInput::Generate(GenerationRequest::new("hi")),
                &RouteOptions::new(),
            )
            .await;
        assert!(matches!(
            result,
            Err(RouteError::NoProviderConfigured(Capability::TextGeneration))
        ));
    }
}
