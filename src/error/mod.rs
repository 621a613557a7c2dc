//! Error Handling Module
//!
//! This module provides the error taxonomy for the orchestration core:
//! - `ProviderError`: typed failures returned by capability providers,
//!   classified as transient (retry-eligible) or permanent
//! - `RetryError`: outcome of a single backend's retry loop
//! - `RouteError`: outcome of routing across all backends of a capability
//! - `ConfigError`: build-time configuration validation failures
//! - `OrchestrateError`: chat-pipeline failures that still carry a safe
//!   fallback reply
//!
//! # Example
//!
//! ```rust,ignore
//! use mediscope_core::error::{ProviderError, ErrorClass};
//!
//! let error = ProviderError::RateLimited("429 from upstream".into());
//! assert_eq!(error.class(), ErrorClass::Transient);
//! assert!(error.is_retryable());
//! ```

use thiserror::Error;

use crate::types::{Attempt, Capability};

/// Coarse classification of a provider failure.
///
/// The retry executor keys its abort/continue decision on this alone; the
/// raw transport error never crosses the executor boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retry-eligible: timeouts, connection errors, rate limiting, 5xx.
    Transient,
    /// Not retried: bad input, auth failure, unsupported operation.
    Permanent,
}

/// Typed error returned by a concrete capability provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The attempt exceeded the backend's per-attempt timeout.
    #[error("provider call timed out: {0}")]
    Timeout(String),

    /// Connection-level failure (DNS, refused, reset).
    #[error("connection error: {0}")]
    Connection(String),

    /// The backend asked us to slow down.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Structured API error with an upstream status code.
    #[error("API error {code}: {message}")]
    Api { code: u16, message: String },

    /// Authentication or authorization failure.
    #[error("authentication error: {0}")]
    Auth(String),

    /// The input was rejected by the backend.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The backend does not support the requested operation.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The backend is misconfigured (missing key, bad URL).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Catch-all for internal provider failures.
    #[error("internal provider error: {0}")]
    Internal(String),
}

impl ProviderError {
    /// Classify this error for retry purposes.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Timeout(_) | Self::Connection(_) | Self::RateLimited(_) => ErrorClass::Transient,
            // Upstream 5xx is transient; everything below 500 is on us.
            Self::Api { code, .. } if *code >= 500 => ErrorClass::Transient,
            Self::Api { .. }
            | Self::Auth(_)
            | Self::InvalidInput(_)
            | Self::UnsupportedOperation(_)
            | Self::Configuration(_)
            | Self::Internal(_) => ErrorClass::Permanent,
        }
    }

    /// Whether the retry executor may attempt this call again.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

/// Outcome of a single backend's retry loop.
///
/// Carries the full [`Attempt`] history for diagnostics; the router folds
/// these into [`RouteError::AllBackendsFailed`].
#[derive(Debug, Error)]
pub enum RetryError {
    /// The provider failed with a non-retryable error; no further attempts
    /// were made against this backend.
    #[error("permanent failure on backend '{backend}': {source}")]
    Permanent {
        backend: String,
        #[source]
        source: ProviderError,
        attempts: Vec<Attempt>,
    },

    /// Every allowed attempt failed with a transient error.
    #[error("backend '{backend}' exhausted after {} attempts: {last}", attempts.len())]
    Exhausted {
        backend: String,
        attempts: Vec<Attempt>,
        last: ProviderError,
    },

    /// The caller cancelled the request.
    #[error("retry cancelled on backend '{backend}'")]
    Cancelled {
        backend: String,
        attempts: Vec<Attempt>,
    },

    /// The caller-supplied overall deadline expired between attempts.
    #[error("deadline exceeded on backend '{backend}'")]
    DeadlineExceeded {
        backend: String,
        attempts: Vec<Attempt>,
    },
}

impl RetryError {
    /// Name of the backend this error belongs to.
    pub fn backend(&self) -> &str {
        match self {
            Self::Permanent { backend, .. }
            | Self::Exhausted { backend, .. }
            | Self::Cancelled { backend, .. }
            | Self::DeadlineExceeded { backend, .. } => backend,
        }
    }

    /// Attempt records accumulated before this error was produced.
    pub fn attempts(&self) -> &[Attempt] {
        match self {
            Self::Permanent { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::Cancelled { attempts, .. }
            | Self::DeadlineExceeded { attempts, .. } => attempts,
        }
    }
}

/// Per-backend failure record aggregated by the router.
#[derive(Debug)]
pub struct BackendFailure {
    /// Backend name, as registered.
    pub backend: String,
    /// Priority the backend was registered under.
    pub priority: u32,
    /// The retry-level error that took this backend out.
    pub error: RetryError,
}

/// Outcome of routing a capability call across its configured backends.
#[derive(Debug, Error)]
pub enum RouteError {
    /// No backend is configured for the capability. Distinct from failure:
    /// callers must be able to tell "feature disabled" from "feature broken".
    #[error("no provider configured for capability '{0}'")]
    NoProviderConfigured(Capability),

    /// Every configured backend failed; failures are ordered by priority.
    #[error("all {} backend(s) failed for capability '{capability}'", failures.len())]
    AllBackendsFailed {
        capability: Capability,
        failures: Vec<BackendFailure>,
    },

    /// A backend's successful reply had the wrong output shape for the
    /// capability it served.
    #[error("backend produced '{produced}' output for a '{capability}' call")]
    ContractViolation {
        capability: Capability,
        produced: Capability,
    },

    /// The caller cancelled the request before any backend succeeded.
    #[error("routing cancelled for capability '{0}'")]
    Cancelled(Capability),

    /// The overall deadline expired before any backend succeeded.
    #[error("deadline exceeded for capability '{0}'")]
    DeadlineExceeded(Capability),
}

/// Configuration validation failures, raised at build time only.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Two backends registered under the same `(capability, priority)` slot.
    #[error("duplicate priority {priority} for capability '{capability}'")]
    DuplicatePriority {
        capability: Capability,
        priority: u32,
    },

    /// A backend was registered under the wrong capability slot.
    #[error("backend '{backend}' declares capability '{declared}' but was registered for '{registered}'")]
    CapabilityMismatch {
        backend: String,
        declared: Capability,
        registered: Capability,
    },

    /// A retry or timeout parameter is out of range.
    #[error("invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Chat-pipeline error. Generation failures still carry a composed fallback
/// reply so a provider outage can never suppress a red-flag warning already
/// determined from the user's own message.
#[derive(Debug, Error)]
pub enum OrchestrateError {
    #[error("text generation failed: {source}")]
    GenerationFailed {
        #[source]
        source: RouteError,
        /// Safe reply carrying the disclaimer and any pre-scan urgent notice.
        fallback: crate::types::StructuredReply,
    },

    #[error("request cancelled")]
    Cancelled,
}
