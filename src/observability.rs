//! Observability Events
//!
//! Structured events for provider attempts and safety-verdict computations.
//! One [`AttemptEvent`] is emitted per provider attempt (success,
//! transient-retry, or exhaustion) and one [`SafetyEvent`] per classifier
//! run; both serialize with serde so external sinks can ship them anywhere.
//!
//! The default [`TracingSink`] forwards events as `tracing` records with
//! structured fields. [`Metrics`] keeps append-only process counters that
//! are safe under concurrent increment.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AttemptOutcome, Capability, SafetyLevel};

/// One provider attempt, as seen by the retry executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptEvent {
    pub capability: Capability,
    pub backend: String,
    /// 1-based attempt number within one executor invocation.
    pub attempt_number: u32,
    pub outcome: AttemptOutcome,
    pub duration: Duration,
    pub timestamp: DateTime<Utc>,
}

/// One safety-classifier run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyEvent {
    pub level: SafetyLevel,
    pub matched_category: Option<String>,
    /// Length of the scanned text, not the text itself.
    pub scanned_chars: usize,
    pub timestamp: DateTime<Utc>,
}

/// Receiver for structured orchestration events.
///
/// Implementations must be cheap and non-blocking; they are called inline on
/// the request path.
pub trait ObservabilitySink: Send + Sync {
    fn on_attempt(&self, event: &AttemptEvent);
    fn on_safety(&self, event: &SafetyEvent);
}

/// Default sink: forwards events to `tracing` with structured fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ObservabilitySink for TracingSink {
    fn on_attempt(&self, event: &AttemptEvent) {
        match &event.outcome {
            AttemptOutcome::Success => tracing::info!(
                capability = %event.capability,
                backend = %event.backend,
                attempt = event.attempt_number,
                duration_ms = event.duration.as_millis() as u64,
                "provider attempt succeeded"
            ),
            AttemptOutcome::Transient { message } => tracing::warn!(
                capability = %event.capability,
                backend = %event.backend,
                attempt = event.attempt_number,
                duration_ms = event.duration.as_millis() as u64,
                error = %message,
                "transient provider failure"
            ),
            AttemptOutcome::Permanent { message } => tracing::warn!(
                capability = %event.capability,
                backend = %event.backend,
                attempt = event.attempt_number,
                duration_ms = event.duration.as_millis() as u64,
                error = %message,
                "permanent provider failure"
            ),
            AttemptOutcome::TimedOut => tracing::warn!(
                capability = %event.capability,
                backend = %event.backend,
                attempt = event.attempt_number,
                duration_ms = event.duration.as_millis() as u64,
                "provider attempt timed out"
            ),
            AttemptOutcome::Cancelled => tracing::debug!(
                capability = %event.capability,
                backend = %event.backend,
                attempt = event.attempt_number,
                "provider attempt cancelled"
            ),
        }
    }

    fn on_safety(&self, event: &SafetyEvent) {
        match event.level {
            SafetyLevel::Emergency => tracing::warn!(
                level = "emergency",
                category = event.matched_category.as_deref().unwrap_or(""),
                scanned_chars = event.scanned_chars,
                "red flag detected"
            ),
            SafetyLevel::Caution => tracing::info!(
                level = "caution",
                category = event.matched_category.as_deref().unwrap_or(""),
                scanned_chars = event.scanned_chars,
                "caution-tier safety match"
            ),
            SafetyLevel::None => tracing::debug!(
                level = "none",
                scanned_chars = event.scanned_chars,
                "safety scan clear"
            ),
        }
    }
}

/// Append-only process counters, safe under concurrent increment.
#[derive(Debug, Default)]
pub struct Metrics {
    pub attempts_total: AtomicU64,
    pub attempts_failed: AtomicU64,
    pub routes_exhausted: AtomicU64,
    pub red_flags: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_attempt(&self, outcome: &AttemptOutcome) {
        self.attempts_total.fetch_add(1, Ordering::Relaxed);
        if !matches!(outcome, AttemptOutcome::Success) {
            self.attempts_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_route_exhausted(&self) {
        self.routes_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_safety(&self, level: SafetyLevel) {
        if level == SafetyLevel::Emergency {
            self.red_flags.fetch_add(1, Ordering::Relaxed);
        }
    }
}
