//! Configuration types
//!
//! Load-and-freeze settings for the orchestration core. The host process
//! owns *where* configuration comes from (environment, files); this module
//! owns its shape and validation. Everything here is immutable for the
//! process lifetime once validated; there is no hot-reload contract.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::retry::RetryPolicy;
use crate::retrieval::DEFAULT_TOP_K;
use crate::safety::SafetyPhraseTable;
use crate::types::{Capability, ProviderBackend};

/// Retry parameters shared by every backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            base_delay_ms: 500,
            max_delay_ms: 15_000,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new()
            .with_base_delay(Duration::from_millis(self.base_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
    }
}

/// One backend entry as it appears in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    pub capability: Capability,
    pub name: String,
    pub priority: u32,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl BackendSettings {
    pub fn to_backend(&self) -> ProviderBackend {
        ProviderBackend::new(self.capability, self.name.clone(), self.priority)
            .with_max_attempts(self.max_attempts)
            .with_timeout(Duration::from_millis(self.timeout_ms))
    }
}

/// One seed document for the keyword index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub source_id: String,
    pub text: String,
}

/// Top-level configuration for the orchestration core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub retry: RetrySettings,
    pub backends: Vec<BackendSettings>,
    /// Override for the built-in red-flag phrase tables.
    pub safety: Option<SafetyPhraseTable>,
    /// Documents seeded into the keyword index at startup.
    pub knowledge: Vec<KnowledgeDocument>,
    /// Default snippet count per retrieval.
    pub top_k: Option<usize>,
}

impl OrchestratorConfig {
    /// Parse from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| ConfigError::InvalidValue(format!("malformed configuration: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants. Also enforced again by the router
    /// builder, so hand-constructed configs cannot bypass it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.base_delay_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "retry.base_delay_ms must be at least 1".into(),
            ));
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(ConfigError::InvalidValue(
                "retry.max_delay_ms must be >= retry.base_delay_ms".into(),
            ));
        }

        let mut seen: Vec<(Capability, u32)> = Vec::new();
        for backend in &self.backends {
            if backend.max_attempts == 0 {
                return Err(ConfigError::InvalidValue(format!(
                    "backend '{}' has max_attempts = 0",
                    backend.name
                )));
            }
            if backend.timeout_ms == 0 {
                return Err(ConfigError::InvalidValue(format!(
                    "backend '{}' has timeout_ms = 0",
                    backend.name
                )));
            }
            let slot = (backend.capability, backend.priority);
            if seen.contains(&slot) {
                return Err(ConfigError::DuplicatePriority {
                    capability: backend.capability,
                    priority: backend.priority,
                });
            }
            seen.push(slot);
        }
        Ok(())
    }

    /// Backend entries for one capability, in ascending priority order.
    pub fn backends_for(&self, capability: Capability) -> Vec<ProviderBackend> {
        let mut backends: Vec<ProviderBackend> = self
            .backends
            .iter()
            .filter(|entry| entry.capability == capability)
            .map(BackendSettings::to_backend)
            .collect();
        backends.sort_by_key(|backend| backend.priority);
        backends
    }

    pub fn top_k(&self) -> usize {
        self.top_k.unwrap_or(DEFAULT_TOP_K)
    }
}
