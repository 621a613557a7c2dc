//! Core Data Type Definitions
//!
//! This module contains the data structures shared across the orchestration
//! core, organized by functionality:
//!
//! - **root** - capability tags, backend configuration, attempt records,
//!   retrieval snippets, safety verdicts
//! - **`chat`** - chat-path request/reply types
//! - **`media`** - speech and vision request/response types
//!
//! All types here are plain data: construction is cheap, everything is
//! `Clone`, and nothing holds I/O handles.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

pub mod chat;
pub mod media;

pub use chat::*;
pub use media::*;

/// A category of external functionality a backend can provide.
///
/// Identifies which provider slot the router is invoking; every registered
/// backend serves exactly one capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    TextGeneration,
    SpeechToText,
    TextToSpeech,
    ImageAnalysis,
    Retrieval,
}

impl Capability {
    /// Stable identifier used in configuration and telemetry.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TextGeneration => "text_generation",
            Self::SpeechToText => "speech_to_text",
            Self::TextToSpeech => "text_to_speech",
            Self::ImageAnalysis => "image_analysis",
            Self::Retrieval => "retrieval",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named, ordered configuration entry for one concrete backend.
///
/// Immutable once loaded; owned by the router for the process lifetime.
/// Priorities are unique per capability and tried in ascending order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderBackend {
    /// Capability this backend serves.
    pub capability: Capability,
    /// Human-readable backend name (e.g. "openai", "whisper-local").
    pub name: String,
    /// Ascending try order; lower is tried first.
    pub priority: u32,
    /// Total attempts allowed per routed call (first try included).
    pub max_attempts: u32,
    /// Per-attempt timeout.
    pub timeout: Duration,
}

impl ProviderBackend {
    pub fn new(capability: Capability, name: impl Into<String>, priority: u32) -> Self {
        Self {
            capability,
            name: name.into(),
            priority,
            max_attempts: 3,
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the total number of attempts allowed per routed call.
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the per-attempt timeout.
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// How a single provider attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    /// Transient failure; the executor may try again.
    Transient { message: String },
    /// Permanent failure; the executor aborts immediately.
    Permanent { message: String },
    /// The attempt exceeded the backend's per-attempt timeout.
    TimedOut,
    /// The caller cancelled while the attempt was in flight.
    Cancelled,
}

/// Ephemeral record of one provider call.
///
/// Created and discarded within a single retry-executor invocation; never
/// persisted. Surfaced through [`crate::error::RetryError`] for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub backend_name: String,
    /// 1-based attempt number within one executor invocation.
    pub attempt_number: u32,
    pub started_at: SystemTime,
    pub duration: Duration,
    pub outcome: AttemptOutcome,
}

/// A retrieved text fragment used as generation context, with attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalSnippet {
    /// Identifier of the source document.
    pub source_id: String,
    pub text: String,
    /// Relevance measure: keyword-IDF weight or vector similarity.
    /// Always strictly positive for returned snippets.
    pub score: f64,
}

/// Severity of a safety scan. Ordered so that "higher severity wins" is
/// simply `max`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum SafetyLevel {
    #[default]
    None,
    Caution,
    Emergency,
}

/// Structured verdict of one safety scan. Computed fresh per scan, never
/// cached across requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub level: SafetyLevel,
    /// First matching category (e.g. "cardiac"); `None` when level is `None`.
    pub matched_category: Option<String>,
    /// All matched trigger phrases, in table order.
    pub matched_terms: Vec<String>,
}

impl SafetyVerdict {
    /// Verdict for text that matched nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Combine two independent scans, keeping the higher-severity verdict.
    ///
    /// On equal severity the first (pre-generation) verdict wins, so the
    /// category reported to the caller reflects the user's own words.
    pub fn merge(self, other: Self) -> Self {
        if other.level > self.level { other } else { self }
    }

    pub fn is_emergency(&self) -> bool {
        self.level == SafetyLevel::Emergency
    }
}
