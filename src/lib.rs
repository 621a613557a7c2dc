//! mediscope-core
//!
//! Provider orchestration and safety core for a medical-assistant service.
//!
//! This crate sits between a conversational endpoint and a set of
//! unreliable, swappable capability backends (text generation, retrieval,
//! speech-to-text, text-to-speech, image analysis). It selects among
//! interchangeable backends per capability, retries transient failures with
//! bounded exponential backoff, degrades gracefully instead of failing the
//! whole request, and runs a deterministic safety classifier over every
//! inbound and outbound message to detect medical red flags.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mediscope_core::prelude::*;
//!
//! let router = Arc::new(
//!     ProviderRouter::builder()
//!         .register(
//!             ProviderBackend::new(Capability::TextGeneration, "primary", 1),
//!             Arc::new(my_llm_client),
//!         )
//!         .build()?,
//! );
//! let index = Arc::new(KeywordIndex::new());
//! index.insert("hydration", "Drinking water supports kidney function.");
//!
//! let orchestrator = ChatOrchestrator::new(
//!     Arc::clone(&router),
//!     ContextBuilder::new(index).with_router(router),
//! );
//! let reply = orchestrator
//!     .chat(ChatTurnRequest::new("what helps with mild dehydration?"),
//!           &RouteOptions::new())
//!     .await?;
//! ```
#![deny(unsafe_code)]

pub mod compose;
pub mod config;
pub mod error;
pub mod observability;
pub mod orchestrator;
pub mod provider;
pub mod retrieval;
pub mod retry;
pub mod router;
pub mod safety;
pub mod types;

pub use error::{ProviderError, RouteError};

/// Common imports for host applications.
pub mod prelude {
    pub use crate::compose::ResponseComposer;
    pub use crate::config::OrchestratorConfig;
    pub use crate::error::{
        ConfigError, ErrorClass, OrchestrateError, ProviderError, RetryError, RouteError,
    };
    pub use crate::observability::{Metrics, ObservabilitySink, TracingSink};
    pub use crate::orchestrator::ChatOrchestrator;
    pub use crate::provider::{CapabilityProvider, ProviderInput, ProviderOutput, RetrievalQuery};
    pub use crate::retrieval::{ContextBuilder, KeywordIndex};
    pub use crate::retry::{RetryExecutor, RetryPolicy};
    pub use crate::router::{ProviderRouter, ProviderRouterBuilder, RouteOptions};
    pub use crate::safety::{SafetyClassifier, SafetyPhraseTable};
    pub use crate::types::{
        Capability, ChatTurnRequest, ProviderBackend, RetrievalSnippet, SafetyLevel,
        SafetyVerdict, SttRequest, SttResponse, StructuredReply, TtsRequest, TtsResponse,
        VisionRequest, VisionResponse,
    };
}
