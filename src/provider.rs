//! Capability provider contract
//!
//! A provider is the single polymorphic unit of work in this core: generate
//! text, transcribe audio, synthesize speech, analyze an image, or run a
//! vector retrieval. Concrete backends (REST clients, local libraries,
//! subprocesses) implement [`CapabilityProvider`] for exactly one
//! [`Capability`] and are registered into the router at startup; no dynamic
//! dispatch exists beyond this one interface boundary.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{
    Capability, GenerationRequest, GenerationResponse, RetrievalSnippet, SttRequest, SttResponse,
    TtsRequest, TtsResponse, VisionRequest, VisionResponse,
};

/// Capability-specific input, tagged by the capability it belongs to.
#[derive(Debug, Clone)]
pub enum ProviderInput {
    Generate(GenerationRequest),
    Transcribe(SttRequest),
    Synthesize(TtsRequest),
    AnalyzeImage(VisionRequest),
    Retrieve(RetrievalQuery),
}

impl ProviderInput {
    /// The capability this input is addressed to.
    pub const fn capability(&self) -> Capability {
        match self {
            Self::Generate(_) => Capability::TextGeneration,
            Self::Transcribe(_) => Capability::SpeechToText,
            Self::Synthesize(_) => Capability::TextToSpeech,
            Self::AnalyzeImage(_) => Capability::ImageAnalysis,
            Self::Retrieve(_) => Capability::Retrieval,
        }
    }
}

/// Capability-specific output.
#[derive(Debug, Clone)]
pub enum ProviderOutput {
    Generated(GenerationResponse),
    Transcript(SttResponse),
    Audio(TtsResponse),
    ImageAnalysis(VisionResponse),
    Snippets(Vec<RetrievalSnippet>),
}

impl ProviderOutput {
    /// The capability that produced this output.
    pub const fn capability(&self) -> Capability {
        match self {
            Self::Generated(_) => Capability::TextGeneration,
            Self::Transcript(_) => Capability::SpeechToText,
            Self::Audio(_) => Capability::TextToSpeech,
            Self::ImageAnalysis(_) => Capability::ImageAnalysis,
            Self::Snippets(_) => Capability::Retrieval,
        }
    }
}

/// Query handed to an external vector-retrieval backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalQuery {
    pub query: String,
    pub top_k: usize,
}

/// A concrete backend implementation for exactly one capability.
///
/// Implementations must be safely callable from concurrent requests: no
/// shared mutable state beyond read-only configuration. Failure is signalled
/// through [`ProviderError`], whose [`ErrorClass`](crate::error::ErrorClass)
/// decides retry eligibility; timeouts are enforced by the retry executor,
/// not by the provider.
#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    /// The single capability this provider serves.
    fn capability(&self) -> Capability;

    /// Perform one unit of work.
    ///
    /// An input for a different capability than [`Self::capability`] is a
    /// contract violation and should return
    /// [`ProviderError::UnsupportedOperation`].
    async fn invoke(&self, input: ProviderInput) -> Result<ProviderOutput, ProviderError>;
}
