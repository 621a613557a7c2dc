//! Speech and vision capabilities through the orchestrator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use mediscope_core::error::{ProviderError, RouteError};
use mediscope_core::orchestrator::ChatOrchestrator;
use mediscope_core::provider::{CapabilityProvider, ProviderInput, ProviderOutput};
use mediscope_core::retrieval::{ContextBuilder, KeywordIndex};
use mediscope_core::router::{ProviderRouter, ProviderRouterBuilder, RouteOptions};
use mediscope_core::types::{
    Capability, GenerationResponse, ProviderBackend, SttRequest, SttResponse, TtsRequest,
    TtsResponse, VisionRequest, VisionResponse,
};

struct SttBackend;

#[async_trait]
impl CapabilityProvider for SttBackend {
    fn capability(&self) -> Capability {
        Capability::SpeechToText
    }

    async fn invoke(&self, input: ProviderInput) -> Result<ProviderOutput, ProviderError> {
        match input {
            ProviderInput::Transcribe(request) if request.audio.is_empty() => {
                Err(ProviderError::InvalidInput("empty audio".into()))
            }
            ProviderInput::Transcribe(_) => Ok(ProviderOutput::Transcript(SttResponse {
                text: "I have had a cough for two weeks".into(),
            })),
            _ => Err(ProviderError::UnsupportedOperation("not speech".into())),
        }
    }
}

struct TtsBackend;

#[async_trait]
impl CapabilityProvider for TtsBackend {
    fn capability(&self) -> Capability {
        Capability::TextToSpeech
    }

    async fn invoke(&self, input: ProviderInput) -> Result<ProviderOutput, ProviderError> {
        match input {
            ProviderInput::Synthesize(request) => Ok(ProviderOutput::Audio(TtsResponse {
                audio: request.text.into_bytes(),
                media_type: "audio/mpeg".into(),
            })),
            _ => Err(ProviderError::UnsupportedOperation("not synthesis".into())),
        }
    }
}

struct VisionBackend;

#[async_trait]
impl CapabilityProvider for VisionBackend {
    fn capability(&self) -> Capability {
        Capability::ImageAnalysis
    }

    async fn invoke(&self, input: ProviderInput) -> Result<ProviderOutput, ProviderError> {
        match input {
            ProviderInput::AnalyzeImage(request) => {
                Ok(ProviderOutput::ImageAnalysis(VisionResponse {
                    ocr_text: "Amoxicillin 500mg, twice daily".into(),
                    answer: request.question.map(|q| format!("Regarding '{q}': looks typical.")),
                }))
            }
            _ => Err(ProviderError::UnsupportedOperation("not vision".into())),
        }
    }
}

fn media_backend(capability: Capability, name: &str) -> ProviderBackend {
    ProviderBackend::new(capability, name, 1)
        .with_max_attempts(2)
        .with_timeout(Duration::from_secs(1))
}

fn orchestrator(register: impl FnOnce(ProviderRouterBuilder) -> ProviderRouterBuilder) -> ChatOrchestrator {
    let router = Arc::new(register(ProviderRouter::builder()).build().unwrap());
    ChatOrchestrator::new(
        Arc::clone(&router),
        ContextBuilder::new(Arc::new(KeywordIndex::new())),
    )
}

#[tokio::test]
async fn transcription_routes_through_the_speech_capability() {
    let orchestrator = orchestrator(|builder| {
        builder.register(
            media_backend(Capability::SpeechToText, "whisper"),
            Arc::new(SttBackend),
        )
    });
    let response = orchestrator
        .transcribe(
            SttRequest::new(vec![1, 2, 3]).with_media_type("audio/wav"),
            &RouteOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(response.text, "I have had a cough for two weeks");
}

#[tokio::test]
async fn invalid_audio_surfaces_as_permanent_failure() {
    let orchestrator = orchestrator(|builder| {
        builder.register(
            media_backend(Capability::SpeechToText, "whisper"),
            Arc::new(SttBackend),
        )
    });
    let error = orchestrator
        .transcribe(SttRequest::new(Vec::new()), &RouteOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(error, RouteError::AllBackendsFailed { .. }));
}

#[tokio::test]
async fn synthesis_returns_audio_with_media_type() {
    let orchestrator = orchestrator(|builder| {
        builder.register(
            media_backend(Capability::TextToSpeech, "tts"),
            Arc::new(TtsBackend),
        )
    });
    let response = orchestrator
        .synthesize(
            TtsRequest::new("Drink plenty of fluids.").with_voice("calm"),
            &RouteOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(response.media_type, "audio/mpeg");
    assert!(!response.audio.is_empty());
}

#[tokio::test]
async fn vision_answers_questions_about_images() {
    let orchestrator = orchestrator(|builder| {
        builder.register(
            media_backend(Capability::ImageAnalysis, "vision"),
            Arc::new(VisionBackend),
        )
    });
    let response = orchestrator
        .analyze_image(
            VisionRequest::new(vec![0xFF, 0xD8]).with_question("what is this prescription?"),
            &RouteOptions::new(),
        )
        .await
        .unwrap();
    assert!(response.ocr_text.contains("Amoxicillin"));
    assert!(response.answer.unwrap().contains("prescription"));
}

/// Declares speech-to-text but replies with a generation payload.
struct LyingSttBackend;

#[async_trait]
impl CapabilityProvider for LyingSttBackend {
    fn capability(&self) -> Capability {
        Capability::SpeechToText
    }

    async fn invoke(&self, _: ProviderInput) -> Result<ProviderOutput, ProviderError> {
        Ok(ProviderOutput::Generated(GenerationResponse {
            message: "not a transcript".into(),
        }))
    }
}

#[tokio::test]
async fn wrong_shaped_output_is_recorded_against_the_backend() {
    let orchestrator = orchestrator(|builder| {
        builder.register(
            media_backend(Capability::SpeechToText, "broken"),
            Arc::new(LyingSttBackend),
        )
    });
    let error = orchestrator
        .transcribe(SttRequest::new(vec![1, 2, 3]), &RouteOptions::new())
        .await
        .unwrap_err();
    // The violation is attributed to the offending backend; the failure
    // list is never empty.
    match error {
        RouteError::AllBackendsFailed { failures, .. } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].backend, "broken");
        }
        other => panic!("expected AllBackendsFailed, got {other}"),
    }
}

#[tokio::test]
async fn unconfigured_media_capability_reports_feature_disabled() {
    let orchestrator = orchestrator(|builder| builder);
    let error = orchestrator
        .transcribe(SttRequest::new(vec![1]), &RouteOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        RouteError::NoProviderConfigured(Capability::SpeechToText)
    ));
}
