//! Chat Orchestrator
//!
//! Wires the pipeline together: safety pre-check, context retrieval, text
//! generation through the router, safety post-check, and composition. Media
//! requests (speech, vision) are thin pass-throughs to the router under
//! their own capabilities; their textual outputs can be fed back into the
//! chat path as caller-owned context on the next turn.
//!
//! The orchestrator holds no cross-request state: every turn builds a fresh
//! [`ChatExchange`] and discards it after composition.

use std::sync::Arc;

use uuid::Uuid;

use crate::compose::ResponseComposer;
use crate::error::{OrchestrateError, RouteError};
use crate::observability::{Metrics, ObservabilitySink, SafetyEvent, TracingSink};
use crate::provider::{ProviderInput, ProviderOutput};
use crate::retrieval::{ContextBuilder, DEFAULT_TOP_K};
use crate::router::{ProviderRouter, RouteOptions};
use crate::safety::SafetyClassifier;
use crate::types::{
    Capability, ChatExchange, ChatTurnRequest, GenerationRequest, SafetyVerdict, SttRequest,
    SttResponse, StructuredReply, TtsRequest, TtsResponse, VisionRequest, VisionResponse,
};

/// Front door of the orchestration core.
pub struct ChatOrchestrator {
    router: Arc<ProviderRouter>,
    context: ContextBuilder,
    classifier: SafetyClassifier,
    composer: ResponseComposer,
    sink: Arc<dyn ObservabilitySink>,
    metrics: Arc<Metrics>,
}

impl ChatOrchestrator {
    pub fn new(router: Arc<ProviderRouter>, context: ContextBuilder) -> Self {
        Self {
            router,
            context,
            classifier: SafetyClassifier::new(),
            composer: ResponseComposer::new(),
            sink: Arc::new(TracingSink),
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Replace the built-in safety phrase tables.
    pub fn with_classifier(mut self, classifier: SafetyClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Replace the default notice texts.
    pub fn with_composer(mut self, composer: ResponseComposer) -> Self {
        self.composer = composer;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ObservabilitySink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Run one chat turn through the full pipeline.
    ///
    /// A generation outage returns [`OrchestrateError::GenerationFailed`]
    /// carrying a composed fallback reply, so the disclaimer and any
    /// red-flag warning detected from the user's own message survive the
    /// outage. Retrieval failures never fail the turn.
    pub async fn chat(
        &self,
        request: ChatTurnRequest,
        options: &RouteOptions,
    ) -> Result<StructuredReply, OrchestrateError> {
        let request_id = Uuid::new_v4();
        tracing::debug!(%request_id, "chat turn started");

        let mut exchange = ChatExchange {
            user_message: request.user_message,
            image_text: request.image_text,
            image_answer: request.image_answer,
            ..ChatExchange::default()
        };

        let pre_verdict = self.classify(&exchange.user_message);
        if pre_verdict.is_emergency() {
            tracing::warn!(
                %request_id,
                category = pre_verdict.matched_category.as_deref().unwrap_or(""),
                "red flag detected in user message"
            );
        }

        let top_k = request.top_k.unwrap_or(DEFAULT_TOP_K);
        exchange.snippets = self
            .context
            .retrieve(&exchange.user_message, top_k, options)
            .await;

        let generation = GenerationRequest {
            user_message: exchange.user_message.clone(),
            context: self.assemble_context(&exchange),
        };
        let output = match self
            .router
            .route(
                Capability::TextGeneration,
                ProviderInput::Generate(generation),
                options,
            )
            .await
        {
            Ok(output) => output,
            Err(RouteError::Cancelled(_)) => return Err(OrchestrateError::Cancelled),
            Err(source) => {
                return Err(OrchestrateError::GenerationFailed {
                    source,
                    fallback: self.composer.compose_unavailable(&pre_verdict),
                });
            }
        };
        let generated = match output {
            ProviderOutput::Generated(response) => response.message,
            other => {
                // Unreachable in practice: the router rejects mismatched
                // output shapes. The composer substitutes its apology text.
                tracing::error!(produced = %other.capability(), "unexpected generation output");
                String::new()
            }
        };

        let post_verdict = self.classify(&generated);
        exchange.generated_message = Some(generated);
        exchange.safety_verdict = pre_verdict.merge(post_verdict);

        let reply = self.composer.compose(
            exchange.generated_message.as_deref().unwrap_or_default(),
            &exchange.snippets,
            &exchange.safety_verdict,
        );
        tracing::info!(
            %request_id,
            red_flag = reply.red_flag,
            citations = reply.citations.len(),
            "chat turn completed"
        );
        Ok(reply)
    }

    /// Transcribe audio via the `SpeechToText` capability.
    pub async fn transcribe(
        &self,
        request: SttRequest,
        options: &RouteOptions,
    ) -> Result<SttResponse, RouteError> {
        let output = self
            .router
            .route(
                Capability::SpeechToText,
                ProviderInput::Transcribe(request),
                options,
            )
            .await?;
        match output {
            ProviderOutput::Transcript(response) => Ok(response),
            other => Err(RouteError::ContractViolation {
                capability: Capability::SpeechToText,
                produced: other.capability(),
            }),
        }
    }

    /// Synthesize speech via the `TextToSpeech` capability.
    pub async fn synthesize(
        &self,
        request: TtsRequest,
        options: &RouteOptions,
    ) -> Result<TtsResponse, RouteError> {
        let output = self
            .router
            .route(
                Capability::TextToSpeech,
                ProviderInput::Synthesize(request),
                options,
            )
            .await?;
        match output {
            ProviderOutput::Audio(response) => Ok(response),
            other => Err(RouteError::ContractViolation {
                capability: Capability::TextToSpeech,
                produced: other.capability(),
            }),
        }
    }

    /// Run OCR and optional question answering via the `ImageAnalysis`
    /// capability.
    pub async fn analyze_image(
        &self,
        request: VisionRequest,
        options: &RouteOptions,
    ) -> Result<VisionResponse, RouteError> {
        let output = self
            .router
            .route(
                Capability::ImageAnalysis,
                ProviderInput::AnalyzeImage(request),
                options,
            )
            .await?;
        match output {
            ProviderOutput::ImageAnalysis(response) => Ok(response),
            other => Err(RouteError::ContractViolation {
                capability: Capability::ImageAnalysis,
                produced: other.capability(),
            }),
        }
    }

    /// Classify text and emit the per-scan structured event.
    fn classify(&self, text: &str) -> SafetyVerdict {
        let verdict = self.classifier.classify(text);
        self.metrics.record_safety(verdict.level);
        self.sink.on_safety(&SafetyEvent {
            level: verdict.level,
            matched_category: verdict.matched_category.clone(),
            scanned_chars: text.chars().count(),
            timestamp: chrono::Utc::now(),
        });
        verdict
    }

    /// Join retrieved snippets and caller-supplied image context into the
    /// generation context block. Empty context stays `None` so prompt
    /// assembly downstream can skip the block entirely.
    fn assemble_context(&self, exchange: &ChatExchange) -> Option<String> {
        let mut parts: Vec<String> = exchange
            .snippets
            .iter()
            .map(|snippet| snippet.text.clone())
            .collect();
        if let Some(image_text) = &exchange.image_text
            && !image_text.trim().is_empty()
        {
            parts.push(format!("Image OCR: {image_text}"));
        }
        if let Some(image_answer) = &exchange.image_answer
            && !image_answer.trim().is_empty()
        {
            parts.push(format!("Image answer: {image_answer}"));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }
}
