//! Chat-path request and reply types

use serde::{Deserialize, Serialize};

use crate::types::{RetrievalSnippet, SafetyVerdict};

/// Request sent to a text-generation backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub user_message: String,
    /// Retrieved knowledge and media-derived context, already assembled.
    pub context: Option<String>,
}

impl GenerationRequest {
    pub fn new(user_message: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Response from a text-generation backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub message: String,
}

/// One inbound chat turn, as supplied by the (external) chat handler.
///
/// Image-derived context is caller-owned and passed once per turn; the core
/// keeps no cross-request conversation state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatTurnRequest {
    pub user_message: String,
    /// OCR text extracted from an image the user attached earlier.
    pub image_text: Option<String>,
    /// Vision-model answer about that image.
    pub image_answer: Option<String>,
    /// Maximum number of knowledge snippets to retrieve.
    pub top_k: Option<usize>,
}

impl ChatTurnRequest {
    pub fn new(user_message: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            ..Self::default()
        }
    }

    pub fn with_image_text(mut self, text: impl Into<String>) -> Self {
        self.image_text = Some(text.into());
        self
    }

    pub fn with_image_answer(mut self, answer: impl Into<String>) -> Self {
        self.image_answer = Some(answer.into());
        self
    }

    pub const fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }
}

/// Request-scoped working state for one chat turn.
///
/// Created at request start, fully consumed by the response composer, then
/// discarded. History, if any, is the caller's responsibility.
#[derive(Debug, Clone, Default)]
pub struct ChatExchange {
    pub user_message: String,
    pub image_text: Option<String>,
    pub image_answer: Option<String>,
    pub snippets: Vec<RetrievalSnippet>,
    pub generated_message: Option<String>,
    pub safety_verdict: SafetyVerdict,
}

/// Final structured reply handed back to the chat handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredReply {
    pub message: String,
    /// Fixed educational disclaimer, always present.
    pub disclaimer: String,
    /// Escalation guidance; set only on an emergency verdict.
    pub urgent_notice: Option<String>,
    /// Softer advisory; set only on a caution verdict.
    pub advisory: Option<String>,
    /// True iff an emergency-level safety signal was detected.
    pub red_flag: bool,
    /// Attributions for retrieved snippets, in rank order.
    pub citations: Vec<String>,
}
