//! Response Composer
//!
//! Combines generated text, retrieved context, and the safety verdict into
//! the final structured reply. Composition is a pure function: identical
//! inputs produce byte-identical replies.

use crate::types::{RetrievalSnippet, SafetyLevel, SafetyVerdict, StructuredReply};

/// Fixed educational disclaimer attached to every reply.
pub const SAFETY_DISCLAIMER: &str = "This information is for education and triage support only. \
     It is not a medical diagnosis or treatment plan.";

/// Escalation guidance attached on an emergency verdict.
pub const URGENT_NOTICE: &str = "Your message contains possible emergency warning signs. \
     If you or someone else is experiencing this, seek urgent medical care or \
     emergency services now.";

/// Softer advisory attached on a caution verdict.
pub const CAUTION_ADVISORY: &str = "Some of what you describe may need professional attention. \
     Consider discussing it with a clinician soon, especially if it persists or worsens.";

/// Shown when no text-generation backend produced a usable message.
pub const UNAVAILABLE_MESSAGE: &str = "I'm sorry, I can't generate a full answer right now. \
     Please try again in a moment.";

/// Longest citation excerpt, in characters.
const CITATION_EXCERPT_CHARS: usize = 120;

/// Builds [`StructuredReply`] values from pipeline outputs.
///
/// The notice texts are fixed at construction; overriding them is a
/// configuration concern, not a per-request one.
#[derive(Debug, Clone)]
pub struct ResponseComposer {
    disclaimer: String,
    urgent_notice: String,
    advisory: String,
    unavailable_message: String,
}

impl Default for ResponseComposer {
    fn default() -> Self {
        Self {
            disclaimer: SAFETY_DISCLAIMER.to_string(),
            urgent_notice: URGENT_NOTICE.to_string(),
            advisory: CAUTION_ADVISORY.to_string(),
            unavailable_message: UNAVAILABLE_MESSAGE.to_string(),
        }
    }
}

impl ResponseComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the disclaimer text.
    pub fn with_disclaimer(mut self, disclaimer: impl Into<String>) -> Self {
        self.disclaimer = disclaimer.into();
        self
    }

    /// Override the emergency escalation text.
    pub fn with_urgent_notice(mut self, urgent_notice: impl Into<String>) -> Self {
        self.urgent_notice = urgent_notice.into();
        self
    }

    /// Override the caution advisory text.
    pub fn with_advisory(mut self, advisory: impl Into<String>) -> Self {
        self.advisory = advisory.into();
        self
    }

    /// Compose the final reply.
    ///
    /// The disclaimer is always present. An emergency verdict sets the
    /// urgent notice and the red flag; a caution verdict sets the softer
    /// advisory only. Snippets become citations in rank order and are never
    /// silently dropped.
    pub fn compose(
        &self,
        generated_text: &str,
        snippets: &[RetrievalSnippet],
        verdict: &SafetyVerdict,
    ) -> StructuredReply {
        let message = generated_text.trim();
        let message = if message.is_empty() {
            self.unavailable_message.clone()
        } else {
            message.to_string()
        };

        StructuredReply {
            message,
            disclaimer: self.disclaimer.clone(),
            urgent_notice: (verdict.level == SafetyLevel::Emergency)
                .then(|| self.urgent_notice.clone()),
            advisory: (verdict.level == SafetyLevel::Caution).then(|| self.advisory.clone()),
            red_flag: verdict.level == SafetyLevel::Emergency,
            citations: snippets.iter().map(citation).collect(),
        }
    }

    /// Fallback reply for a text-generation outage.
    ///
    /// Carries the disclaimer and, when the pre-generation scan on the
    /// user's own message already detected an emergency, the urgent notice:
    /// a provider outage must never suppress a red-flag warning.
    pub fn compose_unavailable(&self, verdict: &SafetyVerdict) -> StructuredReply {
        self.compose(&self.unavailable_message, &[], verdict)
    }
}

/// Attribution line for one snippet: source id plus a bounded excerpt.
fn citation(snippet: &RetrievalSnippet) -> String {
    let excerpt: String = snippet.text.chars().take(CITATION_EXCERPT_CHARS).collect();
    if snippet.text.chars().count() > CITATION_EXCERPT_CHARS {
        format!("[{}] {}...", snippet.source_id, excerpt.trim_end())
    } else {
        format!("[{}] {}", snippet.source_id, excerpt.trim_end())
    }
}
