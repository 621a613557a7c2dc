//! Speech and vision request/response types

use serde::{Deserialize, Serialize};

/// Speech-to-text request.
#[derive(Debug, Clone)]
pub struct SttRequest {
    /// Raw audio bytes, format identified by `media_type` when known.
    pub audio: Vec<u8>,
    /// MIME type of the audio payload (e.g. "audio/wav").
    pub media_type: Option<String>,
    /// Optional language hint (BCP-47).
    pub language: Option<String>,
}

impl SttRequest {
    pub fn new(audio: Vec<u8>) -> Self {
        Self {
            audio,
            media_type: None,
            language: None,
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Speech-to-text response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SttResponse {
    pub text: String,
}

/// Text-to-speech request.
#[derive(Debug, Clone)]
pub struct TtsRequest {
    /// Text to synthesize.
    pub text: String,
    /// Voice to use (backend-specific).
    pub voice: Option<String>,
    /// Audio format (mp3, wav, ...).
    pub format: Option<String>,
}

impl TtsRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: None,
            format: None,
        }
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

/// Text-to-speech response: raw audio plus its MIME type.
#[derive(Debug, Clone)]
pub struct TtsResponse {
    pub audio: Vec<u8>,
    pub media_type: String,
}

/// Image analysis request (OCR plus optional question answering).
#[derive(Debug, Clone)]
pub struct VisionRequest {
    /// Raw image bytes.
    pub image: Vec<u8>,
    /// Optional question about the image; backends fall back to a general
    /// description when absent.
    pub question: Option<String>,
}

impl VisionRequest {
    pub fn new(image: Vec<u8>) -> Self {
        Self {
            image,
            question: None,
        }
    }

    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }
}

/// Image analysis response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisionResponse {
    /// Text extracted from the image; empty when OCR found nothing.
    pub ocr_text: String,
    /// Answer to the question, when one was asked and answerable.
    pub answer: Option<String>,
}
