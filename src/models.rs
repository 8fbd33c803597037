use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::StudyError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: Uuid,
    pub study_session_id: Uuid,
    pub position: i64, // Order in which the generator returned the card
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashcardStudy {
    pub id: Uuid,
    pub flashcard_id: Uuid,
    pub study_session_id: Uuid,
    pub knowledge_level: KnowledgeLevel,
    pub studied_at: DateTime<Utc>,
}

/// Learner-reported recall strength. Higher values mean the card needs more review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum KnowledgeLevel {
    WellKnown = 1,
    SomewhatKnown = 2,
    NotKnown = 3,
}

impl KnowledgeLevel {
    pub fn as_i64(self) -> i64 {
        self as i64
    }
}

impl TryFrom<i64> for KnowledgeLevel {
    type Error = StudyError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(KnowledgeLevel::WellKnown),
            2 => Ok(KnowledgeLevel::SomewhatKnown),
            3 => Ok(KnowledgeLevel::NotKnown),
            other => Err(StudyError::ValidationError(format!(
                "knowledge_level must be 1 (well known), 2 (somewhat known) or 3 (not known), got {}",
                other
            ))),
        }
    }
}

impl From<KnowledgeLevel> for i64 {
    fn from(level: KnowledgeLevel) -> Self {
        level.as_i64()
    }
}

/// A question/answer pair as produced by the flashcard generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFlashcard {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardSet {
    pub cards: Vec<GeneratedFlashcard>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashcardProgress {
    pub flashcard_id: Uuid,
    pub question: String,
    pub study_count: i64,
    pub average_knowledge_level: Option<f64>,
    pub last_studied_at: Option<DateTime<Utc>>,
}

/// Source material for a study session. A PDF always wins over raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudyContent {
    RawText(String),
    PdfBase64(String),
}

// Request types

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentRequest {
    pub raw_data: Option<String>,
    pub pdf_base64: Option<String>,
    pub model: Option<String>,
}

impl ContentRequest {
    pub fn into_content(self) -> Result<StudyContent, StudyError> {
        if let Some(pdf) = self.pdf_base64.filter(|pdf| !pdf.trim().is_empty()) {
            return Ok(StudyContent::PdfBase64(pdf));
        }

        match self.raw_data {
            Some(text) if !text.trim().is_empty() => Ok(StudyContent::RawText(text)),
            _ => Err(StudyError::ValidationError(
                "either raw_data or pdf_base64 must be provided".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelParams {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyFlashcardRequest {
    pub flashcard_id: String,
    pub knowledge_level: i64,
    pub is_correct: bool,
}

// Response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextFlashcardResponse {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
}

impl From<Flashcard> for NextFlashcardResponse {
    fn from(card: Flashcard) -> Self {
        Self {
            id: card.id,
            question: card.question,
            answer: card.answer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudySessionDetail {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub flashcards: Vec<Flashcard>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionProgressResponse {
    pub session_id: Uuid,
    pub flashcards: Vec<FlashcardProgress>,
}
