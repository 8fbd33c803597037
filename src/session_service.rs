use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::content_extractor::ContentExtractor;
use crate::database::StudyStore;
use crate::errors::StudyError;
use crate::flashcard_generator::FlashcardGenerator;
use crate::models::{GeneratedFlashcard, StudyContent};
use crate::{log_service_error, log_service_start, log_service_success};

const SERVICE: &str = "session_service";

/// Turns submitted content into flashcards and new study sessions
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn StudyStore>,
    extractor: ContentExtractor,
    generator: FlashcardGenerator,
}

impl SessionService {
    pub fn new(store: Arc<dyn StudyStore>, extractor: ContentExtractor, generator: FlashcardGenerator) -> Self {
        Self {
            store,
            extractor,
            generator,
        }
    }

    /// Plain text for the generator; PDFs go through the content extractor first
    pub async fn resolve_text(&self, content: StudyContent) -> Result<String, StudyError> {
        match content {
            StudyContent::RawText(text) => Ok(text),
            StudyContent::PdfBase64(pdf) => {
                let text = self.extractor.extract_text(&pdf).await?;
                if text.trim().is_empty() {
                    return Err(StudyError::ExtractionFailed(
                        "the PDF contains no extractable text".to_string(),
                    ));
                }
                Ok(text)
            }
        }
    }

    pub async fn generate_flashcards(
        &self,
        content: StudyContent,
        model: Option<&str>,
    ) -> Result<Vec<GeneratedFlashcard>, StudyError> {
        log_service_start!(SERVICE, "generate_flashcards", content_kind = content_kind(&content));
        let started = Instant::now();

        let result: Result<Vec<GeneratedFlashcard>, StudyError> = async {
            let text = self.resolve_text(content).await?;
            self.generator.generate(&text, model).await
        }
        .await;

        match result {
            Ok(cards) => {
                log_service_success!(
                    SERVICE,
                    "generate_flashcards",
                    card_count = cards.len(),
                    duration_ms = started.elapsed().as_millis() as u64
                );
                Ok(cards)
            }
            Err(e) => {
                log_service_error!(SERVICE, "generate_flashcards", error = e);
                Err(e)
            }
        }
    }

    /// Generate flashcards and persist them with a new session; nothing is stored on failure
    pub async fn create_study_session(
        &self,
        content: StudyContent,
        model: Option<&str>,
    ) -> Result<Uuid, StudyError> {
        let started = Instant::now();
        let cards = self.generate_flashcards(content, model).await?;

        let (session, flashcards) = match self.store.create_session_with_flashcards(&cards).await {
            Ok(created) => created,
            Err(e) => {
                log_service_error!(SERVICE, "create_study_session", error = e);
                return Err(e);
            }
        };

        log_service_success!(
            SERVICE,
            "create_study_session",
            session_id = session.id,
            card_count = flashcards.len(),
            duration_ms = started.elapsed().as_millis() as u64
        );

        Ok(session.id)
    }
}

fn content_kind(content: &StudyContent) -> &'static str {
    match content {
        StudyContent::RawText(_) => "raw_text",
        StudyContent::PdfBase64(_) => "pdf",
    }
}
