use std::sync::Arc;
use uuid::Uuid;

use crate::database::StudyStore;
use crate::errors::StudyError;
use crate::models::*;
use crate::{log_service_start, log_service_success, log_validation};

const SERVICE: &str = "study_service";

/// Next-card selection and knowledge tracking for existing study sessions
#[derive(Clone)]
pub struct StudyService {
    store: Arc<dyn StudyStore>,
}

impl StudyService {
    pub fn new(store: Arc<dyn StudyStore>) -> Self {
        Self { store }
    }

    async fn require_session(&self, session_id: Uuid) -> Result<StudySession, StudyError> {
        self.store
            .get_session(session_id)
            .await?
            .ok_or_else(|| StudyError::NotFound(format!("study session '{}'", session_id)))
    }

    /// The card most in need of review. Recomputed on every call, so a card can repeat.
    pub async fn next_flashcard(&self, session_id: Uuid) -> Result<Flashcard, StudyError> {
        log_service_start!(SERVICE, "next_flashcard", session_id = session_id);
        self.require_session(session_id).await?;

        self.store
            .next_flashcard(session_id)
            .await?
            .ok_or(StudyError::NoCardsRemaining)
    }

    /// Append a review. An incorrect answer is always stored as "not known".
    pub async fn record_study(
        &self,
        session_id: Uuid,
        flashcard_id: Uuid,
        knowledge_level: i64,
        is_correct: bool,
    ) -> Result<FlashcardStudy, StudyError> {
        log_service_start!(SERVICE, "record_study", session_id = session_id);
        let supplied = KnowledgeLevel::try_from(knowledge_level).inspect_err(|e| {
            log_validation!(failure, "study_request", error = e);
        })?;

        let flashcard = self
            .store
            .get_flashcard(flashcard_id)
            .await?
            .filter(|card| card.study_session_id == session_id)
            .ok_or_else(|| {
                StudyError::NotFound(format!(
                    "flashcard '{}' in study session '{}'",
                    flashcard_id, session_id
                ))
            })?;

        let effective = if is_correct { supplied } else { KnowledgeLevel::NotKnown };
        let study = self.store.create_study(&flashcard, effective).await?;

        log_service_success!(
            SERVICE,
            "record_study",
            format!("flashcard {} recorded at level {}", flashcard.id, effective.as_i64())
        );

        Ok(study)
    }

    pub async fn session_detail(&self, session_id: Uuid) -> Result<StudySessionDetail, StudyError> {
        let session = self.require_session(session_id).await?;
        let flashcards = self.store.list_flashcards(session_id).await?;

        Ok(StudySessionDetail {
            id: session.id,
            created_at: session.created_at,
            flashcards,
        })
    }

    pub async fn session_progress(&self, session_id: Uuid) -> Result<Vec<FlashcardProgress>, StudyError> {
        self.require_session(session_id).await?;
        self.store.session_progress(session_id).await
    }
}
