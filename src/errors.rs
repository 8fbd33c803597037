use axum::{http::StatusCode, response::Json};
use tracing::{error, info, warn};

use crate::models::MessageResponse;

pub const NO_CARDS_REMAINING_MESSAGE: &str = "No more flashcards in this session";

/// Every failure the study backend can surface, from upstream calls to storage.
#[derive(Debug, thiserror::Error)]
pub enum StudyError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("{}", NO_CARDS_REMAINING_MESSAGE)]
    NoCardsRemaining,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Upstream service error: {0}")]
    UpstreamError(String),

    #[error("Unparsable LLM response: {0}")]
    UnparsableResponse(String),

    #[error("PDF extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl From<reqwest::Error> for StudyError {
    fn from(err: reqwest::Error) -> Self {
        StudyError::UpstreamError(err.to_string())
    }
}

impl StudyError {
    /// Wrap a row-decoding failure (bad UUID, bad timestamp) as a database error.
    pub fn decode<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StudyError::DatabaseError(sqlx::Error::Decode(Box::new(err)))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            StudyError::NotFound(_) | StudyError::NoCardsRemaining => StatusCode::NOT_FOUND,
            StudyError::ValidationError(_) => StatusCode::BAD_REQUEST,
            StudyError::UpstreamError(_)
            | StudyError::UnparsableResponse(_)
            | StudyError::ExtractionFailed(_)
            | StudyError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error context for structured logging
#[derive(Debug)]
pub struct ErrorContext {
    pub operation: String,
    pub resource_id: Option<String>,
    pub resource_type: String,
}

impl ErrorContext {
    pub fn new(operation: &str, resource_type: &str) -> Self {
        Self {
            operation: operation.to_string(),
            resource_id: None,
            resource_type: resource_type.to_string(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }
}

impl StudyError {
    /// Convert the error to an HTTP response, logging it at a level matching its severity
    pub fn to_response_with_context(
        self,
        context: ErrorContext,
    ) -> (StatusCode, Json<MessageResponse>) {
        let status = self.status_code();
        let message = match &self {
            StudyError::NotFound(_) => {
                info!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Resource not found"
                );
                format!("{} not found", context.resource_type)
            }
            StudyError::NoCardsRemaining => {
                info!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    "Study session has no flashcards left"
                );
                NO_CARDS_REMAINING_MESSAGE.to_string()
            }
            StudyError::ValidationError(_) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Validation error"
                );
                self.to_string()
            }
            StudyError::UpstreamError(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Upstream service error"
                );
                "An upstream service failed. Please try again.".to_string()
            }
            StudyError::UnparsableResponse(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "LLM response could not be parsed"
                );
                "The AI service returned an unreadable response. Please try again.".to_string()
            }
            StudyError::ExtractionFailed(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "PDF extraction failed"
                );
                "The PDF could not be processed.".to_string()
            }
            StudyError::DatabaseError(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Database error"
                );
                "Database operation failed. Please try again.".to_string()
            }
        };

        (status, Json(MessageResponse::new(message)))
    }
}

/// Helper macro for structured error responses
#[macro_export]
macro_rules! study_error {
    (not_found, $operation:expr, $resource_type:expr, $id:expr) => {
        $crate::errors::StudyError::NotFound(format!("{} with id '{}' not found", $resource_type, $id))
            .to_response_with_context(
                $crate::errors::ErrorContext::new($operation, $resource_type).with_id($id),
            )
    };

    (validation, $operation:expr, $resource_type:expr, $message:expr) => {
        $crate::errors::StudyError::ValidationError($message.to_string())
            .to_response_with_context($crate::errors::ErrorContext::new($operation, $resource_type))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context_creation() {
        let context = ErrorContext::new("record_study", "flashcard").with_id("123");

        assert_eq!(context.operation, "record_study");
        assert_eq!(context.resource_type, "flashcard");
        assert_eq!(context.resource_id, Some("123".to_string()));
    }

    #[test]
    fn test_status_code_mapping() {
        let cases = vec![
            (StudyError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (StudyError::NoCardsRemaining, StatusCode::NOT_FOUND),
            (StudyError::ValidationError("x".into()), StatusCode::BAD_REQUEST),
            (StudyError::UpstreamError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (StudyError::UnparsableResponse("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (StudyError::ExtractionFailed("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                StudyError::DatabaseError(sqlx::Error::RowNotFound),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status_code(), expected, "{error:?}");
        }
    }

    #[test]
    fn test_no_cards_response_message() {
        let (status, Json(body)) = StudyError::NoCardsRemaining
            .to_response_with_context(ErrorContext::new("get_next_flashcard", "study session"));

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.message, "No more flashcards in this session");
    }

    #[test]
    fn test_not_found_hides_internal_detail() {
        let (status, Json(body)) = study_error!(not_found, "get_flashcard", "flashcard", "abc");

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.message, "flashcard not found");
    }

    #[test]
    fn test_upstream_detail_not_leaked() {
        let (status, Json(body)) = StudyError::UpstreamError("key sk-secret rejected".into())
            .to_response_with_context(ErrorContext::new("generate_flashcards", "flashcards"));

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.message.contains("sk-secret"));
    }
}
