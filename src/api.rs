use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    content_extractor::ContentExtractor,
    database::StudyStore,
    errors::ErrorContext,
    flashcard_generator::FlashcardGenerator,
    models::*,
    session_service::SessionService,
    study_error,
    study_service::StudyService,
};

// Import logging macros
use crate::{log_api_start, log_api_success, log_api_warn};

#[derive(Clone)]
pub struct AppState {
    pub session_service: SessionService,
    pub study_service: StudyService,
}

impl AppState {
    pub fn new(
        store: Arc<dyn StudyStore>,
        extractor: ContentExtractor,
        generator: FlashcardGenerator,
    ) -> Self {
        Self {
            session_service: SessionService::new(store.clone(), extractor, generator),
            study_service: StudyService::new(store),
        }
    }
}

pub type ErrorResponse = (StatusCode, Json<MessageResponse>);
pub type ApiResult<T> = Result<Json<T>, ErrorResponse>;

/// Identifiers that are not UUIDs cannot name anything we store
fn parse_id(raw: &str, operation: &str, resource_type: &str) -> Result<Uuid, ErrorResponse> {
    Uuid::parse_str(raw.trim()).map_err(|_| study_error!(not_found, operation, resource_type, raw))
}

fn json_body<T>(
    payload: Result<Json<T>, JsonRejection>,
    operation: &str,
    resource_type: &str,
) -> Result<T, ErrorResponse> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            log_api_warn!(operation, "malformed request body");
            Err(study_error!(validation, operation, resource_type, rejection.body_text()))
        }
    }
}

// Flashcard generation endpoints
pub async fn generate_flashcards(
    State(state): State<AppState>,
    Query(params): Query<ModelParams>,
    payload: Result<Json<ContentRequest>, JsonRejection>,
) -> ApiResult<FlashcardSet> {
    log_api_start!("generate_flashcards");
    let mut request = json_body(payload, "generate_flashcards", "flashcards")?;
    let model = request.model.take().or(params.model);

    let result = match request.into_content() {
        Ok(content) => state.session_service.generate_flashcards(content, model.as_deref()).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(cards) => {
            log_api_success!("generate_flashcards", count = cards.len(), "flashcards generated");
            Ok(Json(FlashcardSet { cards }))
        }
        Err(e) => Err(e.to_response_with_context(ErrorContext::new("generate_flashcards", "flashcards"))),
    }
}

pub async fn create_study_session(
    State(state): State<AppState>,
    Query(params): Query<ModelParams>,
    payload: Result<Json<ContentRequest>, JsonRejection>,
) -> ApiResult<CreateSessionResponse> {
    log_api_start!("create_study_session");
    let mut request = json_body(payload, "create_study_session", "study session")?;
    let model = request.model.take().or(params.model);

    let result = match request.into_content() {
        Ok(content) => state.session_service.create_study_session(content, model.as_deref()).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(session_id) => {
            log_api_success!("create_study_session", session_id = session_id, "study session created");
            Ok(Json(CreateSessionResponse { session_id }))
        }
        Err(e) => Err(e.to_response_with_context(ErrorContext::new("create_study_session", "study session"))),
    }
}

// Study flow endpoints
pub async fn get_next_flashcard(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<NextFlashcardResponse> {
    let session_id = parse_id(&session_id, "get_next_flashcard", "study session")?;
    log_api_start!("get_next_flashcard", session_id = session_id);

    match state.study_service.next_flashcard(session_id).await {
        Ok(card) => {
            log_api_success!("get_next_flashcard", session_id = session_id, "next flashcard selected");
            Ok(Json(NextFlashcardResponse::from(card)))
        }
        Err(e) => Err(e.to_response_with_context(
            ErrorContext::new("get_next_flashcard", "study session").with_id(&session_id.to_string()),
        )),
    }
}

pub async fn study_flashcard(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: Result<Json<StudyFlashcardRequest>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let session_id = parse_id(&session_id, "study_flashcard", "study session")?;
    log_api_start!("study_flashcard", session_id = session_id);

    let request = json_body(payload, "study_flashcard", "flashcard")?;
    let flashcard_id = parse_id(&request.flashcard_id, "study_flashcard", "flashcard")?;

    match state
        .study_service
        .record_study(session_id, flashcard_id, request.knowledge_level, request.is_correct)
        .await
    {
        Ok(study) => {
            log_api_success!("study_flashcard", session_id = session_id, "study recorded");
            Ok(Json(MessageResponse::new(format!(
                "Flashcard study recorded with knowledge level {}",
                study.knowledge_level.as_i64()
            ))))
        }
        Err(e) => Err(e.to_response_with_context(
            ErrorContext::new("study_flashcard", "flashcard").with_id(&flashcard_id.to_string()),
        )),
    }
}

pub async fn get_study_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<StudySessionDetail> {
    let session_id = parse_id(&session_id, "get_study_session", "study session")?;
    log_api_start!("get_study_session", session_id = session_id);

    state
        .study_service
        .session_detail(session_id)
        .await
        .map(Json)
        .map_err(|e| {
            e.to_response_with_context(
                ErrorContext::new("get_study_session", "study session").with_id(&session_id.to_string()),
            )
        })
}

pub async fn get_session_progress(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionProgressResponse> {
    let session_id = parse_id(&session_id, "get_session_progress", "study session")?;
    log_api_start!("get_session_progress", session_id = session_id);

    match state.study_service.session_progress(session_id).await {
        Ok(flashcards) => Ok(Json(SessionProgressResponse {
            session_id,
            flashcards,
        })),
        Err(e) => Err(e.to_response_with_context(
            ErrorContext::new("get_session_progress", "study session").with_id(&session_id.to_string()),
        )),
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Generation routes
        .route("/v1/generate-flashcards", post(generate_flashcards))
        .route("/v1/create-study-session", post(create_study_session))
        // Study flow routes
        .route("/v1/get-next-flashcard/:session_id", get(get_next_flashcard))
        .route("/v1/study-flashcard/:session_id", post(study_flashcard))
        // Session inspection routes
        .route("/v1/study-session/:session_id", get(get_study_session))
        .route("/v1/study-session/:session_id/progress", get(get_session_progress))
        .with_state(state)
}
