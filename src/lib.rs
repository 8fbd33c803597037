pub mod api;
pub mod config;
pub mod content_extractor;
pub mod database;
pub mod errors;
pub mod flashcard_generator;
pub mod llm_providers;
pub mod logging;
pub mod models;
pub mod session_service;
pub mod study_service;

pub use api::{create_router, AppState};
pub use config::Config;
pub use content_extractor::{ContentExtractor, PollPolicy};
pub use database::{Database, StudyStore};
pub use errors::*;
pub use flashcard_generator::FlashcardGenerator;
pub use llm_providers::{JsonResponseParser, LLMProvider, LLMProviderFactory, LLMProviderType};
pub use models::*;
pub use session_service::SessionService;
pub use study_service::StudyService;
