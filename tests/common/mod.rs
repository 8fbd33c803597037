#![allow(dead_code)]

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use flashcard_study::{
    create_router, AppState, ContentExtractor, Database, FlashcardGenerator, LLMProviderFactory,
    LLMProviderType, PollPolicy,
};

pub const PARIS_TEXT: &str = "Paris is the capital of France.";

pub const PARIS_CARDS: &str = r#"{"cards": [
    {"question": "What is the capital of France?", "answer": "Paris"},
    {"question": "Which landmark is Paris known for?", "answer": "The Eiffel Tower"}
]}"#;

/// Serve `router` on an ephemeral local port and return its base URL
pub async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// OpenAI-compatible chat-completions stand-in
#[derive(Clone)]
pub struct MockLlm {
    pub base_url: String,
    pub requests: Arc<Mutex<Vec<Value>>>,
}

#[derive(Clone)]
struct LlmState {
    status: StatusCode,
    reply: String,
    requests: Arc<Mutex<Vec<Value>>>,
}

async fn chat_completions(State(state): State<LlmState>, Json(body): Json<Value>) -> impl IntoResponse {
    state.requests.lock().unwrap().push(body);

    if !state.status.is_success() {
        return (state.status, Json(json!({"error": {"message": "upstream exploded"}})));
    }

    (
        StatusCode::OK,
        Json(json!({
            "choices": [{"message": {"role": "assistant", "content": state.reply}}]
        })),
    )
}

impl MockLlm {
    pub async fn replying(reply: &str) -> Self {
        Self::start(StatusCode::OK, reply).await
    }

    pub async fn failing(status: StatusCode) -> Self {
        Self::start(status, "").await
    }

    async fn start(status: StatusCode, reply: &str) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = LlmState {
            status,
            reply: reply.to_string(),
            requests: requests.clone(),
        };
        let router = Router::new()
            .route("/chat/completions", post(chat_completions))
            .with_state(state);

        Self {
            base_url: spawn(router).await,
            requests,
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_model(&self) -> Option<String> {
        self.requests
            .lock()
            .unwrap()
            .last()
            .and_then(|body| body["model"].as_str().map(str::to_string))
    }
}

/// Document-parsing service stand-in. Job polls walk through `statuses`,
/// repeating the last one once exhausted.
#[derive(Clone)]
pub struct MockParser {
    pub base_url: String,
    pub polls: Arc<AtomicUsize>,
}

#[derive(Clone)]
struct ParserState {
    statuses: Arc<Vec<String>>,
    text: String,
    polls: Arc<AtomicUsize>,
}

async fn upload() -> Json<Value> {
    Json(json!({"id": "job-1", "status": "PENDING"}))
}

async fn job_status(State(state): State<ParserState>) -> Json<Value> {
    let poll = state.polls.fetch_add(1, Ordering::SeqCst);
    let index = poll.min(state.statuses.len() - 1);
    Json(json!({"id": "job-1", "status": state.statuses[index]}))
}

async fn job_text(State(state): State<ParserState>) -> Json<Value> {
    Json(json!({"text": state.text}))
}

impl MockParser {
    pub async fn start(statuses: &[&str], text: &str) -> Self {
        let polls = Arc::new(AtomicUsize::new(0));
        let state = ParserState {
            statuses: Arc::new(statuses.iter().map(|s| s.to_string()).collect()),
            text: text.to_string(),
            polls: polls.clone(),
        };
        let router = Router::new()
            .route("/api/parsing/upload", post(upload))
            .route("/api/parsing/job/:job_id", get(job_status))
            .route("/api/parsing/job/:job_id/result/text", get(job_text))
            .with_state(state);

        Self {
            base_url: spawn(router).await,
            polls,
        }
    }

    /// A service that accepts the connection but never answers the upload
    pub async fn stalled_upload() -> Self {
        async fn hang() -> Json<Value> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Json(json!({"id": "never"}))
        }

        let router = Router::new().route("/api/parsing/upload", post(hang));
        Self {
            base_url: spawn(router).await,
            polls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Polls complete immediately but the text download never answers
    pub async fn stalled_result() -> Self {
        async fn hang() -> Json<Value> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Json(json!({"text": "never"}))
        }

        let polls = Arc::new(AtomicUsize::new(0));
        let state = ParserState {
            statuses: Arc::new(vec!["COMPLETED".to_string()]),
            text: String::new(),
            polls: polls.clone(),
        };
        let router = Router::new()
            .route("/api/parsing/upload", post(upload))
            .route("/api/parsing/job/:job_id", get(job_status))
            .route("/api/parsing/job/:job_id/result/text", get(hang))
            .with_state(state);

        Self {
            base_url: spawn(router).await,
            polls,
        }
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

pub fn fast_policy() -> PollPolicy {
    PollPolicy {
        initial_interval: Duration::from_millis(10),
        max_interval: Duration::from_millis(20),
        backoff_factor: 1.5,
        timeout: Duration::from_secs(2),
    }
}

pub fn extractor(parser_url: &str) -> ContentExtractor {
    ContentExtractor::new(Some("test-parser-key".to_string()), parser_url, fast_policy())
}

pub fn generator(llm_url: &str) -> FlashcardGenerator {
    let provider = LLMProviderFactory::create_provider(
        LLMProviderType::OpenAI,
        Some("test-llm-key".to_string()),
        Some(llm_url.to_string()),
        Some("test-model".to_string()),
    );
    FlashcardGenerator::new(provider)
}

pub async fn memory_db() -> Database {
    Database::new("sqlite::memory:").await.unwrap()
}

pub struct TestApp {
    pub server: TestServer,
    pub db: Database,
}

/// API server over an in-memory database. `db` shares the server's pool.
pub async fn test_app(llm_url: &str, parser_url: &str) -> TestApp {
    let db = memory_db().await;
    let state = AppState::new(Arc::new(db.clone()), extractor(parser_url), generator(llm_url));
    let server = TestServer::new(create_router(state)).unwrap();
    TestApp { server, db }
}

/// Parser URL for tests that never submit a PDF
pub const UNUSED_PARSER: &str = "http://127.0.0.1:9";
