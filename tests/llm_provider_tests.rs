mod common;

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::post,
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use common::{spawn, MockLlm, PARIS_CARDS, PARIS_TEXT};
use flashcard_study::{FlashcardGenerator, LLMProviderFactory, LLMProviderType, StudyError};

#[derive(Clone, Default)]
struct GeminiCalls {
    calls: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
}

async fn generate_content(
    State(state): State<GeminiCalls>,
    Path(model_action): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state
        .calls
        .lock()
        .unwrap()
        .push((model_action, query.get("key").cloned(), body));

    Json(json!({
        "candidates": [{"content": {"parts": [{"text": PARIS_CARDS}]}}]
    }))
}

async fn mock_gemini() -> (String, GeminiCalls) {
    let calls = GeminiCalls::default();
    let router = Router::new()
        .route("/models/:model_action", post(generate_content))
        .with_state(calls.clone());
    (spawn(router).await, calls)
}

#[tokio::test]
async fn test_gemini_generates_flashcards() {
    let (base_url, calls) = mock_gemini().await;
    let provider = LLMProviderFactory::create_provider(
        LLMProviderType::Gemini,
        Some("gemini-key".to_string()),
        Some(base_url),
        Some("gemini-1.5-flash".to_string()),
    );
    let generator = FlashcardGenerator::new(provider);

    let cards = generator.generate(PARIS_TEXT, None).await.unwrap();
    assert_eq!(cards.len(), 2);

    let calls = calls.calls.lock().unwrap();
    let (model_action, key, body) = &calls[0];
    assert_eq!(model_action, "gemini-1.5-flash:generateContent");
    assert_eq!(key.as_deref(), Some("gemini-key"));

    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.contains(PARIS_TEXT));
    assert_eq!(body["generationConfig"]["maxOutputTokens"], 8192);
}

#[tokio::test]
async fn test_gemini_strips_gateway_prefix() {
    let (base_url, calls) = mock_gemini().await;
    let provider = LLMProviderFactory::create_provider(
        LLMProviderType::Gemini,
        Some("gemini-key".to_string()),
        Some(base_url),
        None,
    );

    provider
        .make_request(None, "hello", Some("gemini/gemini-1.5-pro"))
        .await
        .unwrap();

    let calls = calls.calls.lock().unwrap();
    assert_eq!(calls[0].0, "gemini-1.5-pro:generateContent");
}

#[tokio::test]
async fn test_openai_sends_system_and_user_messages() {
    let llm = MockLlm::replying("plain reply").await;
    let provider = LLMProviderFactory::create_provider(
        LLMProviderType::OpenAI,
        Some("key".to_string()),
        Some(format!("{}/", llm.base_url)),
        Some("gpt-4o-mini".to_string()),
    );

    let reply = provider
        .make_request(Some("be brief"), "hello", None)
        .await
        .unwrap();
    assert_eq!(reply, "plain reply");

    let requests = llm.requests.lock().unwrap();
    let messages = requests[0]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[0]["content"], "be brief");
    assert_eq!(messages[1]["role"], "user");
    assert_eq!(requests[0]["model"], "gpt-4o-mini");
}

#[tokio::test]
async fn test_cards_with_blank_sides_are_dropped() {
    let reply = r#"{"cards": [
        {"question": "What is the capital of France?", "answer": "Paris"},
        {"question": "   ", "answer": "nothing"}
    ]}"#;
    let llm = MockLlm::replying(reply).await;

    let cards = common::generator(&llm.base_url).generate(PARIS_TEXT, None).await.unwrap();

    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].answer, "Paris");
}

#[tokio::test]
async fn test_reply_without_usable_cards_is_unparsable() {
    for reply in [r#"{"cards": []}"#, r#"{"cards": [{"question": "", "answer": ""}]}"#, r#"{"flashcards": []}"#] {
        let llm = MockLlm::replying(reply).await;

        let result = common::generator(&llm.base_url).generate(PARIS_TEXT, None).await;

        assert!(
            matches!(result, Err(StudyError::UnparsableResponse(_))),
            "reply {} should be unparsable",
            reply
        );
    }
}

async fn split_reply() -> Json<Value> {
    let (head, tail) = PARIS_CARDS.split_at(PARIS_CARDS.len() / 2);
    Json(json!({
        "candidates": [{"content": {"parts": [{"text": head}, {"text": tail}]}}]
    }))
}

#[tokio::test]
async fn test_gemini_joins_multi_part_replies() {
    let router = Router::new().route("/models/:model_action", post(split_reply));
    let provider = LLMProviderFactory::create_provider(
        LLMProviderType::Gemini,
        Some("gemini-key".to_string()),
        Some(spawn(router).await),
        Some("gemini-1.5-flash".to_string()),
    );

    let cards = FlashcardGenerator::new(provider).generate(PARIS_TEXT, None).await.unwrap();

    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].answer, "Paris");
    assert_eq!(cards[1].answer, "The Eiffel Tower");
}
