use std::time::Instant;

use crate::errors::StudyError;
use crate::llm_providers::{JsonResponseParser, LLMProvider};
use crate::models::{FlashcardSet, GeneratedFlashcard};
use crate::log_llm_operation;

const SYSTEM_PROMPT: &str = r#"You are an assistant that turns study material into flashcards. Each flashcard has a question (the front of the card) and an answer (the back).

Read the material carefully and pick out its key concepts, facts, definitions, relationships, terms, dates and events. Then write flashcards that follow these rules:
1. Vary the kind of question: definitions, comparisons, cause and effect, and so on.
2. Questions should be challenging without being convoluted.
3. Answers should be short but informative.
4. Do not repeat the same information on more than one card.
5. Everything on a card must come from the supplied material. Do not add outside knowledge.

Check the finished cards for accuracy, clarity and relevance before answering. Always respond with valid JSON in the requested format and nothing else."#;

fn build_prompt(raw_text: &str) -> String {
    format!(
        r#"Create flashcards from the following material.

<raw_data>
{}
</raw_data>

Respond with a JSON object in exactly this format:
{{
    "cards": [
        {{"question": "Question text", "answer": "Answer text"}}
    ]
}}"#,
        raw_text
    )
}

#[derive(Debug, Clone)]
pub struct FlashcardGenerator {
    provider: LLMProvider,
    json_parser: JsonResponseParser,
}

impl FlashcardGenerator {
    pub fn new(provider: LLMProvider) -> Self {
        Self {
            provider,
            json_parser: JsonResponseParser,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    pub fn default_model(&self) -> &str {
        self.provider.model_name()
    }

    /// Generate question/answer pairs from `raw_text` with a single LLM call
    pub async fn generate(
        &self,
        raw_text: &str,
        model: Option<&str>,
    ) -> Result<Vec<GeneratedFlashcard>, StudyError> {
        let started = Instant::now();
        log_llm_operation!(
            start,
            "generate_flashcards",
            provider = self.provider_name(),
            model = model.unwrap_or(self.default_model()),
            input_length = raw_text.len()
        );

        let response_text = match self
            .provider
            .make_request(Some(SYSTEM_PROMPT), &build_prompt(raw_text), model)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                log_llm_operation!(error, "generate_flashcards", provider = self.provider_name(), error = e);
                return Err(e);
            }
        };

        tracing::debug!(response_content = %response_text, "Raw LLM response for flashcard generation");

        let set: FlashcardSet = match self.json_parser.parse_structured(&response_text) {
            Ok(set) => set,
            Err(e) => {
                log_llm_operation!(error, "generate_flashcards", provider = self.provider_name(), error = e);
                return Err(e);
            }
        };

        let cards = usable_cards(set);
        if cards.is_empty() {
            return Err(StudyError::UnparsableResponse(
                "response contained no usable flashcards".to_string(),
            ));
        }

        log_llm_operation!(
            success,
            "generate_flashcards",
            provider = self.provider_name(),
            duration_ms = started.elapsed().as_millis() as u64,
            card_count = cards.len()
        );

        Ok(cards)
    }
}

/// Trim every card and drop the ones with a blank side
fn usable_cards(set: FlashcardSet) -> Vec<GeneratedFlashcard> {
    let total = set.cards.len();
    let cards: Vec<GeneratedFlashcard> = set
        .cards
        .into_iter()
        .map(|card| GeneratedFlashcard {
            question: card.question.trim().to_string(),
            answer: card.answer.trim().to_string(),
        })
        .filter(|card| !card.question.is_empty() && !card.answer.is_empty())
        .collect();

    if cards.len() < total {
        log_llm_operation!(
            warn,
            "generate_flashcards",
            format!("dropped {} flashcards with an empty question or answer", total - cards.len())
        );
    }

    cards
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(question: &str, answer: &str) -> GeneratedFlashcard {
        GeneratedFlashcard {
            question: question.to_string(),
            answer: answer.to_string(),
        }
    }

    #[test]
    fn test_prompt_embeds_raw_text() {
        let prompt = build_prompt("Paris is the capital of France.");
        assert!(prompt.contains("<raw_data>\nParis is the capital of France.\n</raw_data>"));
        assert!(prompt.contains("\"cards\""));
    }

    #[test]
    fn test_usable_cards_drops_blank_sides() {
        let set = FlashcardSet {
            cards: vec![
                card("  What is the capital of France? ", " Paris "),
                card("", "orphan answer"),
                card("Orphan question", "   "),
            ],
        };

        let cards = usable_cards(set);
        assert_eq!(cards, vec![card("What is the capital of France?", "Paris")]);
    }
}
