use regex::Regex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{error, info};

use crate::errors::StudyError;

/// Common message structure for chat-completion requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMMessage {
    pub role: String,
    pub content: String,
}

/// Enum-based LLM provider implementation
#[derive(Debug, Clone)]
pub enum LLMProvider {
    OpenAI(OpenAIProvider),
    Gemini(GeminiProvider),
}

impl LLMProvider {
    /// Send a system + user prompt pair, optionally overriding the configured model
    pub async fn make_request(
        &self,
        system_message: Option<&str>,
        prompt: &str,
        model: Option<&str>,
    ) -> Result<String, StudyError> {
        match self {
            LLMProvider::OpenAI(provider) => provider.make_request(system_message, prompt, model).await,
            LLMProvider::Gemini(provider) => provider.make_request(system_message, prompt, model).await,
        }
    }

    /// Get the provider name for logging
    pub fn provider_name(&self) -> &'static str {
        match self {
            LLMProvider::OpenAI(provider) => provider.provider_name(),
            LLMProvider::Gemini(provider) => provider.provider_name(),
        }
    }

    /// Get the default model name
    pub fn model_name(&self) -> &str {
        match self {
            LLMProvider::OpenAI(provider) => provider.model_name(),
            LLMProvider::Gemini(provider) => provider.model_name(),
        }
    }
}

fn require_api_key<'a>(api_key: &'a Option<String>, provider: &str) -> Result<&'a str, StudyError> {
    api_key.as_deref().ok_or_else(|| {
        StudyError::UpstreamError(format!("{} API key is not configured (set LLM_API_KEY)", provider))
    })
}

async fn check_status(response: reqwest::Response, provider: &'static str) -> Result<reqwest::Response, StudyError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    error!(
        provider = provider,
        status = %status,
        error = %error_text,
        "LLM API request failed"
    );
    Err(StudyError::UpstreamError(format!(
        "{} API request failed with status {}: {}",
        provider, status, error_text
    )))
}

/// OpenAI-compatible chat-completions gateway
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<LLMMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIChoice {
    message: LLMMessage,
}

impl OpenAIProvider {
    pub fn new(api_key: Option<String>, base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
            model: model.unwrap_or_else(|| "gpt-4o-mini".to_string()),
        }
    }

    pub async fn make_request(
        &self,
        system_message: Option<&str>,
        prompt: &str,
        model: Option<&str>,
    ) -> Result<String, StudyError> {
        let api_key = require_api_key(&self.api_key, self.provider_name())?;
        let model = model.unwrap_or(&self.model);

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            messages.push(LLMMessage {
                role: "system".to_string(),
                content: sys_msg.to_string(),
            });
        }

        messages.push(LLMMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });

        let request_body = OpenAIRequest {
            model: model.to_string(),
            messages,
        };

        info!(
            provider = self.provider_name(),
            model = %model,
            base_url = %self.base_url,
            prompt_length = prompt.len(),
            "Making LLM request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await?;

        let response = check_status(response, self.provider_name()).await?;
        let openai_response: OpenAIResponse = response.json().await?;

        let response_content = openai_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| StudyError::UpstreamError("No choices in OpenAI response".to_string()))?;

        info!(
            provider = self.provider_name(),
            response_length = response_content.len(),
            "Successfully received LLM response"
        );

        Ok(response_content)
    }

    pub fn provider_name(&self) -> &'static str {
        "OpenAI"
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }
}

/// Gemini generateContent API
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "topP")]
    top_p: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

impl GeminiProvider {
    pub fn new(api_key: Option<String>, base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string())
                .trim_end_matches('/')
                .to_string(),
            model: model.unwrap_or_else(|| "gemini-1.5-pro-latest".to_string()),
        }
    }

    pub async fn make_request(
        &self,
        system_message: Option<&str>,
        prompt: &str,
        model: Option<&str>,
    ) -> Result<String, StudyError> {
        let api_key = require_api_key(&self.api_key, self.provider_name())?;
        // Gateway-style identifiers such as "gemini/gemini-1.5-pro" name the model after the slash
        let model = model
            .map(|m| m.strip_prefix("gemini/").unwrap_or(m))
            .unwrap_or(&self.model);

        let full_prompt = match system_message {
            Some(sys_msg) => format!("{}\n\n{}", sys_msg, prompt),
            None => prompt.to_string(),
        };

        let request_body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: full_prompt }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: 0.4,
                top_p: 0.9,
                max_output_tokens: 8192,
            },
        };

        info!(
            provider = self.provider_name(),
            model = %model,
            base_url = %self.base_url,
            prompt_length = prompt.len(),
            "Making LLM request"
        );

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, model))
            .query(&[("key", api_key)])
            .json(&request_body)
            .send()
            .await?;

        let response = check_status(response, self.provider_name()).await?;
        let gemini_response: GeminiResponse = response.json().await?;

        let response_content = gemini_response
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<String>()
            })
            .filter(|text| !text.is_empty())
            .ok_or_else(|| StudyError::UpstreamError("No candidates in Gemini response".to_string()))?;

        info!(
            provider = self.provider_name(),
            response_length = response_content.len(),
            "Successfully received LLM response"
        );

        Ok(response_content)
    }

    pub fn provider_name(&self) -> &'static str {
        "Gemini"
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }
}

static FENCED_JSON_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```json\b[ \t]*\r?\n?(.*?)```").expect("fenced JSON pattern is valid")
});

/// Two-stage parser for structured LLM replies: strict JSON first, then a ```json fenced block.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResponseParser;

impl JsonResponseParser {
    /// Contents of the first fenced code block labelled `json`, if any
    pub fn extract_fenced_json(content: &str) -> Option<&str> {
        FENCED_JSON_BLOCK
            .captures(content)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().trim())
    }

    pub fn parse_structured<T>(&self, content: &str) -> Result<T, StudyError>
    where
        T: DeserializeOwned,
    {
        let strict_error = match serde_json::from_str::<T>(content.trim()) {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        let Some(block) = Self::extract_fenced_json(content) else {
            return Err(StudyError::UnparsableResponse(format!(
                "reply is not valid JSON ({}) and contains no ```json block",
                strict_error
            )));
        };

        serde_json::from_str::<T>(block).map_err(|e| {
            StudyError::UnparsableResponse(format!("fenced JSON block is invalid: {}", e))
        })
    }
}

/// Factory for creating LLM providers based on provider type
pub struct LLMProviderFactory;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LLMProviderType {
    OpenAI,
    Gemini,
}

impl LLMProviderType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "gemini" | "google" => Some(LLMProviderType::Gemini),
            "openai" | "gateway" | "chatgpt" | "gpt" => Some(LLMProviderType::OpenAI),
            _ => None,
        }
    }
}

impl LLMProviderFactory {
    pub fn create_provider(
        provider_type: LLMProviderType,
        api_key: Option<String>,
        base_url: Option<String>,
        model: Option<String>,
    ) -> LLMProvider {
        match provider_type {
            LLMProviderType::OpenAI => LLMProvider::OpenAI(OpenAIProvider::new(api_key, base_url, model)),
            LLMProviderType::Gemini => LLMProvider::Gemini(GeminiProvider::new(api_key, base_url, model)),
        }
    }
}
