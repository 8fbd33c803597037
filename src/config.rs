use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;
use tracing::{info, warn};

use crate::content_extractor::PollPolicy;
use crate::llm_providers::LLMProviderType;

// Import logging macros
use crate::{log_system_event, log_validation};

/// Complete application configuration loaded from environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub llm: LLMConfig,
    pub pdf_parser: PdfParserConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Database connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Large Language Model gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub provider: LLMProviderType,
    pub model: Option<String>,
}

/// Remote document-parsing service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PdfParserConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub poll_interval_ms: u64,
    pub max_poll_interval_ms: u64,
    pub timeout_secs: u64,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Logging system configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup (the process environment in production)
    pub fn from_source<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        log_system_event!(config, "Loading application configuration");

        let config = Config {
            database: DatabaseConfig::from_source(&lookup),
            llm: LLMConfig::from_source(&lookup),
            pdf_parser: PdfParserConfig::from_source(&lookup)?,
            server: ServerConfig::from_source(&lookup)?,
            logging: LoggingConfig::from_source(&lookup),
        };

        log_system_event!(config, "Configuration loaded successfully");
        config.log_configuration_summary();

        Ok(config)
    }

    /// Log a summary of loaded configuration (without sensitive data)
    fn log_configuration_summary(&self) {
        info!(
            database_url_masked = %mask_sensitive_data(&self.database.url),
            llm_provider = ?self.llm.provider,
            llm_model = ?self.llm.model,
            llm_key_present = self.llm.api_key.is_some(),
            pdf_parser_url = %self.pdf_parser.base_url,
            pdf_parser_key_present = self.pdf_parser.api_key.is_some(),
            server_address = %self.server.address(),
            log_level = %self.logging.level,
            "Configuration summary"
        );
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.database.url.starts_with("sqlite:") {
            return Err(anyhow!("DATABASE_URL must start with 'sqlite:'"));
        }

        if self.server.port == 0 {
            return Err(anyhow!("Server port must be greater than 0"));
        }

        if self.pdf_parser.poll_interval_ms == 0 {
            return Err(anyhow!("PDF_PARSER_POLL_INTERVAL_MS must be greater than 0"));
        }

        if self.pdf_parser.max_poll_interval_ms < self.pdf_parser.poll_interval_ms {
            return Err(anyhow!(
                "PDF_PARSER_MAX_POLL_INTERVAL_MS must not be smaller than PDF_PARSER_POLL_INTERVAL_MS"
            ));
        }

        if self.pdf_parser.timeout_secs.saturating_mul(1000) < self.pdf_parser.poll_interval_ms {
            return Err(anyhow!(
                "PDF_PARSER_TIMEOUT_SECS must cover at least one poll interval"
            ));
        }

        // Missing keys only fail the requests that need them
        if self.llm.api_key.is_none() {
            warn!("LLM_API_KEY is not set - flashcard generation requests will fail");
        }
        if self.pdf_parser.api_key.is_none() {
            warn!("PDF_PARSER_API_KEY is not set - PDF uploads will fail");
        }

        if !["trace", "debug", "info", "warn", "error"]
            .iter()
            .any(|level| self.logging.level.to_lowercase().contains(level))
        {
            warn!("Invalid log level '{}', using 'info' as fallback", self.logging.level);
        }

        log_validation!(success, "configuration", "Configuration validation completed successfully");
        Ok(())
    }
}

impl DatabaseConfig {
    fn from_source<F: Fn(&str) -> Option<String>>(lookup: &F) -> Self {
        let url = lookup("DATABASE_URL").unwrap_or_else(|| "sqlite:flashcards.db".to_string());

        DatabaseConfig { url }
    }
}

impl LLMConfig {
    fn from_source<F: Fn(&str) -> Option<String>>(lookup: &F) -> Self {
        let api_key = non_empty(lookup("LLM_API_KEY"));
        let base_url = non_empty(lookup("LLM_BASE_URL"));
        let model = non_empty(lookup("LLM_MODEL"));

        let provider_str = lookup("LLM_PROVIDER").unwrap_or_else(|| "gemini".to_string());
        let provider = LLMProviderType::parse(&provider_str).unwrap_or_else(|| {
            info!("Unknown LLM provider '{}', defaulting to Gemini", provider_str);
            LLMProviderType::Gemini
        });

        LLMConfig {
            api_key,
            base_url,
            provider,
            model,
        }
    }
}

impl PdfParserConfig {
    fn from_source<F: Fn(&str) -> Option<String>>(lookup: &F) -> Result<Self> {
        let api_key = non_empty(lookup("PDF_PARSER_API_KEY"))
            .or_else(|| non_empty(lookup("LLAMA_CLOUD_API_KEY")));

        let base_url = lookup("PDF_PARSER_BASE_URL")
            .unwrap_or_else(|| "https://api.cloud.llamaindex.ai".to_string());

        Ok(PdfParserConfig {
            api_key,
            base_url,
            poll_interval_ms: parse_number(lookup, "PDF_PARSER_POLL_INTERVAL_MS", 3000)?,
            max_poll_interval_ms: parse_number(lookup, "PDF_PARSER_MAX_POLL_INTERVAL_MS", 15000)?,
            timeout_secs: parse_number(lookup, "PDF_PARSER_TIMEOUT_SECS", 300)?,
        })
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            initial_interval: Duration::from_millis(self.poll_interval_ms),
            max_interval: Duration::from_millis(self.max_poll_interval_ms),
            timeout: Duration::from_secs(self.timeout_secs),
            ..PollPolicy::default()
        }
    }
}

impl ServerConfig {
    fn from_source<F: Fn(&str) -> Option<String>>(lookup: &F) -> Result<Self> {
        let port_str = lookup("PORT").unwrap_or_else(|| "8000".to_string());

        let port = port_str.parse::<u16>().map_err(|_| {
            anyhow!("Invalid PORT value: '{}'. Must be a number between 1-65535", port_str)
        })?;

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        Ok(ServerConfig { port, host })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl LoggingConfig {
    fn from_source<F: Fn(&str) -> Option<String>>(lookup: &F) -> Self {
        let level = lookup("RUST_LOG").unwrap_or_else(|| "info,flashcard_study=debug".to_string());

        let file_enabled = lookup("LOG_FILE_ENABLED")
            .and_then(|value| value.parse::<bool>().ok())
            .unwrap_or(true);

        let console_enabled = lookup("LOG_CONSOLE_ENABLED")
            .and_then(|value| value.parse::<bool>().ok())
            .unwrap_or(true);

        let log_directory = lookup("LOG_DIRECTORY").unwrap_or_else(|| "logs".to_string());

        LoggingConfig {
            level,
            file_enabled,
            console_enabled,
            log_directory,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_number<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: u64) -> Result<u64> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| anyhow!("Invalid {} value: '{}'. Must be a non-negative integer", key, raw)),
        None => Ok(default),
    }
}

/// Mask sensitive data in configuration for safe logging
pub fn mask_sensitive_data(data: &str) -> String {
    let chars: Vec<char> = data.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}***{}", head, tail)
    }
}
