//! Report generation abstraction
//!
//! Provides a unified interface over research report providers:
//! - OpenAI chat completions (gpt-4 by default)
//! - Mock generator for tests and local development
//!
//! Generation is a single attempt per request. A failed attempt surfaces as
//! an error and the polling loop records it; there is no retry layer here.

use crate::config::GeneratorConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You are a skilled research assistant.";

/// Build the report prompt for a research topic.
fn research_prompt(topic: &str) -> String {
    format!(
        "Deep research on \"{topic}\":\n\n\
         1) Executive summary\n\
         2) Key insights\n\
         3) Further reading\n"
    )
}

/// Trait for research report generation
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a research report for a topic
    async fn generate(&self, topic: &str) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// OpenAI chat completion client
pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    base_url: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl OpenAiGenerator {
    /// Create a new OpenAI generator from configuration
    pub fn from_config(config: &GeneratorConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| AppError::Configuration {
            message: "generator.api_key must be set for the openai provider".to_string(),
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
        })
    }

    async fn make_request(&self, topic: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: research_prompt(topic),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::GenerationError {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::GenerationError {
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| AppError::GenerationError {
                    message: format!("Failed to parse response: {}", e),
                })?;

        result
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| AppError::GenerationError {
                message: "Empty completion from provider".to_string(),
            })
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, topic: &str) -> Result<String> {
        self.make_request(topic).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Mock generator for testing
pub struct MockGenerator {
    response: Option<String>,
    fail: bool,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            response: None,
            fail: false,
        }
    }

    /// Return a fixed report for every topic
    pub fn with_response(report: impl Into<String>) -> Self {
        Self {
            response: Some(report.into()),
            fail: false,
        }
    }

    /// Fail every generation attempt
    pub fn failing() -> Self {
        Self {
            response: None,
            fail: true,
        }
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, topic: &str) -> Result<String> {
        if self.fail {
            return Err(AppError::GenerationError {
                message: "mock generation failure".to_string(),
            });
        }
        Ok(self
            .response
            .clone()
            .unwrap_or_else(|| format!("Mock research report on \"{topic}\"")))
    }

    fn model_name(&self) -> &str {
        "mock-research"
    }
}

/// Create a generator based on configuration
pub fn create_generator(config: &GeneratorConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiGenerator::from_config(config)?)),
        "mock" => Ok(Arc::new(MockGenerator::new())),
        other => Err(AppError::Configuration {
            message: format!("Unknown generator provider: {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_shape() {
        let prompt = research_prompt("supply chain forecasting");
        assert!(prompt.starts_with("Deep research on \"supply chain forecasting\":"));
        assert!(prompt.contains("1) Executive summary"));
        assert!(prompt.contains("2) Key insights"));
        assert!(prompt.contains("3) Further reading"));
    }

    #[tokio::test]
    async fn test_mock_generator() {
        let generator = MockGenerator::new();
        let report = generator.generate("rust async runtimes").await.unwrap();
        assert!(report.contains("rust async runtimes"));
    }

    #[tokio::test]
    async fn test_mock_fixed_response() {
        let generator = MockGenerator::with_response("Report A");
        assert_eq!(generator.generate("anything").await.unwrap(), "Report A");
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let generator = MockGenerator::failing();
        let err = generator.generate("anything").await.unwrap_err();
        assert!(matches!(err, AppError::GenerationError { .. }));
    }

    #[test]
    fn test_create_generator_rejects_unknown_provider() {
        let config = GeneratorConfig {
            provider: "palantir".to_string(),
            ..test_config()
        };
        assert!(create_generator(&config).is_err());
    }

    #[test]
    fn test_create_generator_requires_openai_key() {
        let config = GeneratorConfig {
            provider: "openai".to_string(),
            api_key: None,
            ..test_config()
        };
        assert!(create_generator(&config).is_err());
    }

    #[test]
    fn test_create_mock_generator() {
        let config = GeneratorConfig {
            provider: "mock".to_string(),
            ..test_config()
        };
        let generator = create_generator(&config).unwrap();
        assert_eq!(generator.model_name(), "mock-research");
    }

    fn test_config() -> GeneratorConfig {
        GeneratorConfig {
            provider: "mock".to_string(),
            api_key: None,
            api_base: None,
            model: "gpt-4".to_string(),
            max_tokens: 1500,
            temperature: 0.7,
            timeout_secs: 30,
        }
    }
}
