use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;

use super::prompt::{self, ContextPassage};
use super::{GenerationError, GenerationProvider, ProbeStatus};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Token budget for the follow-up suggestion call
const FOLLOW_UP_MAX_TOKENS: u32 = 200;
const FOLLOW_UP_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Answer generation backed by the Gemini `generateContent` API
pub struct GeminiGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_output_tokens: u32,
    temperature: f32,
    max_context_tokens: usize,
}

impl GeminiGenerator {
    pub fn new(config: &Config) -> Result<Self, GenerationError> {
        if config.google_api_key.is_empty() {
            return Err(GenerationError::ConfigError(
                "GOOGLE_API_KEY is not configured".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.external_request_timeout_secs))
            .build()
            .map_err(|e| {
                GenerationError::ConfigError(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            api_key: config.google_api_key.clone(),
            model: config.gemini_model.clone(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_output_tokens: config.max_tokens,
            temperature: config.temperature,
            max_context_tokens: config.max_context_tokens,
        })
    }

    async fn generate(
        &self,
        prompt: &str,
        max_output_tokens: u32,
        temperature: f32,
    ) -> Result<String, GenerationError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.model
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens,
                temperature,
            },
        };

        debug!("Calling Gemini model {} ({} chars)", self.model, prompt.len());

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::ApiError(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenerationError::ApiError(format!(
                "Gemini API returned {}: {}",
                status, error_text
            )));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::ApiError(format!("Invalid Gemini response: {}", e)))?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        Ok(text)
    }
}

#[async_trait]
impl GenerationProvider for GeminiGenerator {
    async fn generate_answer(
        &self,
        question: &str,
        context: &[ContextPassage],
    ) -> Result<String, GenerationError> {
        let prompt = prompt::build_answer_prompt(question, context, self.max_context_tokens);
        self.generate(&prompt, self.max_output_tokens, self.temperature)
            .await
    }

    async fn suggest_follow_ups(
        &self,
        question: &str,
        context: &[ContextPassage],
    ) -> Result<Vec<String>, GenerationError> {
        if context.is_empty() {
            return Ok(Vec::new());
        }

        let prompt = prompt::build_follow_up_prompt(question, context);
        let text = self
            .generate(&prompt, FOLLOW_UP_MAX_TOKENS, FOLLOW_UP_TEMPERATURE)
            .await?;

        Ok(prompt::parse_follow_up_questions(&text))
    }

    async fn probe(&self) -> ProbeStatus {
        match self.generate("Reply with a single word: ok", 16, 0.0).await {
            Ok(_) => ProbeStatus {
                success: true,
                message: "Gemini API connection successful".to_string(),
                model: self.model.clone(),
            },
            Err(e) => ProbeStatus {
                success: false,
                message: format!("Gemini API connection failed: {}", e),
                model: self.model.clone(),
            },
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
