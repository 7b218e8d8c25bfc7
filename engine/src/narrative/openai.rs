// Text completions over the OpenAI HTTP API
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::settings::NarrativeSettings;
use crate::error::EngineError;
use crate::narrative::NarrativeGenerator;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: String,
}

pub struct OpenAiCompletions {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    api_key: Option<String>,
}

impl OpenAiCompletions {
    pub fn new(client: Client, settings: &NarrativeSettings) -> Self {
        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            api_key: settings.api_key.clone(),
        }
    }

    pub fn completions_url(&self) -> String {
        format!("{}/v1/completions", self.base_url)
    }
}

#[async_trait]
impl NarrativeGenerator for OpenAiCompletions {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, EngineError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| EngineError::GenerationFailed("No API key configured".to_string()))?;

        let request = CompletionRequest {
            model: &self.model,
            prompt,
            max_tokens,
            temperature: self.temperature,
        };
        tracing::debug!(model = %self.model, max_tokens, prompt_chars = prompt.len(), "Requesting completion");

        let response: CompletionResponse = self
            .client
            .post(self.completions_url())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| EngineError::GenerationFailed(format!("Completion request failed: {}", e)))?
            .json()
            .await
            .map_err(|e| EngineError::GenerationFailed(format!("Completion response could not be decoded: {}", e)))?;

        extract_text(response)
    }
}

fn extract_text(response: CompletionResponse) -> Result<String, EngineError> {
    response
        .choices
        .into_iter()
        .next()
        .map(|c| c.text.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| EngineError::GenerationFailed("Completion returned no text".to_string()))
}
