use crate::config::settings::ProviderSettings;
use crate::llm::client::{LLMError, TextGenerator};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Vec<Part>,
}

/// Google Gemini generateContent backend
pub struct GeminiClient {
    api_key: String,
    settings: ProviderSettings,
    http_client: Client,
}

impl GeminiClient {
    pub fn new(api_key: String, settings: ProviderSettings) -> Result<Self, LLMError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_seconds))
            .build()?;

        Ok(Self {
            api_key,
            settings,
            http_client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{GEMINI_API_BASE}/{}:generateContent", self.settings.model)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, LLMError> {
        let request_body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_tokens,
            },
        };

        let response = self
            .http_client
            .post(self.endpoint())
            .query(&[("key", &self.api_key)])
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if status.as_u16() == 429 {
            return Err(LLMError::RateLimited(60));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LLMError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let api_response: GenerateResponse = response.json().await?;
        api_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| LLMError::InvalidResponse("no candidates in response".to_string()))
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_construction() {
        let client =
            GeminiClient::new("test-key".to_string(), ProviderSettings::default_gemini()).unwrap();
        assert_eq!(client.name(), "gemini");
    }

    #[test]
    fn test_endpoint_includes_model() {
        let client =
            GeminiClient::new("test-key".to_string(), ProviderSettings::default_gemini()).unwrap();
        assert!(client.endpoint().contains(":generateContent"));
    }
}
