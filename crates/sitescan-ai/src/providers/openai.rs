use crate::generator::{FixRecommendation, RecommendationGenerator, RecommendationInput};
use crate::models::{ChatMessage, ChatRequest, ChatResponse};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

/// OpenAI-compatible chat completion provider. Works against any endpoint
/// speaking the `/chat/completions` protocol.
#[derive(Clone)]
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
    max_tokens: Option<usize>,
    temperature: Option<f32>,
}

impl OpenAiProvider {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        timeout_secs: Option<u64>,
        max_tokens: Option<usize>,
        temperature: Option<f32>,
    ) -> Result<Self> {
        let timeout = timeout_secs.unwrap_or(60);
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout))
            .build()?;

        Ok(Self {
            api_key,
            model: model.unwrap_or_else(|| "gpt-4o-mini".to_string()),
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            client,
            max_tokens,
            temperature,
        })
    }

    async fn call_api(&self, prompt: &str) -> Result<String> {
        let req = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "You are a senior web performance and accessibility consultant. \
                              You answer with a single JSON object and nothing else."
                        .to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        tracing::debug!(
            model = %self.model,
            prompt_length = prompt.len(),
            "Calling recommendation API"
        );

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&req)
            .send()
            .await
            .context("Failed to send request to recommendation API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %body,
                "Recommendation API returned an error"
            );
            anyhow::bail!("Recommendation API error ({status}): {body}");
        }

        let chat: ChatResponse = resp
            .json()
            .await
            .context("Failed to decode recommendation API response")?;
        let choice = chat
            .choices
            .into_iter()
            .next()
            .context("Recommendation API response contained no choices")?;
        Ok(choice.message.content)
    }
}

#[async_trait]
impl RecommendationGenerator for OpenAiProvider {
    fn provider(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, input: &RecommendationInput) -> Result<FixRecommendation> {
        let prompt = crate::prompt::build_recommendation_prompt(input);
        let reply = self.call_api(&prompt).await?;
        crate::prompt::parse_recommendation(&reply)
    }
}
