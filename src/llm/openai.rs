use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::instrument;

use super::client::LlmClient;
use super::types::{GenerateOptions, Generation, ModelPricing};
use crate::config::EngineConfig;
use crate::error::{AgentRunError, Result};

/// OpenAI 兼容的 chat/completions 客户端
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    default_model: String,
    default_temperature: f32,
    pricing: ModelPricing,
}

impl OpenAiClient {
    pub fn new<S1, S2>(api_key: S1, model: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self::with_base_url("https://api.openai.com/v1", api_key, model)
    }

    pub fn with_base_url<S1, S2, S3>(base_url: S1, api_key: S2, model: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            default_model: model.into(),
            default_temperature: EngineConfig::DEFAULT_TEMPERATURE,
            pricing: ModelPricing::default(),
        }
    }

    pub fn from_config(config: &EngineConfig, api_key: impl Into<String>) -> Self {
        let mut client =
            Self::with_base_url(config.base_url.clone(), api_key, config.default_model.clone());
        client.default_temperature = config.default_temperature;
        client
    }

    pub fn with_pricing(mut self, pricing: ModelPricing) -> Self {
        self.pricing = pricing;
        self
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    #[instrument(skip(self, prompt))]
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<Generation> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let model = options
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        let mut body = json!({
            "model": model,
            "temperature": options.temperature.unwrap_or(self.default_temperature),
            "messages": [{ "role": "user", "content": prompt }],
        });
        if let Some(max_tokens) = options.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        let start = Instant::now();
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentRunError::invocation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AgentRunError::invocation(format!(
                "{} {}",
                status,
                text.trim()
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| AgentRunError::invocation(e.to_string()))?;
        let latency_ms = start.elapsed().as_millis() as u64;

        let content = payload["choices"]
            .get(0)
            .and_then(|choice| choice["message"]["content"].as_str())
            .unwrap_or_default()
            .to_string();
        let prompt_tokens = payload["usage"]["prompt_tokens"].as_u64().unwrap_or(0);
        let completion_tokens = payload["usage"]["completion_tokens"].as_u64().unwrap_or(0);

        Ok(Generation {
            content,
            prompt_tokens,
            completion_tokens,
            latency_ms,
            cost: self.pricing.cost(&model, prompt_tokens, completion_tokens),
        })
    }
}
