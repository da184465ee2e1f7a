use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::{AgentRunError, Result};
use crate::llm::{DynLlmClient, GenerateOptions, Generation};

/// 模型调用入口：所有挂起点都经过这里，可选超时
#[derive(Clone)]
pub struct ModelInvoker {
    client: DynLlmClient,
    timeout: Option<Duration>,
}

impl ModelInvoker {
    pub fn new(client: DynLlmClient, timeout: Option<Duration>) -> Self {
        Self { client, timeout }
    }

    pub fn client(&self) -> DynLlmClient {
        Arc::clone(&self.client)
    }

    pub async fn invoke(&self, prompt: &str, options: &GenerateOptions) -> Result<Generation> {
        debug!(
            model = options.model.as_deref().unwrap_or("default"),
            prompt_len = prompt.len(),
            "invoking model"
        );
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.client.generate(prompt, options))
                .await
                .map_err(|_| AgentRunError::Timeout(limit.as_millis() as u64))?,
            None => self.client.generate(prompt, options).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::llm::{LlmClient, LocalEchoClient};

    struct SlowClient;

    #[async_trait]
    impl LlmClient for SlowClient {
        async fn generate(&self, _prompt: &str, _options: &GenerateOptions) -> Result<Generation> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Generation::default())
        }
    }

    #[tokio::test]
    async fn passes_through_without_timeout() {
        let invoker = ModelInvoker::new(Arc::new(LocalEchoClient), None);
        let generation = invoker
            .invoke("ping", &GenerateOptions::default())
            .await
            .unwrap();
        assert_eq!(generation.content, "[Echo] ping");
    }

    #[tokio::test]
    async fn elapsed_timeout_is_an_error() {
        let invoker = ModelInvoker::new(Arc::new(SlowClient), Some(Duration::from_millis(10)));
        let err = invoker
            .invoke("ping", &GenerateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentRunError::Timeout(10)));
    }
}
