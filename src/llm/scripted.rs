use async_trait::async_trait;
use parking_lot::Mutex;

use super::client::LlmClient;
use super::types::{GenerateOptions, Generation};
use crate::error::Result;

type Responder = Box<dyn Fn(&str, &GenerateOptions) -> Result<String> + Send + Sync>;

/// 一次被记录的调用
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedCall {
    pub prompt: String,
    pub options: GenerateOptions,
}

/// 脚本化客户端：回复由闭包根据 prompt 生成，并记录每次调用
///
/// 用于测试与离线演练，每次调用按固定用量计费。
pub struct ScriptedClient {
    responder: Responder,
    calls: Mutex<Vec<RecordedCall>>,
    prompt_tokens: u64,
    completion_tokens: u64,
    latency_ms: u64,
    cost: f64,
}

impl ScriptedClient {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, &GenerateOptions) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
            prompt_tokens: 0,
            completion_tokens: 0,
            latency_ms: 0,
            cost: 0.0,
        }
    }

    pub fn with_usage(
        mut self,
        prompt_tokens: u64,
        completion_tokens: u64,
        latency_ms: u64,
        cost: f64,
    ) -> Self {
        self.prompt_tokens = prompt_tokens;
        self.completion_tokens = completion_tokens;
        self.latency_ms = latency_ms;
        self.cost = cost;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// prompt 中包含 `needle` 的调用次数
    pub fn calls_containing(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.prompt.contains(needle))
            .count()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<Generation> {
        self.calls.lock().push(RecordedCall {
            prompt: prompt.to_string(),
            options: options.clone(),
        });
        let content = (self.responder)(prompt, options)?;
        Ok(Generation {
            content,
            prompt_tokens: self.prompt_tokens,
            completion_tokens: self.completion_tokens,
            latency_ms: self.latency_ms,
            cost: self.cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentRunError;

    #[tokio::test]
    async fn records_calls_and_usage() {
        let client = ScriptedClient::new(|prompt, _| Ok(prompt.to_uppercase()))
            .with_usage(10, 5, 20, 0.01);
        let generation = client
            .generate("abc", &GenerateOptions::judge(Some("m")))
            .await
            .unwrap();
        assert_eq!(generation.content, "ABC");
        assert_eq!(generation.total_tokens(), 15);
        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].options.temperature, Some(0.0));
        assert_eq!(calls[0].options.model.as_deref(), Some("m"));
    }

    #[tokio::test]
    async fn responder_errors_propagate() {
        let client = ScriptedClient::new(|_, _| Err(AgentRunError::invocation("boom")));
        let err = client
            .generate("x", &GenerateOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(client.call_count(), 1);
    }
}
