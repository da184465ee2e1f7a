use async_trait::async_trait;

use super::client::LlmClient;
use super::types::{GenerateOptions, Generation};
use crate::error::Result;

/// 本地回显客户端，不产生用量
#[derive(Default, Clone)]
pub struct LocalEchoClient;

#[async_trait]
impl LlmClient for LocalEchoClient {
    async fn generate(&self, prompt: &str, _options: &GenerateOptions) -> Result<Generation> {
        Ok(Generation {
            content: format!("[Echo] {}", prompt),
            ..Generation::default()
        })
    }
}
