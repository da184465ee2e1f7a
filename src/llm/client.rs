use std::sync::Arc;

use async_trait::async_trait;

use super::types::{GenerateOptions, Generation};
use crate::error::Result;

/// 模型调用能力：给定 prompt 与生成参数，返回文本与用量
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<Generation>;
}

pub type DynLlmClient = Arc<dyn LlmClient>;
