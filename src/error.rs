use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentRunError>;

#[derive(Debug, Error)]
pub enum AgentRunError {
    #[error("agent `{0}` not found")]
    AgentNotFound(String),
    #[error("run `{0}` not found")]
    RunNotFound(String),
    /// 模型调用失败，消息原样透出
    #[error("{0}")]
    Invocation(String),
    #[error("model invocation timed out after {0} ms")]
    Timeout(u64),
    #[error("store error: {0}")]
    Store(String),
    #[error("invalid annotation: {0}")]
    InvalidAnnotation(String),
    #[error("invalid agent definition: {0}")]
    Definition(String),
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AgentRunError {
    pub fn invocation(msg: impl Into<String>) -> Self {
        AgentRunError::Invocation(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        AgentRunError::Store(msg.into())
    }
}
