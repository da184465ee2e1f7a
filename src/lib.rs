pub mod config;
pub mod error;
pub mod llm;
pub mod loader;
pub mod model;
pub mod runtime;
pub mod services;
pub mod store;
pub mod utils;

pub use config::{EngineConfig, EnvConfig};
pub use error::{AgentRunError, Result};
#[cfg(feature = "openai-client")]
pub use llm::OpenAiClient;
pub use llm::{
    DynLlmClient, GenerateOptions, Generation, LlmClient, LocalEchoClient, ModelPricing,
    ScriptedClient, Usage,
};
pub use loader::{load_agent_from_path, load_agent_from_str, load_cases_from_path};
pub use model::{
    ActionKind, Agent, Annotation, CheckResult, CheckSpec, Condition, Dataset, DecisionType,
    NextAction, Run, RunStatus, Step, StepRun, StepRunStatus, StepType, StopReason,
};
pub use runtime::{BatchReport, BatchRunner, RunContext, RunExecutor, RunOutcome};
pub use services::{DecisionParser, OutputChecker, TemplateRenderer};
#[cfg(feature = "redis-store")]
pub use store::RedisStore;
pub use store::{AgentReader, MemoryStore, RunStore};
pub use utils::logging;
