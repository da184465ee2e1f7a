mod client;
mod echo;
mod scripted;
mod types;

#[cfg(feature = "openai-client")]
mod openai;

pub use client::{DynLlmClient, LlmClient};
pub use echo::LocalEchoClient;
#[cfg(feature = "openai-client")]
pub use openai::OpenAiClient;
pub use scripted::{RecordedCall, ScriptedClient};
pub use types::{GenerateOptions, Generation, ModelPrice, ModelPricing, Usage};
