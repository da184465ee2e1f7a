// 配置模块：环境变量与引擎默认值

mod engine;
mod env;

pub use engine::EngineConfig;
pub use env::EnvConfig;
