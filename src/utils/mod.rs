/// 工具模块 - 日志与定义校验
pub mod logging;
pub mod validation;

pub use logging::LoggingConfig;
pub use validation::DefinitionValidator;
