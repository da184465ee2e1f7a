// 纯函数服务：模板插值、输出检查、判定文本解析

mod checks;
mod decision_parser;
mod template;

pub use checks::OutputChecker;
pub use decision_parser::DecisionParser;
pub use template::TemplateRenderer;
