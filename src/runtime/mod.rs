// 运行时执行引擎模块

mod batch;
mod decision;
mod executor;
mod invoker;
mod types;

pub use batch::{BatchReport, BatchRunner};
pub use decision::{condition_prompt, Decision, DecisionResolver, CONDITION_OUTPUT_LIMIT};
pub use executor::{seed_context, RunExecutor};
pub use invoker::ModelInvoker;
pub use types::{RunContext, RunOutcome};
