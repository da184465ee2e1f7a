// 数据模型：Agent / Step 定义与 Run / StepRun 记录

mod action;
mod agent;
mod dataset;
mod run;

pub use action::{ActionKind, DecisionType, NextAction};
pub use agent::{Agent, CheckSpec, Condition, Step, StepType};
pub use dataset::Dataset;
pub use run::{Annotation, CheckResult, Run, RunStatus, StepRun, StepRunStatus, StopReason};
