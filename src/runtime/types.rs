use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{Run, RunStatus, StepRun};

/// 一次执行的共享上下文：输入变量与已完成 action 步骤的输出
pub type RunContext = BTreeMap<String, String>;

/// 执行结果：最终 Run、其全部 StepRun，以及失败时的原始错误消息
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub run: Run,
    pub step_runs: Vec<StepRun>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunOutcome {
    pub fn is_failed(&self) -> bool {
        self.run.status == RunStatus::Failed
    }

    pub fn step_run(&self, order_index: usize) -> Option<&StepRun> {
        self.step_runs
            .iter()
            .find(|row| row.order_index == order_index)
    }

    pub fn executed_indices(&self) -> Vec<usize> {
        self.step_runs.iter().map(|row| row.order_index).collect()
    }
}
