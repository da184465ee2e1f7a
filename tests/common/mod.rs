#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;

use agentrun::{
    AgentRunError, Annotation, MemoryStore, Result, Run, RunStatus, RunStore, StepRun,
};

/// 包装 MemoryStore，按规则注入存储错误
pub struct FaultyStore {
    pub inner: Arc<MemoryStore>,
    fail_create_for_case: Option<usize>,
    fail_completed_update: bool,
}

impl FaultyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            fail_create_for_case: None,
            fail_completed_update: false,
        }
    }

    /// 数据集第 `case_index` 个 case 创建 Run 时失败
    pub fn failing_create_for_case(mut self, case_index: usize) -> Self {
        self.fail_create_for_case = Some(case_index);
        self
    }

    /// 写入 completed 状态的 Run 时失败
    pub fn failing_completed_update(mut self) -> Self {
        self.fail_completed_update = true;
        self
    }
}

#[async_trait]
impl RunStore for FaultyStore {
    async fn create_run(&self, run: &Run) -> Result<()> {
        if self.fail_create_for_case.is_some() && run.case_index == self.fail_create_for_case {
            return Err(AgentRunError::store("transient create failure"));
        }
        self.inner.create_run(run).await
    }

    async fn get_run(&self, run_id: &str) -> Result<Option<Run>> {
        self.inner.get_run(run_id).await
    }

    async fn update_run(&self, run: &Run) -> Result<()> {
        if self.fail_completed_update && run.status == RunStatus::Completed {
            return Err(AgentRunError::store("disk full"));
        }
        self.inner.update_run(run).await
    }

    async fn find_or_create_step_run(&self, draft: StepRun) -> Result<StepRun> {
        self.inner.find_or_create_step_run(draft).await
    }

    async fn update_step_run(&self, step_run: &StepRun) -> Result<()> {
        self.inner.update_step_run(step_run).await
    }

    async fn list_step_runs(&self, run_id: &str) -> Result<Vec<StepRun>> {
        self.inner.list_step_runs(run_id).await
    }

    async fn list_runs(&self, agent_id: Option<&str>) -> Result<Vec<Run>> {
        self.inner.list_runs(agent_id).await
    }

    async fn annotate_run(&self, run_id: &str, annotation: &Annotation) -> Result<Run> {
        self.inner.annotate_run(run_id, annotation).await
    }

    async fn delete_run(&self, run_id: &str) -> Result<()> {
        self.inner.delete_run(run_id).await
    }
}
