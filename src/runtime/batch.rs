use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use super::executor::RunExecutor;
use super::types::RunOutcome;
use crate::error::Result;
use crate::model::{Dataset, RunStatus};

/// 批量执行汇总，`runs` 与 case 顺序一致
///
/// 未能产生 Run 的 case（例如创建 Run 时存储出错）记录在 `errors` 中，同样计入 `failed`。
#[derive(Clone, Debug)]
pub struct BatchReport {
    pub dataset_id: String,
    pub runs: Vec<RunOutcome>,
    pub errors: Vec<(usize, String)>,
    pub completed: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn run_ids(&self) -> Vec<String> {
        self.runs.iter().map(|outcome| outcome.run.id.clone()).collect()
    }
}

/// 数据集批量执行：每个 case 独立产生一个 Run，单个 case 失败不影响其他 case
pub struct BatchRunner {
    executor: RunExecutor,
    max_concurrency: usize,
}

impl BatchRunner {
    pub fn new(executor: RunExecutor) -> Self {
        Self {
            executor,
            max_concurrency: 1,
        }
    }

    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit.max(1);
        self
    }

    /// 只有 Agent 不存在会让整个批次失败；其余 case 级错误都收进报告
    pub async fn run_dataset(&self, dataset: &Dataset) -> Result<BatchReport> {
        self.executor.load_agent(&dataset.agent_id).await?;
        info!(
            dataset = %dataset.name,
            cases = dataset.cases.len(),
            concurrency = self.max_concurrency,
            "batch started"
        );

        let results: Vec<Result<RunOutcome>> = stream::iter(dataset.cases.iter().enumerate())
            .map(|(case_index, case)| {
                self.executor
                    .run_case(&dataset.agent_id, &dataset.id, case_index, case.clone())
            })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let mut runs = Vec::with_capacity(results.len());
        let mut errors = Vec::new();
        for (case_index, result) in results.into_iter().enumerate() {
            match result {
                Ok(outcome) => runs.push(outcome),
                Err(err) => {
                    warn!(dataset = %dataset.name, case_index, error = %err, "case did not start");
                    errors.push((case_index, err.to_string()));
                }
            }
        }

        let failed_runs = runs
            .iter()
            .filter(|outcome| outcome.run.status == RunStatus::Failed)
            .count();
        let failed = failed_runs + errors.len();
        if failed > 0 {
            warn!(dataset = %dataset.name, failed, "batch finished with failed cases");
        }

        Ok(BatchReport {
            dataset_id: dataset.id.clone(),
            completed: runs.len() - failed_runs,
            failed,
            runs,
            errors,
        })
    }
}
