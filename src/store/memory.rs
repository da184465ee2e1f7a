use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::{AgentReader, RunStore};
use crate::error::{AgentRunError, Result};
use crate::model::{Agent, Annotation, Run, StepRun};

#[derive(Default, Serialize, Deserialize)]
struct StoreState {
    #[serde(default)]
    agents: HashMap<String, Agent>,
    #[serde(default)]
    runs: HashMap<String, Run>,
    #[serde(default)]
    step_runs: HashMap<String, BTreeMap<usize, StepRun>>,
}

/// 内存存储实现，可整体快照为 JSON 文件
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册 Agent 定义（步骤按下标排序）
    pub fn insert_agent(&self, mut agent: Agent) {
        agent.sort_steps();
        self.inner.write().agents.insert(agent.id.clone(), agent);
    }

    pub fn agents(&self) -> Vec<Agent> {
        self.inner.read().agents.values().cloned().collect()
    }

    pub fn load_snapshot(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let state: StoreState = serde_json::from_str(&raw)?;
        Ok(Self {
            inner: RwLock::new(state),
        })
    }

    /// 文件不存在时返回空存储
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_snapshot(path)
        } else {
            Ok(Self::new())
        }
    }

    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(&*self.inner.read())?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[async_trait]
impl AgentReader for MemoryStore {
    async fn get_agent_with_steps(&self, agent_id: &str) -> Result<Option<Agent>> {
        Ok(self.inner.read().agents.get(agent_id).cloned().map(|mut agent| {
            agent.sort_steps();
            agent
        }))
    }
}

#[async_trait]
impl RunStore for MemoryStore {
    async fn create_run(&self, run: &Run) -> Result<()> {
        let mut state = self.inner.write();
        if state.runs.contains_key(&run.id) {
            return Err(AgentRunError::store(format!("run `{}` already exists", run.id)));
        }
        state.runs.insert(run.id.clone(), run.clone());
        state.step_runs.entry(run.id.clone()).or_default();
        Ok(())
    }

    async fn get_run(&self, run_id: &str) -> Result<Option<Run>> {
        Ok(self.inner.read().runs.get(run_id).cloned())
    }

    async fn update_run(&self, run: &Run) -> Result<()> {
        let mut state = self.inner.write();
        let slot = state
            .runs
            .get_mut(&run.id)
            .ok_or_else(|| AgentRunError::RunNotFound(run.id.clone()))?;
        *slot = run.clone();
        Ok(())
    }

    async fn find_or_create_step_run(&self, draft: StepRun) -> Result<StepRun> {
        let mut state = self.inner.write();
        if !state.runs.contains_key(&draft.run_id) {
            return Err(AgentRunError::RunNotFound(draft.run_id));
        }
        let rows = state.step_runs.entry(draft.run_id.clone()).or_default();
        Ok(rows.entry(draft.order_index).or_insert(draft).clone())
    }

    async fn update_step_run(&self, step_run: &StepRun) -> Result<()> {
        let mut state = self.inner.write();
        let slot = state
            .step_runs
            .get_mut(&step_run.run_id)
            .and_then(|rows| rows.get_mut(&step_run.order_index))
            .ok_or_else(|| {
                AgentRunError::store(format!(
                    "step run {} of run `{}` not found",
                    step_run.order_index, step_run.run_id
                ))
            })?;
        *slot = step_run.clone();
        Ok(())
    }

    async fn list_step_runs(&self, run_id: &str) -> Result<Vec<StepRun>> {
        Ok(self
            .inner
            .read()
            .step_runs
            .get(run_id)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_runs(&self, agent_id: Option<&str>) -> Result<Vec<Run>> {
        let state = self.inner.read();
        let mut runs: Vec<Run> = state
            .runs
            .values()
            .filter(|run| agent_id.map_or(true, |id| run.agent_id == id))
            .cloned()
            .collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(runs)
    }

    async fn annotate_run(&self, run_id: &str, annotation: &Annotation) -> Result<Run> {
        let mut state = self.inner.write();
        let run = state
            .runs
            .get_mut(run_id)
            .ok_or_else(|| AgentRunError::RunNotFound(run_id.to_string()))?;
        run.annotate(annotation)?;
        Ok(run.clone())
    }

    async fn delete_run(&self, run_id: &str) -> Result<()> {
        let mut state = self.inner.write();
        state.runs.remove(run_id);
        state.step_runs.remove(run_id);
        Ok(())
    }
}
