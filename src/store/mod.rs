// 持久化协作方：Agent 读取与 Run / StepRun 存储

mod memory;
#[cfg(feature = "redis-store")]
mod redis_store;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Agent, Annotation, Run, StepRun};

pub use memory::MemoryStore;
#[cfg(feature = "redis-store")]
pub use redis_store::RedisStore;

/// Agent 定义读取
#[async_trait]
pub trait AgentReader: Send + Sync {
    /// 返回的步骤按 `order_index` 升序
    async fn get_agent_with_steps(&self, agent_id: &str) -> Result<Option<Agent>>;
}

/// Run / StepRun 存储
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn create_run(&self, run: &Run) -> Result<()>;

    async fn get_run(&self, run_id: &str) -> Result<Option<Run>>;

    async fn update_run(&self, run: &Run) -> Result<()>;

    /// 按 (run_id, order_index) 查找，不存在时写入 `draft`
    async fn find_or_create_step_run(&self, draft: StepRun) -> Result<StepRun>;

    async fn update_step_run(&self, step_run: &StepRun) -> Result<()>;

    /// 按 `order_index` 升序
    async fn list_step_runs(&self, run_id: &str) -> Result<Vec<StepRun>>;

    /// 按创建时间倒序
    async fn list_runs(&self, agent_id: Option<&str>) -> Result<Vec<Run>>;

    /// 只修改标注字段，终态 Run 也允许
    async fn annotate_run(&self, run_id: &str, annotation: &Annotation) -> Result<Run>;

    async fn delete_run(&self, run_id: &str) -> Result<()>;
}
