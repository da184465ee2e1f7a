use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use super::{AgentReader, RunStore};
use crate::error::{AgentRunError, Result};
use crate::model::{Agent, Annotation, Run, StepRun};

const PREFIX: &str = "agentrun";

fn agent_key(agent_id: &str) -> String {
    format!("{PREFIX}:agent:{agent_id}")
}

fn run_key(run_id: &str) -> String {
    format!("{PREFIX}:run:{run_id}")
}

fn runs_index_key() -> String {
    format!("{PREFIX}:runs")
}

fn step_run_key(run_id: &str, order_index: usize) -> String {
    format!("{PREFIX}:run:{run_id}:step:{order_index}")
}

fn step_index_key(run_id: &str) -> String {
    format!("{PREFIX}:run:{run_id}:steps")
}

fn store_err(e: redis::RedisError) -> AgentRunError {
    AgentRunError::Store(e.to_string())
}

/// Redis 存储：所有记录以 JSON 字符串保存
pub struct RedisStore {
    client: redis::Client,
}

impl RedisStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    pub fn open(url: &str) -> Result<Self> {
        Ok(Self::new(redis::Client::open(url).map_err(store_err)?))
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(store_err)
    }

    pub async fn insert_agent(&self, mut agent: Agent) -> Result<()> {
        agent.sort_steps();
        let mut conn = self.connection().await?;
        let _: () = conn
            .set(agent_key(&agent.id), serde_json::to_string(&agent)?)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        conn: &mut MultiplexedConnection,
        key: &str,
    ) -> Result<Option<T>> {
        let raw: Option<String> = conn.get(key).await.map_err(store_err)?;
        raw.map(|raw| serde_json::from_str(&raw).map_err(AgentRunError::from))
            .transpose()
    }
}

#[async_trait]
impl AgentReader for RedisStore {
    async fn get_agent_with_steps(&self, agent_id: &str) -> Result<Option<Agent>> {
        let mut conn = self.connection().await?;
        let agent: Option<Agent> = Self::read_json(&mut conn, &agent_key(agent_id)).await?;
        Ok(agent.map(|mut agent| {
            agent.sort_steps();
            agent
        }))
    }
}

#[async_trait]
impl RunStore for RedisStore {
    async fn create_run(&self, run: &Run) -> Result<()> {
        let mut conn = self.connection().await?;
        let created: bool = conn
            .set_nx(run_key(&run.id), serde_json::to_string(run)?)
            .await
            .map_err(store_err)?;
        if !created {
            return Err(AgentRunError::store(format!("run `{}` already exists", run.id)));
        }
        let _: () = conn
            .sadd(runs_index_key(), &run.id)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn get_run(&self, run_id: &str) -> Result<Option<Run>> {
        let mut conn = self.connection().await?;
        Self::read_json(&mut conn, &run_key(run_id)).await
    }

    async fn update_run(&self, run: &Run) -> Result<()> {
        let mut conn = self.connection().await?;
        let exists: bool = conn.exists(run_key(&run.id)).await.map_err(store_err)?;
        if !exists {
            return Err(AgentRunError::RunNotFound(run.id.clone()));
        }
        let _: () = conn
            .set(run_key(&run.id), serde_json::to_string(run)?)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn find_or_create_step_run(&self, draft: StepRun) -> Result<StepRun> {
        let mut conn = self.connection().await?;
        let key = step_run_key(&draft.run_id, draft.order_index);
        let created: bool = conn
            .set_nx(&key, serde_json::to_string(&draft)?)
            .await
            .map_err(store_err)?;
        if created {
            let _: () = conn
                .sadd(step_index_key(&draft.run_id), draft.order_index)
                .await
                .map_err(store_err)?;
            return Ok(draft);
        }
        Self::read_json(&mut conn, &key)
            .await?
            .ok_or_else(|| AgentRunError::store(format!("step run `{key}` vanished")))
    }

    async fn update_step_run(&self, step_run: &StepRun) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = conn
            .set(
                step_run_key(&step_run.run_id, step_run.order_index),
                serde_json::to_string(step_run)?,
            )
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn list_step_runs(&self, run_id: &str) -> Result<Vec<StepRun>> {
        let mut conn = self.connection().await?;
        let mut indices: Vec<usize> = conn
            .smembers(step_index_key(run_id))
            .await
            .map_err(store_err)?;
        indices.sort_unstable();

        let mut rows = Vec::with_capacity(indices.len());
        for index in indices {
            if let Some(row) = Self::read_json(&mut conn, &step_run_key(run_id, index)).await? {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    async fn list_runs(&self, agent_id: Option<&str>) -> Result<Vec<Run>> {
        let mut conn = self.connection().await?;
        let ids: Vec<String> = conn.smembers(runs_index_key()).await.map_err(store_err)?;

        let mut runs = Vec::new();
        for id in ids {
            let run: Option<Run> = Self::read_json(&mut conn, &run_key(&id)).await?;
            if let Some(run) = run.filter(|run| agent_id.map_or(true, |a| run.agent_id == a)) {
                runs.push(run);
            }
        }
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(runs)
    }

    async fn annotate_run(&self, run_id: &str, annotation: &Annotation) -> Result<Run> {
        let mut run = self
            .get_run(run_id)
            .await?
            .ok_or_else(|| AgentRunError::RunNotFound(run_id.to_string()))?;
        run.annotate(annotation)?;
        self.update_run(&run).await?;
        Ok(run)
    }

    async fn delete_run(&self, run_id: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let indices: Vec<usize> = conn
            .smembers(step_index_key(run_id))
            .await
            .map_err(store_err)?;
        let mut keys: Vec<String> = indices
            .into_iter()
            .map(|index| step_run_key(run_id, index))
            .collect();
        keys.push(step_index_key(run_id));
        keys.push(run_key(run_id));
        let _: () = conn.del(keys).await.map_err(store_err)?;
        let _: () = conn
            .srem(runs_index_key(), run_id)
            .await
            .map_err(store_err)?;
        Ok(())
    }
}
