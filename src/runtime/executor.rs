use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::decision::DecisionResolver;
use super::invoker::ModelInvoker;
use super::types::{RunContext, RunOutcome};
use crate::config::EngineConfig;
use crate::error::{AgentRunError, Result};
use crate::llm::{DynLlmClient, GenerateOptions};
use crate::model::{Agent, NextAction, Run, Step, StepRun, StepRunStatus, StopReason};
use crate::services::{OutputChecker, TemplateRenderer};
use crate::store::{AgentReader, RunStore};

/// Run 执行器
///
/// 以游标遍历 Agent 的步骤数组：插值、调用模型、检查输出、解析决策，
/// 每一步之后持久化 StepRun 与 Run 状态。同一 Run 只能由一个执行器调用推进。
#[derive(Clone)]
pub struct RunExecutor {
    reader: Arc<dyn AgentReader>,
    store: Arc<dyn RunStore>,
    invoker: ModelInvoker,
    config: EngineConfig,
}

impl RunExecutor {
    pub fn new(
        reader: Arc<dyn AgentReader>,
        store: Arc<dyn RunStore>,
        client: DynLlmClient,
    ) -> Self {
        let config = EngineConfig::default();
        Self {
            reader,
            store,
            invoker: ModelInvoker::new(client, config.step_timeout),
            config,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.invoker = ModelInvoker::new(self.invoker_client(), config.step_timeout);
        self.config = config;
        self
    }

    fn invoker_client(&self) -> DynLlmClient {
        self.invoker.client()
    }

    pub fn store(&self) -> Arc<dyn RunStore> {
        Arc::clone(&self.store)
    }

    /// 从第 0 步执行 Agent
    #[instrument(skip(self, inputs))]
    pub async fn run_agent(&self, agent_id: &str, inputs: RunContext) -> Result<RunOutcome> {
        let agent = self.load_agent(agent_id).await?;
        let run = Run::new(&agent.id);
        self.start(&agent, run, inputs, 0).await
    }

    /// 数据集中的单个 case，Run 记录 dataset 与 case 下标
    #[instrument(skip(self, inputs))]
    pub async fn run_case(
        &self,
        agent_id: &str,
        dataset_id: &str,
        case_index: usize,
        inputs: RunContext,
    ) -> Result<RunOutcome> {
        let agent = self.load_agent(agent_id).await?;
        let run = Run::new(&agent.id).for_case(dataset_id, case_index);
        self.start(&agent, run, inputs, 0).await
    }

    /// 以已有 Run 的前序输出为种子，从 `from_step_index` 开始创建新 Run
    #[instrument(skip(self))]
    pub async fn replay_run(
        &self,
        run_id: &str,
        from_step_index: Option<usize>,
    ) -> Result<RunOutcome> {
        let from = from_step_index.unwrap_or(0);
        let source = self
            .store
            .get_run(run_id)
            .await?
            .ok_or_else(|| AgentRunError::RunNotFound(run_id.to_string()))?;
        let prior = self.store.list_step_runs(&source.id).await?;
        let agent = self.load_agent(&source.agent_id).await?;

        let inputs = seed_context(&agent, &prior, from);
        let run = Run::new(&agent.id).replay_of(&source.id);
        self.start(&agent, run, inputs, from).await
    }

    /// 读取 Agent 定义，不存在时返回 `AgentNotFound`
    pub async fn load_agent(&self, agent_id: &str) -> Result<Agent> {
        self.reader
            .get_agent_with_steps(agent_id)
            .await?
            .ok_or_else(|| AgentRunError::AgentNotFound(agent_id.to_string()))
    }

    async fn start(
        &self,
        agent: &Agent,
        run: Run,
        inputs: RunContext,
        cursor: usize,
    ) -> Result<RunOutcome> {
        self.store.create_run(&run).await?;
        info!(
            run_id = %run.id,
            agent = %agent.name,
            steps = agent.steps.len(),
            from = cursor,
            "run started"
        );
        self.execute(agent, run, inputs, cursor).await
    }

    async fn execute(
        &self,
        agent: &Agent,
        mut run: Run,
        mut context: RunContext,
        mut cursor: usize,
    ) -> Result<RunOutcome> {
        let mut retries: HashMap<usize, u32> = HashMap::new();

        while cursor < agent.steps.len() {
            let step = &agent.steps[cursor];
            let prompt = TemplateRenderer::interpolate(&step.prompt_template, &context);

            let mut step_run = match self.open_step_run(&run, step, cursor, prompt, &context).await {
                Ok(step_run) => step_run,
                Err(err) => return self.fail_run(run, None, err).await,
            };

            let action = match self
                .attempt_step(step, cursor, &mut step_run, &mut run, &mut context)
                .await
            {
                Ok(action) => action,
                Err(err) => return self.fail_run(run, Some(step_run), err).await,
            };

            debug!(run_id = %run.id, index = cursor, step = %step.name, action = ?action, "step finished");

            match action {
                NextAction::Stop => {
                    run.stop_reason = Some(StopReason::DecisionStop);
                    let persisted = self.store.update_run(&run).await;
                    if let Err(err) = persisted {
                        return self.fail_run(run, None, err).await;
                    }
                    break;
                }
                NextAction::Retry => {
                    let max_retries = step
                        .max_retries
                        .or(agent.max_retries)
                        .unwrap_or(self.config.default_max_retries);
                    let count = retries.entry(cursor).or_insert(0);
                    *count += 1;
                    if *count >= max_retries {
                        warn!(run_id = %run.id, index = cursor, max_retries, "max retries reached, moving on");
                        run.stop_reason = Some(StopReason::MaxRetries);
                        let persisted = self.store.update_run(&run).await;
                        if let Err(err) = persisted {
                            return self.fail_run(run, None, err).await;
                        }
                        cursor += 1;
                    }
                }
                NextAction::SkipNext => cursor += 2,
                NextAction::Branch(Some(target)) => cursor = target,
                NextAction::Branch(None) | NextAction::Continue => cursor += 1,
            }
        }

        run.complete();
        let persisted = self.store.update_run(&run).await;
        if let Err(err) = persisted {
            return self.fail_run(run, None, err).await;
        }
        info!(
            run_id = %run.id,
            tokens = run.total_tokens,
            cost = run.total_cost,
            latency_ms = run.total_latency_ms,
            stop_reason = ?run.stop_reason,
            "run completed"
        );
        Ok(self.outcome(run, None).await)
    }

    /// 查找或创建 (run, index) 上的 StepRun，重新进入时覆盖 prompt / input / status
    async fn open_step_run(
        &self,
        run: &Run,
        step: &Step,
        index: usize,
        prompt: String,
        context: &RunContext,
    ) -> Result<StepRun> {
        let mut step_run = self
            .store
            .find_or_create_step_run(StepRun::new(&run.id, &step.id, index))
            .await?;
        step_run.begin_attempt(prompt, serde_json::to_string(context)?);
        self.store.update_step_run(&step_run).await?;
        Ok(step_run)
    }

    async fn attempt_step(
        &self,
        step: &Step,
        index: usize,
        step_run: &mut StepRun,
        run: &mut Run,
        context: &mut RunContext,
    ) -> Result<NextAction> {
        let options = GenerateOptions {
            model: step.effective_model().map(str::to_string),
            temperature: step.temperature,
            max_tokens: step.effective_max_tokens(),
        };
        let generation = self.invoker.invoke(&step_run.prompt, &options).await?;
        run.add_usage(&generation.usage());

        step_run.prompt_tokens = generation.prompt_tokens;
        step_run.completion_tokens = generation.completion_tokens;
        step_run.latency_ms = generation.latency_ms;
        step_run.cost = generation.cost;
        // 未设置的项记录引擎默认值；max_tokens 为空表示交由模型服务决定
        step_run.model = Some(
            options
                .model
                .clone()
                .unwrap_or_else(|| self.config.default_model.clone()),
        );
        step_run.temperature = Some(options.temperature.unwrap_or(self.config.default_temperature));
        step_run.max_tokens = options.max_tokens;
        step_run.status = StepRunStatus::Completed;
        step_run.finished_at = Some(chrono::Utc::now());

        if step.is_reflection() {
            // 反思步骤只记录评价，不进入共享上下文
            step_run.evaluation = Some(generation.content.clone());
        } else {
            context.insert(format!("step_{index}"), generation.content.clone());
            context.insert(step.name.clone(), generation.content.clone());
            step_run.output = Some(generation.content.clone());
            step_run.check_result = Some(OutputChecker::check(
                &generation.content,
                step.checks.as_ref(),
            ));
        }
        self.store.update_step_run(step_run).await?;

        let decision = DecisionResolver::new(&self.invoker)
            .resolve(step, context, &generation.content)
            .await?;
        run.add_usage(&decision.usage);

        step_run.record_decision(
            decision.action,
            decision.decision_type,
            decision.decision_input,
            decision.decision_output,
        );
        self.store.update_step_run(step_run).await?;
        Ok(decision.action)
    }

    /// 致命错误：StepRun 与 Run 标记失败，错误消息原样保留
    async fn fail_run(
        &self,
        mut run: Run,
        step_run: Option<StepRun>,
        err: AgentRunError,
    ) -> Result<RunOutcome> {
        let message = err.to_string();
        warn!(run_id = %run.id, error = %message, "run failed");

        if let Some(mut step_run) = step_run {
            step_run.fail(&message);
            if let Err(store_err) = self.store.update_step_run(&step_run).await {
                crate::log_error!(
                    store_err,
                    run_id = run.id.as_str(),
                    index = step_run.order_index
                );
            }
        }

        run.fail(StopReason::Error);
        if let Err(store_err) = self.store.update_run(&run).await {
            crate::log_error!(store_err, run_id = run.id.as_str());
        }
        Ok(self.outcome(run, Some(message)).await)
    }

    /// 读取失败时 StepRun 列表为空，错误只记录日志
    async fn outcome(&self, run: Run, error: Option<String>) -> RunOutcome {
        let step_runs = match self.store.list_step_runs(&run.id).await {
            Ok(rows) => rows,
            Err(err) => {
                crate::log_error!(err, run_id = run.id.as_str());
                Vec::new()
            }
        };
        RunOutcome {
            run,
            step_runs,
            error,
        }
    }
}

/// 用源 Run 中下标小于 `from` 的输出构造初始上下文（位置键与步骤名键）
pub fn seed_context(agent: &Agent, prior: &[StepRun], from: usize) -> RunContext {
    let mut context = RunContext::new();
    for row in prior.iter().filter(|row| row.order_index < from) {
        let Some(output) = &row.output else {
            continue;
        };
        context.insert(format!("step_{}", row.order_index), output.clone());
        let step = agent
            .step_by_id(&row.step_id)
            .or_else(|| agent.steps.get(row.order_index));
        if let Some(step) = step {
            context.insert(step.name.clone(), output.clone());
        }
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_context_uses_outputs_below_cursor() {
        let agent = Agent::new("a")
            .with_step(Step::action("outline", "o"))
            .with_step(Step::reflection("critique", "c"))
            .with_step(Step::action("draft", "d"));

        let mut rows = Vec::new();
        for (index, step) in agent.steps.iter().enumerate() {
            let mut row = StepRun::new("run", &step.id, index);
            if step.is_reflection() {
                row.evaluation = Some(format!("eval {index}"));
            } else {
                row.output = Some(format!("out {index}"));
            }
            rows.push(row);
        }

        let context = seed_context(&agent, &rows, 2);
        assert_eq!(context.get("step_0").map(String::as_str), Some("out 0"));
        assert_eq!(context.get("outline").map(String::as_str), Some("out 0"));
        assert!(!context.contains_key("step_1"));
        assert!(!context.contains_key("critique"));
        assert!(!context.contains_key("step_2"));
    }
}
