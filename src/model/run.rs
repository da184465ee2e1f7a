use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::action::{ActionKind, DecisionType, NextAction};
use crate::error::{AgentRunError, Result};
use crate::llm::Usage;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    DecisionStop,
    MaxRetries,
    Error,
}

/// 一次 Agent 执行
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub id: String,
    pub agent_id: String,
    pub status: RunStatus,
    pub stop_reason: Option<StopReason>,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub total_latency_ms: u64,
    #[serde(default)]
    pub dataset_id: Option<String>,
    #[serde(default)]
    pub case_index: Option<usize>,
    /// 回放来源
    #[serde(default)]
    pub source_run_id: Option<String>,
    #[serde(default)]
    pub rating: Option<i8>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Run {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            agent_id: agent_id.into(),
            status: RunStatus::Running,
            stop_reason: None,
            total_tokens: 0,
            total_cost: 0.0,
            total_latency_ms: 0,
            dataset_id: None,
            case_index: None,
            source_run_id: None,
            rating: None,
            note: None,
            tags: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn for_case(mut self, dataset_id: impl Into<String>, case_index: usize) -> Self {
        self.dataset_id = Some(dataset_id.into());
        self.case_index = Some(case_index);
        self
    }

    pub fn replay_of(mut self, source_run_id: impl Into<String>) -> Self {
        self.source_run_id = Some(source_run_id.into());
        self
    }

    pub fn add_usage(&mut self, usage: &Usage) {
        self.total_tokens += usage.tokens;
        self.total_cost += usage.cost;
        self.total_latency_ms += usage.latency_ms;
    }

    pub fn complete(&mut self) {
        self.status = RunStatus::Completed;
        self.finished_at = Some(Utc::now());
    }

    pub fn fail(&mut self, reason: StopReason) {
        self.status = RunStatus::Failed;
        self.stop_reason = Some(reason);
        self.finished_at = Some(Utc::now());
    }

    /// 只更新补丁中出现的字段；终态后唯一允许的修改
    pub fn annotate(&mut self, patch: &Annotation) -> Result<()> {
        if let Some(Some(rating)) = patch.rating {
            if !(-1..=5).contains(&rating) {
                return Err(AgentRunError::InvalidAnnotation(format!(
                    "rating {rating} is outside -1..=5"
                )));
            }
        }
        if let Some(rating) = patch.rating {
            self.rating = rating;
        }
        if let Some(note) = &patch.note {
            self.note = note.clone();
        }
        if let Some(tags) = &patch.tags {
            self.tags = tags.clone();
        }
        Ok(())
    }
}

/// 标注补丁：外层 `None` 表示不修改，`Some(None)` 表示清空
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    #[serde(default, deserialize_with = "present")]
    pub rating: Option<Option<i8>>,
    #[serde(default, deserialize_with = "present")]
    pub note: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub tags: Option<Option<String>>,
}

impl Annotation {
    pub fn rating(mut self, rating: i8) -> Self {
        self.rating = Some(Some(rating));
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(Some(note.into()));
        self
    }

    pub fn tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(Some(tags.into()));
        self
    }
}

fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepRunStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CheckResult {
    pub fn passed() -> Self {
        Self {
            ok: true,
            message: None,
            details: None,
        }
    }
}

/// 单个步骤在某次 Run 中的执行记录，(run_id, order_index) 唯一
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRun {
    pub id: String,
    pub run_id: String,
    pub step_id: String,
    pub order_index: usize,
    /// 执行前上下文的 JSON 快照
    pub input: String,
    pub prompt: String,
    pub output: Option<String>,
    pub evaluation: Option<String>,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub latency_ms: u64,
    pub cost: f64,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub check_result: Option<CheckResult>,
    pub status: StepRunStatus,
    pub error_message: Option<String>,
    pub next_action: Option<ActionKind>,
    pub decision_type: Option<DecisionType>,
    pub decision_input: Option<String>,
    pub decision_output: Option<String>,
    pub next_step_index: Option<usize>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl StepRun {
    pub fn new(run_id: impl Into<String>, step_id: impl Into<String>, order_index: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            run_id: run_id.into(),
            step_id: step_id.into(),
            order_index,
            input: String::new(),
            prompt: String::new(),
            output: None,
            evaluation: None,
            prompt_tokens: 0,
            completion_tokens: 0,
            latency_ms: 0,
            cost: 0.0,
            model: None,
            temperature: None,
            max_tokens: None,
            check_result: None,
            status: StepRunStatus::Running,
            error_message: None,
            next_action: None,
            decision_type: None,
            decision_input: None,
            decision_output: None,
            next_step_index: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// 进入（或重新进入）该步骤：只覆盖 prompt / input / status
    pub fn begin_attempt(&mut self, prompt: String, input: String) {
        self.prompt = prompt;
        self.input = input;
        self.status = StepRunStatus::Running;
        self.started_at = Utc::now();
        self.finished_at = None;
    }

    pub fn record_decision(
        &mut self,
        action: NextAction,
        decision_type: DecisionType,
        decision_input: Option<String>,
        decision_output: Option<String>,
    ) {
        self.next_action = Some(action.kind());
        self.next_step_index = action.branch_target();
        self.decision_type = Some(decision_type);
        self.decision_input = decision_input;
        self.decision_output = decision_output;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = StepRunStatus::Failed;
        self.error_message = Some(message.into());
        self.finished_at = Some(Utc::now());
    }
}
