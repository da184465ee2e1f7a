use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Agent 定义：有序步骤列表 + 默认最大重试次数
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Agent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            max_retries: None,
            steps: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// 追加步骤，`order_index` 取当前位置
    pub fn with_step(mut self, mut step: Step) -> Self {
        step.order_index = self.steps.len();
        if step.id.is_empty() {
            step.id = format!("{}-step-{}", self.id, step.order_index);
        }
        self.steps.push(step);
        self
    }

    pub fn sort_steps(&mut self) {
        self.steps.sort_by_key(|step| step.order_index);
    }

    pub fn step_by_id(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|step| step.id == step_id)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    #[default]
    Action,
    Reflection,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub order_index: usize,
    pub name: String,
    pub prompt_template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, alias = "type", deserialize_with = "lenient_step_type")]
    pub step_type: StepType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_prompt: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_condition",
        skip_serializing_if = "Option::is_none"
    )]
    pub condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(
        default,
        deserialize_with = "lenient_checks",
        skip_serializing_if = "Option::is_none"
    )]
    pub checks: Option<CheckSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_complete_default: Option<String>,
}

impl Step {
    pub fn action(name: impl Into<String>, prompt_template: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            order_index: 0,
            name: name.into(),
            prompt_template: prompt_template.into(),
            model: None,
            temperature: None,
            max_tokens: None,
            step_type: StepType::Action,
            decision_prompt: None,
            condition: None,
            max_retries: None,
            checks: None,
            on_complete_default: None,
        }
    }

    pub fn reflection(name: impl Into<String>, prompt_template: impl Into<String>) -> Self {
        Self {
            step_type: StepType::Reflection,
            ..Self::action(name, prompt_template)
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_decision_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.decision_prompt = Some(prompt.into());
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_checks(mut self, checks: CheckSpec) -> Self {
        self.checks = Some(checks);
        self
    }

    pub fn on_complete(mut self, action: impl Into<String>) -> Self {
        self.on_complete_default = Some(action.into());
        self
    }

    pub fn is_reflection(&self) -> bool {
        self.step_type == StepType::Reflection
    }

    /// 空字符串视为未设置
    pub fn effective_model(&self) -> Option<&str> {
        self.model.as_deref().filter(|model| !model.is_empty())
    }

    /// 0 视为未设置
    pub fn effective_max_tokens(&self) -> Option<u32> {
        self.max_tokens.filter(|tokens| *tokens > 0)
    }

    pub fn active_decision_prompt(&self) -> Option<&str> {
        self.decision_prompt
            .as_deref()
            .filter(|prompt| !prompt.is_empty())
    }
}

/// 布尔条件：`{ "if": ..., "then": ..., "else": ... }`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "if")]
    pub predicate: String,
    #[serde(rename = "then")]
    pub then_action: String,
    #[serde(rename = "else")]
    pub else_action: String,
}

impl Condition {
    pub fn new(
        predicate: impl Into<String>,
        then_action: impl Into<String>,
        else_action: impl Into<String>,
    ) -> Self {
        Self {
            predicate: predicate.into(),
            then_action: then_action.into(),
            else_action: else_action.into(),
        }
    }

    /// 宽松解析：缺少字符串 `if` 时视为未配置；`then`/`else` 缺失按空串处理（归一化为 continue）
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let predicate = obj.get("if")?.as_str()?;
        let action = |key: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Some(Self {
            predicate: predicate.to_string(),
            then_action: action("then"),
            else_action: action("else"),
        })
    }
}

/// 输出静态检查配置；长度上下限可为任意数值（负数或小数照常比较）
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub must_contain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub must_be_json: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<f64>,
}

impl CheckSpec {
    pub fn must_contain(mut self, needle: impl Into<String>) -> Self {
        self.must_contain = Some(needle.into());
        self
    }

    pub fn must_be_json(mut self) -> Self {
        self.must_be_json = Some(true);
        self
    }

    pub fn length_between(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    /// 宽松解析：类型不符的字段直接忽略
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            must_contain: obj
                .get("mustContain")
                .and_then(Value::as_str)
                .map(str::to_string),
            must_be_json: obj.get("mustBeJson").and_then(Value::as_bool),
            min_length: obj.get("minLength").and_then(Value::as_f64),
            max_length: obj.get("maxLength").and_then(Value::as_f64),
        })
    }
}

fn lenient_step_type<'de, D>(deserializer: D) -> Result<StepType, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value.as_str() {
        Some("reflection") => StepType::Reflection,
        _ => StepType::Action,
    })
}

fn lenient_condition<'de, D>(deserializer: D) -> Result<Option<Condition>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(Condition::from_value(&value))
}

fn lenient_checks<'de, D>(deserializer: D) -> Result<Option<CheckSpec>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(CheckSpec::from_value(&value))
}
