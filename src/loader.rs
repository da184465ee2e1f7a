use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use crate::error::{AgentRunError, Result};
use crate::model::Agent;
use crate::utils::DefinitionValidator;

/// 从 JSON 字符串加载 Agent 定义
///
/// 缺失的 id 自动生成；所有步骤都未给出 `orderIndex` 时按数组位置编号。
pub fn load_agent_from_str(raw: &str) -> Result<Agent> {
    let value: Value = serde_json::from_str(raw)?;
    load_agent_from_value(value)
}

pub fn load_agent_from_value(value: Value) -> Result<Agent> {
    let explicit_indices = value
        .get("steps")
        .and_then(Value::as_array)
        .map(|steps| steps.iter().any(|step| step.get("orderIndex").is_some()))
        .unwrap_or(false);

    let mut agent: Agent = serde_json::from_value(value)
        .map_err(|e| AgentRunError::Definition(e.to_string()))?;

    if agent.id.is_empty() {
        agent.id = uuid::Uuid::new_v4().to_string();
    }
    if !explicit_indices {
        for (index, step) in agent.steps.iter_mut().enumerate() {
            step.order_index = index;
        }
    }
    agent.sort_steps();
    for step in agent.steps.iter_mut() {
        if step.id.is_empty() {
            step.id = format!("{}-step-{}", agent.id, step.order_index);
        }
    }

    DefinitionValidator::validate_agent(&agent)?;
    Ok(agent)
}

pub fn load_agent_from_path(path: &Path) -> Result<Agent> {
    let raw = std::fs::read_to_string(path)?;
    load_agent_from_str(&raw)
}

/// 读取数据集 case 列表：JSON 数组，每项为字符串到字符串的映射
pub fn load_cases_from_str(raw: &str) -> Result<Vec<BTreeMap<String, String>>> {
    serde_json::from_str(raw).map_err(|e| {
        AgentRunError::Definition(format!(
            "cases must be an array of string-to-string objects: {e}"
        ))
    })
}

pub fn load_cases_from_path(path: &Path) -> Result<Vec<BTreeMap<String, String>>> {
    let raw = std::fs::read_to_string(path)?;
    load_cases_from_str(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StepType;

    #[test]
    fn assigns_ids_and_positions() {
        let agent = load_agent_from_str(
            r#"{
                "name": "summarizer",
                "maxRetries": 2,
                "steps": [
                    { "name": "extract", "promptTemplate": "Extract {{text}}" },
                    { "name": "review", "promptTemplate": "Review {{extract}}", "stepType": "reflection" }
                ]
            }"#,
        )
        .unwrap();
        assert!(!agent.id.is_empty());
        assert_eq!(agent.max_retries, Some(2));
        assert_eq!(agent.steps[1].order_index, 1);
        assert_eq!(agent.steps[1].step_type, StepType::Reflection);
        assert!(agent.steps[0].id.ends_with("-step-0"));
    }

    #[test]
    fn explicit_indices_are_sorted() {
        let agent = load_agent_from_str(
            r#"{
                "id": "agent-1",
                "name": "a",
                "steps": [
                    { "id": "b", "orderIndex": 1, "name": "second", "promptTemplate": "2" },
                    { "id": "a", "orderIndex": 0, "name": "first", "promptTemplate": "1" }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(agent.id, "agent-1");
        assert_eq!(agent.steps[0].name, "first");
        assert_eq!(agent.steps[1].id, "b");
    }

    #[test]
    fn rejects_empty_step_name() {
        let err = load_agent_from_str(
            r#"{ "name": "a", "steps": [ { "name": "", "promptTemplate": "x" } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, AgentRunError::Definition(_)));
    }

    #[test]
    fn rejects_missing_template() {
        let err = load_agent_from_str(r#"{ "name": "a", "steps": [ { "name": "s" } ] }"#)
            .unwrap_err();
        assert!(matches!(err, AgentRunError::Definition(_)));
    }

    #[test]
    fn cases_must_be_string_maps() {
        let cases = load_cases_from_str(r#"[{ "name": "Alice", "topic": "AI" }, {}]"#).unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0]["topic"], "AI");
        assert!(load_cases_from_str(r#"[{ "n": 1 }]"#).is_err());
    }
}
