use std::collections::HashSet;

use crate::error::{AgentRunError, Result};
use crate::model::{Agent, Step};

/// Agent 定义校验器
pub struct DefinitionValidator;

impl DefinitionValidator {
    pub const MAX_RETRIES_LIMIT: u32 = 20;

    /// 校验整个 Agent：名称、重试上限、步骤下标连续且唯一
    pub fn validate_agent(agent: &Agent) -> Result<()> {
        if agent.name.trim().is_empty() {
            return Err(invalid("agent name must not be empty"));
        }
        if let Some(max_retries) = agent.max_retries {
            Self::validate_max_retries(max_retries)?;
        }

        let mut seen = HashSet::new();
        for step in &agent.steps {
            if !seen.insert(step.order_index) {
                return Err(invalid(format!(
                    "duplicate orderIndex {} in agent `{}`",
                    step.order_index, agent.name
                )));
            }
            Self::validate_step(step)?;
        }
        if let Some(missing) = (0..agent.steps.len()).find(|index| !seen.contains(index)) {
            return Err(invalid(format!(
                "orderIndex values must be contiguous from 0; {missing} is missing"
            )));
        }
        Ok(())
    }

    pub fn validate_step(step: &Step) -> Result<()> {
        if step.name.trim().is_empty() {
            return Err(invalid(format!(
                "step at orderIndex {} has an empty name",
                step.order_index
            )));
        }
        if let Some(temperature) = step.temperature {
            Self::validate_temperature(temperature)?;
        }
        if let Some(max_retries) = step.max_retries {
            Self::validate_max_retries(max_retries)?;
        }
        Ok(())
    }

    /// 验证温度参数
    pub fn validate_temperature(temperature: f32) -> Result<()> {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(invalid(format!(
                "temperature must be within 0.0..=2.0, got {temperature}"
            )));
        }
        Ok(())
    }

    pub fn validate_max_retries(max_retries: u32) -> Result<()> {
        if max_retries > Self::MAX_RETRIES_LIMIT {
            return Err(invalid(format!(
                "maxRetries must be at most {}, got {max_retries}",
                Self::MAX_RETRIES_LIMIT
            )));
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> AgentRunError {
    AgentRunError::Definition(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_step_agent() -> Agent {
        Agent::new("writer")
            .with_step(Step::action("outline", "o"))
            .with_step(Step::action("draft", "d"))
    }

    #[test]
    fn test_validate_agent_ok() {
        assert!(DefinitionValidator::validate_agent(&two_step_agent()).is_ok());
    }

    #[test]
    fn test_validate_agent_gap() {
        let mut agent = two_step_agent();
        agent.steps[1].order_index = 2;
        let err = DefinitionValidator::validate_agent(&agent).unwrap_err();
        assert!(err.to_string().contains("contiguous"));
    }

    #[test]
    fn test_validate_agent_duplicate() {
        let mut agent = two_step_agent();
        agent.steps[1].order_index = 0;
        let err = DefinitionValidator::validate_agent(&agent).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_validate_step_name() {
        let step = Step::action("  ", "p");
        assert!(DefinitionValidator::validate_step(&step).is_err());
    }

    #[test]
    fn test_validate_temperature() {
        assert!(DefinitionValidator::validate_temperature(-0.1).is_err());
        assert!(DefinitionValidator::validate_temperature(0.0).is_ok());
        assert!(DefinitionValidator::validate_temperature(2.0).is_ok());
        assert!(DefinitionValidator::validate_temperature(2.1).is_err());
    }

    #[test]
    fn test_validate_max_retries() {
        assert!(DefinitionValidator::validate_max_retries(20).is_ok());
        assert!(DefinitionValidator::validate_max_retries(21).is_err());
    }
}
