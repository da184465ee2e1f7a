use tracing::debug;

use super::invoker::ModelInvoker;
use super::types::RunContext;
use crate::error::Result;
use crate::llm::{GenerateOptions, Usage};
use crate::model::{Condition, DecisionType, NextAction, Step};
use crate::services::{DecisionParser, TemplateRenderer};

/// 条件判定时输出截断长度（字符）
pub const CONDITION_OUTPUT_LIMIT: usize = 8000;

/// 决策结果及判定调用产生的额外用量
#[derive(Clone, Debug, PartialEq)]
pub struct Decision {
    pub action: NextAction,
    pub decision_type: DecisionType,
    pub decision_input: Option<String>,
    pub decision_output: Option<String>,
    pub usage: Usage,
}

/// 决策解析器
///
/// 优先级：decisionPrompt > condition > 默认动作。
pub struct DecisionResolver<'a> {
    invoker: &'a ModelInvoker,
}

impl<'a> DecisionResolver<'a> {
    pub fn new(invoker: &'a ModelInvoker) -> Self {
        Self { invoker }
    }

    pub async fn resolve(&self, step: &Step, context: &RunContext, output: &str) -> Result<Decision> {
        if let Some(template) = step.active_decision_prompt() {
            return self.judge_by_prompt(step, template, context, output).await;
        }
        if let Some(condition) = &step.condition {
            return self.judge_by_condition(step, condition, output).await;
        }
        Ok(Self::default_decision(step))
    }

    fn default_decision(step: &Step) -> Decision {
        let action = NextAction::parse(step.on_complete_default.as_deref().unwrap_or("continue"));
        Decision {
            action,
            decision_type: DecisionType::Default,
            decision_input: None,
            decision_output: None,
            usage: Usage::default(),
        }
    }

    async fn judge_by_prompt(
        &self,
        step: &Step,
        template: &str,
        context: &RunContext,
        output: &str,
    ) -> Result<Decision> {
        let mut decision_ctx = context.clone();
        decision_ctx.insert("output".to_string(), output.to_string());
        let prompt = TemplateRenderer::interpolate(template, &decision_ctx);

        let generation = self
            .invoker
            .invoke(&prompt, &GenerateOptions::judge(step.effective_model()))
            .await?;
        let action = DecisionParser::parse(&generation.content);
        debug!(step = %step.name, action = %action.kind(), "decision prompt resolved");

        Ok(Decision {
            action,
            decision_type: DecisionType::DecisionPrompt,
            decision_input: Some(prompt),
            decision_output: Some(generation.content.clone()),
            usage: generation.usage(),
        })
    }

    async fn judge_by_condition(
        &self,
        step: &Step,
        condition: &Condition,
        output: &str,
    ) -> Result<Decision> {
        let prompt = condition_prompt(output, &condition.predicate);
        let generation = self
            .invoker
            .invoke(&prompt, &GenerateOptions::judge(step.effective_model()))
            .await?;
        let holds = generation.content.trim().eq_ignore_ascii_case("yes");

        let chosen = if holds {
            &condition.then_action
        } else {
            &condition.else_action
        };
        let action = NextAction::parse(chosen);
        debug!(step = %step.name, holds, action = %action.kind(), "condition resolved");

        Ok(Decision {
            action,
            decision_type: DecisionType::Condition,
            decision_input: Some(serde_json::to_string(condition)?),
            decision_output: Some(format!(
                "Condition: \"{}\" => {} => {}",
                condition.predicate,
                if holds { "yes" } else { "no" },
                action.kind()
            )),
            usage: generation.usage(),
        })
    }
}

/// 构造 yes/no 判定问题，输出截断到前 8000 个字符
pub fn condition_prompt(output: &str, predicate: &str) -> String {
    let truncated: String = output.chars().take(CONDITION_OUTPUT_LIMIT).collect();
    format!(
        "Given the following output:\n\n---\n{truncated}\n---\n\nCondition: {predicate}\n\nDoes the condition hold? Answer with exactly one word: yes or no."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::llm::ScriptedClient;
    use crate::model::ActionKind;

    fn invoker(client: ScriptedClient) -> (ModelInvoker, Arc<ScriptedClient>) {
        let client = Arc::new(client);
        (ModelInvoker::new(client.clone(), None), client)
    }

    #[tokio::test]
    async fn default_uses_on_complete_default() {
        let (invoker, client) = invoker(ScriptedClient::new(|_, _| Ok(String::new())));
        let resolver = DecisionResolver::new(&invoker);

        let step = Step::action("s", "p").on_complete("skip-next");
        let decision = resolver.resolve(&step, &RunContext::new(), "out").await.unwrap();
        assert_eq!(decision.action, NextAction::SkipNext);
        assert_eq!(decision.decision_type, DecisionType::Default);
        assert_eq!(decision.usage, Usage::default());

        let unset = resolver
            .resolve(&Step::action("s", "p"), &RunContext::new(), "out")
            .await
            .unwrap();
        assert_eq!(unset.action, NextAction::Continue);
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn decision_prompt_sees_output_and_context() {
        let (invoker, client) = invoker(
            ScriptedClient::new(|_, _| Ok("I think we should BRANCH: 2 but also RETRY".into()))
                .with_usage(4, 1, 9, 0.5),
        );
        let resolver = DecisionResolver::new(&invoker);
        let step = Step::action("s", "p")
            .with_model("judge-model")
            .with_decision_prompt("Topic {{topic}}. Output: {{ output }}");
        let mut context = RunContext::new();
        context.insert("topic".into(), "rust".into());

        let decision = resolver.resolve(&step, &context, "draft text").await.unwrap();
        assert_eq!(decision.action, NextAction::Branch(Some(2)));
        assert_eq!(decision.action.kind(), ActionKind::Branch);
        assert_eq!(decision.decision_type, DecisionType::DecisionPrompt);
        assert_eq!(
            decision.decision_input.as_deref(),
            Some("Topic rust. Output: draft text")
        );
        assert_eq!(decision.usage.tokens, 5);
        assert_eq!(decision.usage.latency_ms, 9);

        let calls = client.calls();
        assert_eq!(calls[0].options.temperature, Some(0.0));
        assert_eq!(calls[0].options.model.as_deref(), Some("judge-model"));
    }

    #[tokio::test]
    async fn decision_prompt_beats_condition() {
        let (invoker, _) = invoker(ScriptedClient::new(|_, _| Ok("stop".into())));
        let resolver = DecisionResolver::new(&invoker);
        let step = Step::action("s", "p")
            .with_decision_prompt("judge {{output}}")
            .with_condition(Condition::new("x", "retry", "retry"));
        let decision = resolver.resolve(&step, &RunContext::new(), "o").await.unwrap();
        assert_eq!(decision.decision_type, DecisionType::DecisionPrompt);
        assert_eq!(decision.action, NextAction::Stop);
    }

    #[tokio::test]
    async fn condition_yes_takes_then_branch() {
        let (invoker, client) = invoker(ScriptedClient::new(|_, _| Ok("  Yes \n".into())));
        let resolver = DecisionResolver::new(&invoker);
        let step = Step::action("s", "p").with_condition(Condition::new(
            "mentions a price",
            "stop",
            "continue",
        ));
        let decision = resolver.resolve(&step, &RunContext::new(), "$5").await.unwrap();
        assert_eq!(decision.action, NextAction::Stop);
        assert_eq!(decision.decision_type, DecisionType::Condition);
        assert_eq!(
            decision.decision_output.as_deref(),
            Some("Condition: \"mentions a price\" => yes => STOP")
        );
        assert_eq!(
            decision.decision_input.as_deref(),
            Some(r#"{"if":"mentions a price","then":"stop","else":"continue"}"#)
        );
        assert!(client.calls()[0].prompt.contains("Condition: mentions a price"));
    }

    #[tokio::test]
    async fn condition_anything_but_yes_is_no() {
        let (invoker, _) = invoker(ScriptedClient::new(|_, _| Ok("yes, definitely".into())));
        let resolver = DecisionResolver::new(&invoker);
        let step = Step::action("s", "p").with_condition(Condition::new("c", "stop", "retry"));
        let decision = resolver.resolve(&step, &RunContext::new(), "o").await.unwrap();
        assert_eq!(decision.action, NextAction::Retry);
        assert!(decision.decision_output.unwrap().contains("=> no =>"));
    }

    #[test]
    fn condition_prompt_truncates_output() {
        let long = "a".repeat(CONDITION_OUTPUT_LIMIT + 50);
        let prompt = condition_prompt(&long, "is it long?");
        assert!(prompt.contains(&"a".repeat(CONDITION_OUTPUT_LIMIT)));
        assert!(!prompt.contains(&"a".repeat(CONDITION_OUTPUT_LIMIT + 1)));
        assert!(prompt.ends_with("Answer with exactly one word: yes or no."));
    }
}
