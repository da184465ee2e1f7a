use serde::{Deserialize, Serialize};

/// 步骤完成后的控制流动作（持久化形式）
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    #[default]
    Continue,
    Retry,
    SkipNext,
    Branch,
    Stop,
}

impl ActionKind {
    /// 归一化动作字符串：转大写、`-` 转 `_`，无法识别的一律回落为 `Continue`
    pub fn normalize(raw: &str) -> Self {
        match raw.to_uppercase().replace('-', "_").as_str() {
            "CONTINUE" => ActionKind::Continue,
            "RETRY" => ActionKind::Retry,
            "SKIP_NEXT" => ActionKind::SkipNext,
            "BRANCH" => ActionKind::Branch,
            "STOP" => ActionKind::Stop,
            _ => ActionKind::Continue,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Continue => "CONTINUE",
            ActionKind::Retry => "RETRY",
            ActionKind::SkipNext => "SKIP_NEXT",
            ActionKind::Branch => "BRANCH",
            ActionKind::Stop => "STOP",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 执行器使用的动作，`Branch` 携带可选的目标下标
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextAction {
    Continue,
    Retry,
    SkipNext,
    Branch(Option<usize>),
    Stop,
}

impl NextAction {
    pub fn from_kind(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Continue => NextAction::Continue,
            ActionKind::Retry => NextAction::Retry,
            ActionKind::SkipNext => NextAction::SkipNext,
            ActionKind::Branch => NextAction::Branch(None),
            ActionKind::Stop => NextAction::Stop,
        }
    }

    /// 解析任意动作字符串，见 [`ActionKind::normalize`]
    pub fn parse(raw: &str) -> Self {
        Self::from_kind(ActionKind::normalize(raw))
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            NextAction::Continue => ActionKind::Continue,
            NextAction::Retry => ActionKind::Retry,
            NextAction::SkipNext => ActionKind::SkipNext,
            NextAction::Branch(_) => ActionKind::Branch,
            NextAction::Stop => ActionKind::Stop,
        }
    }

    pub fn branch_target(&self) -> Option<usize> {
        match self {
            NextAction::Branch(target) => *target,
            _ => None,
        }
    }
}

/// 决策来源
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DecisionType {
    #[default]
    Default,
    DecisionPrompt,
    Condition,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_accepts_case_and_hyphens() {
        assert_eq!(ActionKind::normalize("skip-next"), ActionKind::SkipNext);
        assert_eq!(ActionKind::normalize("Skip_Next"), ActionKind::SkipNext);
        assert_eq!(ActionKind::normalize("stop"), ActionKind::Stop);
        assert_eq!(ActionKind::normalize("BRANCH"), ActionKind::Branch);
    }

    #[test]
    fn unknown_action_falls_back_to_continue() {
        assert_eq!(ActionKind::normalize("jump"), ActionKind::Continue);
        assert_eq!(ActionKind::normalize(""), ActionKind::Continue);
        assert_eq!(NextAction::parse("halt"), NextAction::Continue);
    }

    #[test]
    fn branch_target_only_for_branch() {
        assert_eq!(NextAction::Branch(Some(4)).branch_target(), Some(4));
        assert_eq!(NextAction::Branch(None).branch_target(), None);
        assert_eq!(NextAction::Retry.branch_target(), None);
        assert_eq!(NextAction::Branch(Some(1)).kind(), ActionKind::Branch);
    }

    #[test]
    fn serialized_forms() {
        assert_eq!(
            serde_json::to_string(&ActionKind::SkipNext).unwrap(),
            "\"SKIP_NEXT\""
        );
        assert_eq!(
            serde_json::to_string(&DecisionType::DecisionPrompt).unwrap(),
            "\"decisionPrompt\""
        );
    }
}
