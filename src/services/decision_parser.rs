use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::NextAction;

static BRANCH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"BRANCH\s*[:\s]*([0-9]+)").unwrap());
static RETRY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?-u:\b)RETRY(?-u:\b)").unwrap());
static SKIP_NEXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?-u:\b)SKIP_NEXT(?-u:\b)").unwrap());
static STOP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?-u:\b)STOP(?-u:\b)").unwrap());

/// 解析判定模型的自由文本回复
pub struct DecisionParser;

impl DecisionParser {
    /// 按 branch > retry > skip_next > stop 的优先级匹配控制标记，均未命中时为 continue
    ///
    /// 匹配不区分大小写；`BRANCH:<n>` / `BRANCH <n>` 捕获目标下标，超出 `usize` 时饱和为最大值。
    pub fn parse(text: &str) -> NextAction {
        let upper = text.to_uppercase();
        let upper = upper.trim();

        if let Some(caps) = BRANCH_RE.captures(upper) {
            let target = caps[1].parse::<usize>().unwrap_or(usize::MAX);
            return NextAction::Branch(Some(target));
        }
        if RETRY_RE.is_match(upper) {
            return NextAction::Retry;
        }
        if SKIP_NEXT_RE.is_match(upper) {
            return NextAction::SkipNext;
        }
        if STOP_RE.is_match(upper) {
            return NextAction::Stop;
        }
        NextAction::Continue
    }
}
