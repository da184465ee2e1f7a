use serde_json::Value;

use crate::model::{CheckResult, CheckSpec};

/// 输出静态检查
pub struct OutputChecker;

impl OutputChecker {
    /// 依次检查 mustContain、mustBeJson、minLength/maxLength，收集全部失败项
    ///
    /// 长度按 UTF-16 码元计算。
    pub fn check(output: &str, spec: Option<&CheckSpec>) -> CheckResult {
        let Some(spec) = spec else {
            return CheckResult::passed();
        };

        let mut issues = Vec::new();
        if let Some(needle) = &spec.must_contain {
            if !output.contains(needle.as_str()) {
                issues.push(format!("Output must contain: \"{needle}\""));
            }
        }
        if spec.must_be_json == Some(true) && serde_json::from_str::<Value>(output).is_err() {
            issues.push("Output must be valid JSON".to_string());
        }

        let len = output.encode_utf16().count();
        if let Some(min) = spec.min_length {
            if (len as f64) < min {
                issues.push(format!("Length {len} < minLength {min}"));
            }
        }
        if let Some(max) = spec.max_length {
            if len as f64 > max {
                issues.push(format!("Length {len} > maxLength {max}"));
            }
        }

        if issues.is_empty() {
            CheckResult::passed()
        } else {
            CheckResult {
                ok: false,
                message: Some(issues.join("; ")),
                details: Some(issues.join("\n")),
            }
        }
    }
}
