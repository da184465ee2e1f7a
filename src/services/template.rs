use std::collections::BTreeMap;

/// 模板插值服务
pub struct TemplateRenderer;

impl TemplateRenderer {
    /// 将 `{{ key }}` 替换为上下文中的值
    ///
    /// 花括号内的首尾空白被忽略，键区分大小写；上下文中不存在的占位符原样保留。
    /// 单遍扫描：插入的值不会再被解析。
    pub fn interpolate(template: &str, context: &BTreeMap<String, String>) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            if let Some(end) = after.find("}}") {
                if let Some(value) = context.get(after[..end].trim()) {
                    out.push_str(value);
                    rest = &after[end + 2..];
                    continue;
                }
            }
            // 非占位符：保留一个 `{` 后继续扫描，以便匹配 `{{{key}}}` 这类内层占位符
            out.push('{');
            rest = &rest[start + 1..];
        }

        out.push_str(rest);
        out
    }
}
