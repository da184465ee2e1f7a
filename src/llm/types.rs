use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 单次生成的参数，未设置的字段由具体客户端套用默认值
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOptions {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl GenerateOptions {
    /// 判定调用：温度固定为 0
    pub fn judge(model: Option<&str>) -> Self {
        Self {
            model: model.map(str::to_string),
            temperature: Some(0.0),
            max_tokens: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Generation {
    pub content: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub latency_ms: u64,
    pub cost: f64,
}

impl Generation {
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    pub fn usage(&self) -> Usage {
        Usage {
            tokens: self.total_tokens(),
            cost: self.cost,
            latency_ms: self.latency_ms,
        }
    }
}

/// 累计的 token / 费用 / 延迟
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Usage {
    pub tokens: u64,
    pub cost: f64,
    pub latency_ms: u64,
}

impl std::ops::AddAssign for Usage {
    fn add_assign(&mut self, rhs: Self) {
        self.tokens += rhs.tokens;
        self.cost += rhs.cost;
        self.latency_ms += rhs.latency_ms;
    }
}

/// 每 1K token 的美元单价
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    pub input: f64,
    pub output: f64,
}

/// 价格表由调用方提供；未知模型按 0 计价
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    prices: HashMap<String, ModelPrice>,
}

impl ModelPricing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, model: impl Into<String>, input: f64, output: f64) -> Self {
        self.prices.insert(model.into(), ModelPrice { input, output });
        self
    }

    pub fn cost(&self, model: &str, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        let price = self.prices.get(model).copied().unwrap_or_default();
        (prompt_tokens as f64 / 1000.0) * price.input
            + (completion_tokens as f64 / 1000.0) * price.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_model_costs_nothing() {
        let pricing = ModelPricing::new().with_price("gpt-4o", 0.0025, 0.01);
        assert_eq!(pricing.cost("mystery-model", 1000, 1000), 0.0);
        let cost = pricing.cost("gpt-4o", 2000, 500);
        assert!((cost - 0.01).abs() < 1e-12);
    }

    #[test]
    fn usage_from_generation() {
        let generation = Generation {
            content: "hi".into(),
            prompt_tokens: 7,
            completion_tokens: 3,
            latency_ms: 15,
            cost: 0.002,
        };
        let mut total = Usage::default();
        total += generation.usage();
        total += generation.usage();
        assert_eq!(total.tokens, 20);
        assert_eq!(total.latency_ms, 30);
    }
}
