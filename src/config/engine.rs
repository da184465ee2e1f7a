use std::time::Duration;

use super::env::EnvConfig;
use crate::error::Result;

/// 执行引擎的系统默认值
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    pub base_url: String,
    pub default_model: String,
    pub default_temperature: f32,
    pub default_max_retries: u32,
    /// 单次模型调用的超时，`None` 表示不限
    pub step_timeout: Option<Duration>,
}

impl EngineConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;
    pub const DEFAULT_MAX_RETRIES: u32 = 3;

    /// 从环境变量加载，未设置的项使用默认值
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            base_url: EnvConfig::get_env_optional(EnvConfig::BASE_URL)
                .unwrap_or(defaults.base_url),
            default_model: EnvConfig::get_env_optional(EnvConfig::MODEL)
                .unwrap_or(defaults.default_model),
            default_temperature: EnvConfig::parse_optional("AGENTRUN_DEFAULT_TEMPERATURE")?
                .unwrap_or(defaults.default_temperature),
            default_max_retries: EnvConfig::parse_optional("AGENTRUN_MAX_RETRIES")?
                .unwrap_or(defaults.default_max_retries),
            step_timeout: EnvConfig::parse_optional::<u64>("AGENTRUN_STEP_TIMEOUT_MS")?
                .map(Duration::from_millis),
        })
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.default_max_retries = max_retries;
        self
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = Some(timeout);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            default_model: Self::DEFAULT_MODEL.to_string(),
            default_temperature: Self::DEFAULT_TEMPERATURE,
            default_max_retries: Self::DEFAULT_MAX_RETRIES,
            step_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_values() {
        let config = EngineConfig::default();
        assert_eq!(config.default_model, "gpt-4o-mini");
        assert_eq!(config.default_max_retries, 3);
        assert!((config.default_temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.step_timeout, None);
    }

    #[test]
    fn builders_override() {
        let config = EngineConfig::default()
            .with_max_retries(5)
            .with_step_timeout(Duration::from_millis(250));
        assert_eq!(config.default_max_retries, 5);
        assert_eq!(config.step_timeout, Some(Duration::from_millis(250)));
    }
}
