use crate::error::{AgentRunError, Result};
use std::env;

/// 环境变量配置管理
pub struct EnvConfig;

impl EnvConfig {
    pub const BASE_URL: &'static str = "OPENAI_BASE_URL";
    pub const API_KEY: &'static str = "OPENAI_API_KEY";
    pub const MODEL: &'static str = "MODEL";

    /// 获取 API Key
    ///
    /// 优先级：
    /// 1. 直接传入的 api_key（非 `${}` 包裹）
    /// 2. `${VAR_NAME}` 形式时读取对应环境变量
    /// 3. 为空时读取默认环境变量
    pub fn get_api_key(api_key: &str, default_env_var: &str) -> Result<String> {
        if api_key.starts_with("${") && api_key.ends_with('}') {
            let env_var_name = &api_key[2..api_key.len() - 1];
            Self::get_env(env_var_name)
        } else if api_key.is_empty() {
            Self::get_env(default_env_var)
        } else {
            Ok(api_key.to_string())
        }
    }

    /// 从环境变量获取值
    pub fn get_env(key: &str) -> Result<String> {
        env::var(key)
            .map_err(|_| AgentRunError::Config(format!("environment variable `{key}` is not set")))
    }

    /// 获取可选的环境变量，空字符串视为未设置
    pub fn get_env_optional(key: &str) -> Option<String> {
        env::var(key).ok().filter(|value| !value.is_empty())
    }

    /// 解析可选的数值型环境变量
    pub fn parse_optional<T>(key: &str) -> Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match Self::get_env_optional(key) {
            Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
                AgentRunError::Config(format!("invalid value `{raw}` for `{key}`: {e}"))
            }),
            None => Ok(None),
        }
    }

    /// 读取 `OPENAI_API_KEY`，值为 `${VAR}` 时解析到对应环境变量；未设置时返回 `None`
    pub fn api_key() -> Result<Option<String>> {
        match Self::get_env_optional(Self::API_KEY) {
            Some(raw) => Self::get_api_key(&raw, Self::API_KEY).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_api_key_direct() {
        let result = EnvConfig::get_api_key("sk-1234567890abcdef1234567890", "TEST_API_KEY");
        assert_eq!(result.unwrap(), "sk-1234567890abcdef1234567890");
    }

    #[test]
    fn test_get_api_key_env_var() {
        env::set_var("AGENTRUN_TEST_KEY_INDIRECT", "test_key_value");
        let result = EnvConfig::get_api_key("${AGENTRUN_TEST_KEY_INDIRECT}", "FALLBACK_KEY");
        assert_eq!(result.unwrap(), "test_key_value");
        env::remove_var("AGENTRUN_TEST_KEY_INDIRECT");
    }

    #[test]
    fn test_get_api_key_missing() {
        let result = EnvConfig::get_api_key("", "AGENTRUN_TEST_KEY_NEVER_SET");
        assert!(matches!(result, Err(AgentRunError::Config(_))));
    }

    #[test]
    fn test_api_key_indirection() {
        env::set_var("AGENTRUN_TEST_REAL_KEY", "sk-indirect");
        env::set_var(EnvConfig::API_KEY, "${AGENTRUN_TEST_REAL_KEY}");
        assert_eq!(EnvConfig::api_key().unwrap().as_deref(), Some("sk-indirect"));

        env::set_var(EnvConfig::API_KEY, "${AGENTRUN_TEST_KEY_NEVER_SET}");
        assert!(matches!(EnvConfig::api_key(), Err(AgentRunError::Config(_))));

        env::remove_var(EnvConfig::API_KEY);
        env::remove_var("AGENTRUN_TEST_REAL_KEY");
        assert_eq!(EnvConfig::api_key().unwrap(), None);
    }

    #[test]
    fn test_parse_optional() {
        env::set_var("AGENTRUN_TEST_NUMBER", "42");
        assert_eq!(
            EnvConfig::parse_optional::<u32>("AGENTRUN_TEST_NUMBER").unwrap(),
            Some(42)
        );
        env::set_var("AGENTRUN_TEST_NUMBER", "many");
        assert!(EnvConfig::parse_optional::<u32>("AGENTRUN_TEST_NUMBER").is_err());
        env::remove_var("AGENTRUN_TEST_NUMBER");
        assert_eq!(
            EnvConfig::parse_optional::<u32>("AGENTRUN_TEST_NUMBER").unwrap(),
            None
        );
    }
}
