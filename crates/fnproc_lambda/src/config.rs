use thiserror::Error;

use crate::adapters::api_gateway::PLATFORM_ID;

pub const PROCESSOR_ENV: &str = "DEPLOY_PROCESSOR";
pub const PLATFORM_ENV: &str = "DEPLOY_PLATFORM";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be configured")]
    Missing(&'static str),
}

/// Values the runtime entry point reads once per cold start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryConfig {
    pub processor_name: String,
    pub platform: String,
}

impl EntryConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let processor_name = lookup(PROCESSOR_ENV)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::Missing(PROCESSOR_ENV))?;

        let platform = lookup(PLATFORM_ENV)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| PLATFORM_ID.to_string());

        Ok(Self {
            processor_name,
            platform,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| values.get(key).cloned()
    }

    #[test]
    fn platform_defaults_to_lambda() {
        let config = EntryConfig::from_lookup(lookup(&[(PROCESSOR_ENV, "echo")])).unwrap();
        assert_eq!(config.processor_name, "echo");
        assert_eq!(config.platform, "aws-lambda");
    }

    #[test]
    fn blank_processor_is_missing() {
        let error = EntryConfig::from_lookup(lookup(&[(PROCESSOR_ENV, "  ")])).unwrap_err();
        assert_eq!(error.to_string(), "DEPLOY_PROCESSOR must be configured");
    }

    #[test]
    fn platform_is_opaque() {
        let config = EntryConfig::from_lookup(lookup(&[
            (PROCESSOR_ENV, "echo"),
            (PLATFORM_ENV, "azure"),
        ]))
        .unwrap();
        assert_eq!(config.platform, "azure");
    }
}
