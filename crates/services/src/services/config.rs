//! Startup settings read from the environment.

use std::fmt;

use thiserror::Error;
use utils::port::parse_port;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MODEL: &str = "gpt-4";
pub const OPENAI_CHAT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const SERVICE_NAME: &str = "browser-ai-backend";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    MissingVar(&'static str),
    #[error("Invalid value for {var}: '{value}'")]
    InvalidValue { var: &'static str, value: String },
}

/// Settings for the hosted LLM behind the agent.
#[derive(Clone, PartialEq)]
pub struct AgentConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
}

impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub agent: AgentConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("BACKEND_PORT")
            .map(|v| ("BACKEND_PORT", v))
            .or_else(|| non_empty("PORT").map(|v| ("PORT", v)))
        {
            Some((var, raw)) => {
                parse_port(&raw).ok_or(ConfigError::InvalidValue { var, value: raw })?
            }
            None => {
                tracing::info!("No PORT environment variable set, using {}", DEFAULT_PORT);
                DEFAULT_PORT
            }
        };

        let api_key = non_empty("OPENAI_API_KEY").ok_or(ConfigError::MissingVar("OPENAI_API_KEY"))?;

        Ok(Self {
            host: non_empty("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            agent: AgentConfig {
                api_key,
                model: non_empty("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                endpoint: non_empty("OPENAI_BASE_URL")
                    .unwrap_or_else(|| OPENAI_CHAT_ENDPOINT.to_string()),
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
