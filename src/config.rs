//! Configuration for the OpenAI adapter and its retry behavior

use std::path::Path;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable holding the OpenAI API key
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Public OpenAI API base
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig
{   /// API key; falls back to the environment when absent
    pub api_key: Option<String>
  , /// Environment variable consulted when `api_key` is absent
    pub api_key_env: String
  , /// API base URL (if custom)
    pub api_base: Option<String>
  , /// Request timeout in seconds
    pub timeout_secs: Option<u64>
  , /// Ignore proxy settings from the environment
    pub no_proxy: bool
}

impl Default for ProviderConfig
{   fn default() -> Self
    {   ProviderConfig
        {   api_key: None
          , api_key_env: OPENAI_API_KEY_ENV.to_string()
          , api_base: None
          , timeout_secs: Some(600)
          , no_proxy: false
        }
    }
}

impl ProviderConfig
{   pub fn api_base(&self) -> &str
    {   self.api_base.as_deref().unwrap_or(OPENAI_API_BASE)
    }

    /// Explicit key, else the one in `api_key_env`
    pub fn resolve_api_key(&self) -> Option<String>
    {   resolve_api_key(self.api_key.as_deref(), &self.api_key_env)
    }
}

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig
{   /// Max attempts, including the first call
    pub max_attempts: usize
  , /// Backoff multiplier, in seconds
    pub multiplier: f64
  , /// Ceiling for a single wait, in seconds
    pub max_wait_secs: f64
}

impl Default for RetryConfig
{   fn default() -> Self
    {   RetryConfig
        {   max_attempts: crate::retry::DEFAULT_MAX_ATTEMPTS
          , multiplier: crate::retry::DEFAULT_MULTIPLIER
          , max_wait_secs: crate::retry::DEFAULT_MAX_WAIT_SECS
        }
    }
}

/// Generation knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig
{   /// Model name
    pub model: String
  , /// Max tokens to generate per choice
    pub max_new_tokens: usize
  , /// Temperature for sampling
    pub temperature: f32
  , /// Worker count for a caller-side pool; not used by the adapter
    pub num_threads: Option<usize>
}

impl Default for GenerationConfig
{   fn default() -> Self
    {   GenerationConfig
        {   model: DEFAULT_MODEL.to_string()
          , max_new_tokens: 128
          , temperature: 0.7
          , num_threads: None
        }
    }
}

/// labelgen configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LabelgenConfig
{   #[serde(default)]
    pub provider: ProviderConfig
  , #[serde(default)]
    pub generation: GenerationConfig
  , #[serde(default)]
    pub retry: RetryConfig
}

impl LabelgenConfig
{   pub fn from_json_str(s: &str) -> Result<Self>
    {   let config: LabelgenConfig = serde_json::from_str(s)
          .map_err(|e| Error::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self>
    {   let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let s = std::fs::read_to_string(path).map_err(|e| {
          Error::InvalidConfiguration(
            format!("{}: {}", path.display(), e)
          )
        })?;
        Self::from_json_str(&s)
    }

    pub fn validate(&self) -> Result<()>
    {   if self.generation.model.is_empty()
        {   return Err(Error::InvalidConfiguration(
              "model name is empty".to_string()
            ));
        }
        if self.generation.num_threads == Some(0)
        {   return Err(Error::InvalidConfiguration(
              "num_threads must be at least 1".to_string()
            ));
        }
        if !(0.0..=2.0).contains(&self.generation.temperature)
        {   return Err(Error::InvalidConfiguration(format!(
              "temperature {} is outside [0, 2]"
            , self.generation.temperature
            )));
        }
        Ok(())
    }
}

/// Resolve the API key from the explicit value or, failing that, the
/// process environment. Called once, at adapter construction.
pub fn resolve_api_key(
  explicit: Option<&str>
, env_var: &str
) -> Option<String>
{   if let Some(key) = explicit.filter(|k| !k.is_empty())
    {   debug!("Using explicitly configured API key");
        return Some(key.to_string());
    }
    match std::env::var(env_var)
    {   Ok(key) if !key.is_empty() => {
          debug!("Using API key from {}", env_var);
          Some(key)
        }
      , _ => None
    }
}
