//! Error types for labelgen operations

use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of a non-2xx provider response.
///
/// Mirrors the error classes the OpenAI SDK raises for each status
/// code, so retry decisions can be made on the kind alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind
{   /// 5xx other than 503
    Server
  , /// 429
    RateLimit
  , /// 503
    ServiceUnavailable
  , /// 400, 404, 415
    InvalidRequest
  , /// 401
    Authentication
  , /// 403
    Permission
  , /// 409
    Conflict
  , /// Any other non-success status
    Other
}

impl ApiErrorKind
{   /// Map an HTTP status code to its error kind
    pub fn from_status(status: u16) -> Self
    {   match status
        {   429 => ApiErrorKind::RateLimit
          , 503 => ApiErrorKind::ServiceUnavailable
          , 500..=599 => ApiErrorKind::Server
          , 400 | 404 | 415 => ApiErrorKind::InvalidRequest
          , 401 => ApiErrorKind::Authentication
          , 403 => ApiErrorKind::Permission
          , 409 => ApiErrorKind::Conflict
          , _ => ApiErrorKind::Other
        }
    }
}

/// Custom error type for labelgen operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error
{   /// No API key given and none found in the environment
    #[error(
      "Missing API key for {provider}: either pass one explicitly or \
       set the `{env_var}` environment variable"
    )]
    MissingApiKey
    {   provider: String
      , env_var: String
    }
  , /// Requested model is not available to the account
    #[error(
      "Model `{model}` is not available in your account, \
       available models are {available:?}"
    )]
    ModelUnavailable
    {   model: String
      , available: Vec<String>
    }
  , /// Prompt did not resolve to a list of chat turns
    #[error(
      "The resolved prompt is of kind `{kind}`, but it must be a list \
       of turns; make sure that `Task::generate_prompt` returns turns \
       or that the formatting function formats the prompt as a list \
       where each item follows the `{{role, content}}` format"
    )]
    InvalidPrompt
    {   kind: String
    }
  , /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String)
  , /// Provider returned a non-success status
    #[error("API error ({kind:?}, status {status}): {message}")]
    Api
    {   kind: ApiErrorKind
      , status: u16
      , message: String
    }
  , /// Request timed out
    #[error("Request timed out")]
    Timeout
  , /// HTTP transport error
    #[error("HTTP error: {0}")]
    HttpError(String)
  , /// Provider payload could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String)
  , /// No choices in API response
    #[error("API response contained no choices")]
    NoChoicesInResponse
  , /// Generic error
    #[error("Error: {0}")]
    Other(String)
}

impl Error
{   /// Whether the error is one of the transient provider failures
    /// that the completion client retries.
    pub fn is_transient(&self) -> bool
    {   match self
        {   Error::Timeout => true
          , Error::Api { kind, .. } => matches!(
              kind
            , ApiErrorKind::Server
              | ApiErrorKind::RateLimit
              | ApiErrorKind::ServiceUnavailable
            )
          , _ => false
        }
    }

    /// Build an [`Error::Api`] from a status code and response body
    pub fn from_status(status: u16, message: impl Into<String>) -> Self
    {   Error::Api
        {   kind: ApiErrorKind::from_status(status)
          , status
          , message: message.into()
        }
    }
}

impl From<reqwest::Error> for Error
{   fn from(e: reqwest::Error) -> Self
    {   if e.is_timeout()
        {   Error::Timeout
        } else if e.is_decode()
        {   Error::InvalidResponse(e.to_string())
        } else
        {   Error::HttpError(e.to_string())
        }
    }
}

impl From<serde_json::Error> for Error
{   fn from(e: serde_json::Error) -> Self
    {   Error::InvalidResponse(e.to_string())
    }
}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}
