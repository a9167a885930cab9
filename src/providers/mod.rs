//! LLM provider implementations

pub mod openai;

// Re-export for convenience
pub use openai::OpenAiClient;

use async_trait::async_trait;
use log::debug;

use crate::error::{Error, Result};
use crate::request::ChatCompletionRequest;
use crate::retry::{retry, RetryPolicy};

/// Network surface of a chat-completion provider.
///
/// Each method is exactly one round trip; retrying is layered on top by
/// [`complete`].
#[async_trait]
pub trait ChatCompletionApi: Send + Sync
{   /// Model identifiers available to the account
    async fn list_models(&self) -> Result<Vec<String>>;

    /// Issue one chat completion call and return the raw payload
    async fn create_chat_completion(
      &self
    , request: &ChatCompletionRequest
    ) -> Result<serde_json::Value>;
}

/// Issue `request`, retrying transient failures under `policy`
pub async fn complete(
  api: &dyn ChatCompletionApi
, policy: &RetryPolicy
, request: &ChatCompletionRequest
) -> Result<serde_json::Value>
{   debug!(
      "Requesting {} generation(s) from {}"
    , request.n, request.model
    );
    retry(policy, Error::is_transient, || {
      api.create_chat_completion(request)
    }).await
}
