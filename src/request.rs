//! Chat request and generation result types

use serde::{Deserialize, Serialize};

/// One role/content turn in the provider wire format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: String
  , pub content: String
}

impl ChatMessage
{   pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self
    {   ChatMessage
        {   role: role.into()
          , content: content.into()
        }
    }

    pub fn system(content: impl Into<String>) -> Self
    {   ChatMessage::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self
    {   ChatMessage::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self
    {   ChatMessage::new("assistant", content)
    }
}

/// Chat completion request body, built per call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest
{   /// Model name
    pub model: String
  , /// Formatted conversation turns
    pub messages: Vec<ChatMessage>
  , /// Number of generations requested
    pub n: usize
  , /// Temperature for sampling
    pub temperature: f32
  , /// Max tokens to generate per choice
    pub max_tokens: usize
}

/// Result of one generation call for a single input record
#[derive(Debug, Clone, PartialEq)]
pub struct Generation<O>
{   /// Provider payload, kept in full
    pub raw: serde_json::Value
  , /// One parsed output per choice, or empty if any choice failed
    pub parsed: Vec<O>
}

impl<O> Generation<O>
{   /// Number of choices in the raw payload
    pub fn choice_count(&self) -> usize
    {   self.raw
          .get("choices")
          .and_then(|c| c.as_array())
          .map_or(0, |c| c.len())
    }

    /// Text content of each raw choice, in order
    pub fn choice_texts(&self) -> Vec<Option<&str>>
    {   self.raw
          .get("choices")
          .and_then(|c| c.as_array())
          .map(|choices| {
            choices
              .iter()
              .map(|c| c.pointer("/message/content")
                .and_then(|t| t.as_str()))
              .collect()
          })
          .unwrap_or_default()
    }
}
