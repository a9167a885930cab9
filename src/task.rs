//! Task collaborator: builds prompts from input records and parses
//! completion text back into structured outputs.

use serde::{Deserialize, Serialize};

use crate::prompt::{Prompt, PromptInput};

/// One input record, keyed by field name
pub type TaskInput = serde_json::Map<String, serde_json::Value>;

/// Error raised by [`Task::parse_output`] on malformed text
pub type ParseError = Box<dyn std::error::Error + Send + Sync>;

/// A labeling task the adapter generates for
pub trait Task: Send + Sync
{   /// Structured output extracted from one completion choice
    type Output: Send;

    /// Build the prompt for one input record
    fn generate_prompt(&self, input: &TaskInput) -> PromptInput;

    /// Parse the (trimmed) text of one choice
    fn parse_output(&self, text: &str)
      -> Result<Self::Output, ParseError>;
}

const DEFAULT_SYSTEM_PROMPT: &str
  = "You are a helpful, respectful and honest assistant.";

/// Output of [`TextGenerationTask`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextGeneration
{   pub text: String
}

/// Plain instruction-following task.
///
/// Reads the instruction from the `"input"` key. Candidate responses
/// under `"generations"` (a list of strings) are appended as numbered
/// items so the model can rate or refine them.
#[derive(Debug, Clone)]
pub struct TextGenerationTask
{   pub system_prompt: String
}

impl Default for TextGenerationTask
{   fn default() -> Self
    {   TextGenerationTask
        {   system_prompt: DEFAULT_SYSTEM_PROMPT.to_string()
        }
    }
}

impl TextGenerationTask
{   pub fn with_system_prompt(system_prompt: impl Into<String>) -> Self
    {   TextGenerationTask
        {   system_prompt: system_prompt.into()
        }
    }
}

impl Task for TextGenerationTask
{   type Output = TextGeneration;

    fn generate_prompt(&self, input: &TaskInput) -> PromptInput
    {   let mut text = input
          .get("input")
          .and_then(|v| v.as_str())
          .unwrap_or_default()
          .to_string();

        let generations: Vec<&str> = input
          .get("generations")
          .and_then(|v| v.as_array())
          .map(|g| g.iter().filter_map(|v| v.as_str()).collect())
          .unwrap_or_default();

        if !generations.is_empty()
        {   text.push_str("\n\nResponses:");
            for (i, g) in generations.iter().enumerate()
            {   text.push_str(&format!("\n{}. {}", i + 1, g));
            }
        }

        Prompt::new(self.system_prompt.as_str(), text).into()
    }

    fn parse_output(&self, text: &str)
      -> Result<TextGeneration, ParseError>
    {   if text.is_empty()
        {   return Err("empty completion".into());
        }
        Ok(TextGeneration { text: text.to_string() })
    }
}
