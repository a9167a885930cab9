//! Provider-agnostic prompts and their provider-native forms

use serde::{Deserialize, Serialize};

use crate::request::ChatMessage;

/// Layouts a [`Prompt`] can be rendered into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptFormat
{   /// System prompt and user prompt on two lines
    Default
  , /// OpenAI chat turns
    OpenAi
  , /// `[INST] <<SYS>>` layout
    Llama2
  , /// `<|im_start|>` layout
    ChatMl
  , /// `<|system|>` layout
    Zephyr
}

/// A prompt already in the shape a provider consumes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormattedPrompt
{   Turns(Vec<ChatMessage>)
  , Text(String)
}

impl FormattedPrompt
{   /// Short name of the variant, used in diagnostics
    pub fn kind(&self) -> &'static str
    {   match self
        {   FormattedPrompt::Turns(_) => "turns"
          , FormattedPrompt::Text(_) => "text"
        }
    }
}

/// Structured prompt produced by a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt
{   pub system_prompt: String
  , pub formatted_prompt: String
}

impl Prompt
{   pub fn new(
      system_prompt: impl Into<String>
    , formatted_prompt: impl Into<String>
    ) -> Self
    {   Prompt
        {   system_prompt: system_prompt.into()
          , formatted_prompt: formatted_prompt.into()
        }
    }

    /// Render the prompt in the given provider layout
    pub fn format_as(&self, format: PromptFormat) -> FormattedPrompt
    {   let system = &self.system_prompt;
        let user = &self.formatted_prompt;
        match format
        {   PromptFormat::OpenAi => FormattedPrompt::Turns(vec![
              ChatMessage::system(system.as_str())
            , ChatMessage::user(user.as_str())
            ])
          , PromptFormat::Default => FormattedPrompt::Text(
              format!("{system}\n{user}")
            )
          , PromptFormat::Llama2 => FormattedPrompt::Text(format!(
              "<s>[INST] <<SYS>>\n{system}<</SYS>>\n\n{user} [/INST]"
            ))
          , PromptFormat::ChatMl => FormattedPrompt::Text(format!(
              "<|im_start|>system\n{system}<|im_end|>\n\
               <|im_start|>user\n{user}<|im_end|>\n\
               <|im_start|>assistant\n"
            ))
          , PromptFormat::Zephyr => FormattedPrompt::Text(format!(
              "<|system|>\n{system}</s>\n<|user|>\n{user}</s>\n\
               <|assistant|>\n"
            ))
        }
    }
}

/// What a task hands to the formatter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptInput
{   Structured(Prompt)
  , Formatted(FormattedPrompt)
}

impl From<Prompt> for PromptInput
{   fn from(p: Prompt) -> Self
    {   PromptInput::Structured(p)
    }
}

impl From<Vec<ChatMessage>> for PromptInput
{   fn from(turns: Vec<ChatMessage>) -> Self
    {   PromptInput::Formatted(FormattedPrompt::Turns(turns))
    }
}

impl From<String> for PromptInput
{   fn from(text: String) -> Self
    {   PromptInput::Formatted(FormattedPrompt::Text(text))
    }
}
