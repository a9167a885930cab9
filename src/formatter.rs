//! Resolves a task prompt into provider chat turns

use std::sync::Arc;
use log::{debug, warn};

use crate::error::{Error, Result};
use crate::prompt::{FormattedPrompt, PromptInput};
use crate::request::ChatMessage;

/// Caller-supplied override that formats a task prompt
pub type FormattingFn
  = Arc<dyn Fn(PromptInput) -> FormattedPrompt + Send + Sync>;

/// Resolve `input` into turns for `provider`.
///
/// An explicit `formatting_fn` always wins. Applying it to a prompt the
/// task already formatted is allowed but logged as a warning.
pub fn format_prompt(
  input: PromptInput
, formatting_fn: Option<&FormattingFn>
, provider: &crate::Provider
) -> Result<Vec<ChatMessage>>
{   let formatted = match (input, formatting_fn)
    {   (input @ PromptInput::Formatted(_), Some(f)) => {
          warn!(
            "`Task::generate_prompt` returned an already formatted \
             prompt, so using a formatting function on top of it is \
             discouraged"
          );
          f(input)
        }
      , (input @ PromptInput::Structured(_), Some(f)) => {
          debug!("Applying custom formatting function");
          f(input)
        }
      , (PromptInput::Structured(prompt), None) => {
          debug!("Formatting prompt as {:?}", provider.prompt_format());
          prompt.format_as(provider.prompt_format())
        }
      , (PromptInput::Formatted(formatted), None) => formatted
    };

    match formatted
    {   FormattedPrompt::Turns(turns) => Ok(turns)
      , other => Err(Error::InvalidPrompt
        {   kind: other.kind().to_string()
        })
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use crate::prompt::{Prompt, PromptFormat};
    use crate::Provider;

    fn prompt() -> Prompt
    {   Prompt::new("system text", "user text")
    }

    fn to_single_user_turn() -> FormattingFn
    {   Arc::new(|input: PromptInput| match input
        {   PromptInput::Structured(p) => FormattedPrompt::Turns(vec![
              ChatMessage::user(p.formatted_prompt)
            ])
          , PromptInput::Formatted(f) => f
        })
    }

    #[test]
    fn structured_prompt_uses_provider_format()
    {   let turns = format_prompt(
          prompt().into()
        , None
        , &Provider::OpenAI
        ).unwrap();
        assert_eq!(
          FormattedPrompt::Turns(turns)
        , prompt().format_as(PromptFormat::OpenAi)
        );
    }

    #[test]
    fn preformatted_turns_pass_through()
    {   let turns = vec![
          ChatMessage::user("hi")
        , ChatMessage::assistant("hello")
        , ChatMessage::user("bye")
        ];
        let out = format_prompt(
          turns.clone().into()
        , None
        , &Provider::OpenAI
        ).unwrap();
        assert_eq!(out, turns);
    }

    #[test]
    fn custom_function_wins_over_structured_prompt()
    {   let f = to_single_user_turn();
        let out = format_prompt(
          prompt().into()
        , Some(&f)
        , &Provider::OpenAI
        ).unwrap();
        assert_eq!(out, vec![ChatMessage::user("user text")]);
    }

    #[test]
    fn custom_function_still_applies_to_preformatted_prompt()
    {   let f: FormattingFn = Arc::new(|_: PromptInput| FormattedPrompt::Turns(vec![
          ChatMessage::user("rewritten")
        ]));
        let out = format_prompt(
          vec![ChatMessage::user("original")].into()
        , Some(&f)
        , &Provider::OpenAI
        ).unwrap();
        assert_eq!(out, vec![ChatMessage::user("rewritten")]);
    }

    #[test]
    fn text_prompt_is_rejected()
    {   let err = format_prompt(
          "plain text".to_string().into()
        , None
        , &Provider::OpenAI
        ).unwrap_err();
        assert_eq!(err, Error::InvalidPrompt { kind: "text".into() });
    }

    #[test]
    fn formatting_function_returning_text_is_rejected()
    {   let f: FormattingFn = Arc::new(|_: PromptInput| {
          FormattedPrompt::Text("flattened".into())
        });
        let err = format_prompt(
          prompt().into()
        , Some(&f)
        , &Provider::OpenAI
        ).unwrap_err();
        assert!(matches!(err, Error::InvalidPrompt { .. }));
    }
}
