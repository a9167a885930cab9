//! Extracts structured outputs from a raw chat completion payload

use log::{debug, warn};

use crate::task::{ParseError, Task};

/// Parse every choice of `raw` with the task's output parser.
///
/// All or nothing: if any choice fails, the result is empty and a
/// warning is logged. `raw` is never modified.
pub fn parse_choices<T: Task + ?Sized>(
  task: &T
, raw: &serde_json::Value
) -> Vec<T::Output>
{   match try_parse_choices(task, raw)
    {   Ok(parsed) => {
          debug!("Parsed {} choice(s)", parsed.len());
          parsed
        }
      , Err(e) => {
          warn!("Error parsing OpenAI response: {}", e);
          Vec::new()
        }
    }
}

fn try_parse_choices<T: Task + ?Sized>(
  task: &T
, raw: &serde_json::Value
) -> Result<Vec<T::Output>, ParseError>
{   let choices = raw
      .get("choices")
      .and_then(|c| c.as_array())
      .ok_or("response has no `choices` list")?;

    choices
      .iter()
      .enumerate()
      .map(|(i, choice)| {
        let text = choice
          .pointer("/message/content")
          .and_then(|c| c.as_str())
          .ok_or_else(|| format!("choice {i} has no message content"))?;
        task.parse_output(text.trim())
      })
      .collect()
}
