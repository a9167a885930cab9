pub mod error;
pub mod config;
pub mod prompt;
pub mod request;
pub mod task;
pub mod formatter;
pub mod retry;
pub mod providers;
pub mod parser;
pub mod llm;
pub mod client;
use serde::{Deserialize, Serialize};

/*

labelgen is a thin async adapter for generating labels with an LLM:
a task turns each input record into a prompt, the prompt is formatted
for the provider, the completion call is retried on transient errors,
and every returned choice is parsed back through the task.

labelgen/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Re-exports, provider enum, pool channel types
│   ├── error.rs        # Error enum and transient classification
│   ├── config.rs       # JSON configuration and API key resolution
│   ├── prompt.rs       # Provider-agnostic prompts and their layouts
│   ├── request.rs      # Wire turns, request body, generation result
│   ├── task.rs         # Task trait and a plain text-generation task
│   ├── formatter.rs    # Prompt -> chat turns
│   ├── retry.rs        # Randomized exponential backoff
│   ├── providers/      # Provider network clients
│   │   ├── mod.rs      # ChatCompletionApi + completion with retry
│   │   └── openai.rs   # OpenAI REST client
│   ├── parser.rs       # Raw payload -> task outputs
│   ├── llm.rs          # Llm trait and the OpenAI adapter
│   └── client.rs       # Caller-side worker pool
└── tests/              # Integration tests

*/

pub use config::LabelgenConfig;
pub use error::{ApiErrorKind, Error, Result};
pub use formatter::FormattingFn;
pub use llm::{GenerateRecord, Llm, OpenAiLlm};
pub use prompt::{FormattedPrompt, Prompt, PromptFormat, PromptInput};
pub use request::{ChatMessage, Generation};
pub use retry::RetryPolicy;
pub use client::GenerationPool;
pub use task::{Task, TaskInput, TextGenerationTask};

/// Initialise `env_logger` from `RUST_LOG`, defaulting to `info`.
/// Safe to call more than once.
pub fn init_logging()
{   let _ = env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or("info")
    ).try_init();
}

/// GENERATION POOL INTERFACE:

// ===== Generate =====

pub type GenerateReply<O> = Result<Generation<O>>;
pub type GenerateReplySender<O>
  = tokio::sync::mpsc::UnboundedSender<GenerateReply<O>>;

pub struct GenerateArgs<O>
{   pub input: TaskInput
  , pub num_generations: usize
  , pub reply: GenerateReplySender<O>
}

// ===== KillProcess =====

pub type KillProcessReply = Result<()>;
pub type KillProcessReplySender
  = tokio::sync::mpsc::UnboundedSender<KillProcessReply>;

pub struct KillProcessArgs
{   pub reply: KillProcessReplySender
}

// ===== PoolHand (sender side) =====

pub struct PoolHand<O>
{   pub generate_tx
      : tokio::sync::mpsc::UnboundedSender<GenerateArgs<O>>
  , pub kill_process_tx
      : tokio::sync::mpsc::UnboundedSender<KillProcessArgs>
}

// ===== PoolFoot (receiver side) =====

pub struct PoolFoot<O>
{   pub generate_rx
      : tokio::sync::mpsc::UnboundedReceiver<GenerateArgs<O>>
  , pub kill_process_rx
      : tokio::sync::mpsc::UnboundedReceiver<KillProcessArgs>
}

/// LABELGEN STRUCTURES:

/// LLM providers with an adapter in this crate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Hash)]
pub enum Provider
{   /// OpenAI (ChatGPT, GPT-4, etc.)
    OpenAI
}

impl Provider
{   /// Lowercase provider name used in diagnostics
    pub fn name(&self) -> &'static str
    {   match self
        {   Provider::OpenAI => "openai"
        }
    }

    /// Prompt layout the provider's completion endpoint expects
    pub fn prompt_format(&self) -> PromptFormat
    {   match self
        {   Provider::OpenAI => PromptFormat::OpenAi
        }
    }
}
