//! The OpenAI adapter: prompt formatting, completion with backoff and
//! output parsing behind one `generate` call.

use std::sync::Arc;
use async_trait::async_trait;
use log::{debug, error, info};

use crate::config::LabelgenConfig;
use crate::error::{Error, Result};
use crate::formatter::{format_prompt, FormattingFn};
use crate::parser::parse_choices;
use crate::providers::{self, ChatCompletionApi, OpenAiClient};
use crate::request::{ChatCompletionRequest, Generation};
use crate::retry::RetryPolicy;
use crate::task::{Task, TaskInput};
use crate::Provider;

/// Uniform contract shared by every LLM adapter
#[async_trait]
pub trait Llm: Send + Sync
{   /// Generate one completion per prompt.
    ///
    /// `responses`, when given, holds candidate responses for each
    /// prompt (same length as `prompts`) for tasks that rate or refine
    /// them.
    async fn generate(
      &self
    , prompts: &[String]
    , responses: Option<&[Vec<String>]>
    ) -> Result<Vec<String>>;
}

/// Per-record generation, the unit of work of a worker pool
#[async_trait]
pub trait GenerateRecord: Send + Sync
{   type Output: Send;

    async fn generate_one(
      &self
    , input: &TaskInput
    , num_generations: usize
    ) -> Result<Generation<Self::Output>>;
}

/// OpenAI chat-completion adapter for a [`Task`]
pub struct OpenAiLlm<T: Task>
{   task: T
  , api: Arc<dyn ChatCompletionApi>
  , model: String
  , max_new_tokens: usize
  , temperature: f32
  , num_threads: Option<usize>
  , retry_policy: RetryPolicy
  , formatting_fn: Option<FormattingFn>
  , available_models: Vec<String>
}

impl<T: Task> std::fmt::Debug for OpenAiLlm<T>
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   f.debug_struct("OpenAiLlm")
          .field("model", &self.model)
          .field("max_new_tokens", &self.max_new_tokens)
          .field("temperature", &self.temperature)
          .field("num_threads", &self.num_threads)
          .field("retry_policy", &self.retry_policy)
          .field("has_formatting_fn", &self.formatting_fn.is_some())
          .finish()
    }
}

impl<T: Task> OpenAiLlm<T>
{   /// Build the adapter against the real OpenAI API.
    ///
    /// Fails before any network call if no API key can be resolved,
    /// then fails if the configured model is not available.
    pub async fn new(
      task: T
    , config: LabelgenConfig
    , formatting_fn: Option<FormattingFn>
    ) -> Result<Self>
    {   let api_key = config.provider.resolve_api_key()
          .ok_or_else(|| {
            error!("No OpenAI API key configured");
            Error::MissingApiKey
            {   provider: Provider::OpenAI.name().to_string()
              , env_var: config.provider.api_key_env.clone()
            }
          })?;
        let client = OpenAiClient::new(api_key, &config.provider)?;
        Self::with_api(task, config, Arc::new(client), formatting_fn).await
    }

    /// Build the adapter around an explicit API implementation.
    ///
    /// The model list is fetched here, once, and kept for the adapter's
    /// lifetime.
    pub async fn with_api(
      task: T
    , config: LabelgenConfig
    , api: Arc<dyn ChatCompletionApi>
    , formatting_fn: Option<FormattingFn>
    ) -> Result<Self>
    {   config.validate()?;
        let LabelgenConfig { generation, retry, .. } = config;

        let available_models = api.list_models().await?;
        if !available_models.iter().any(|m| *m == generation.model)
        {   error!(
              "Model {} not in {} available models"
            , generation.model, available_models.len()
            );
            return Err(Error::ModelUnavailable
            {   model: generation.model
              , available: available_models
            });
        }
        info!("Using OpenAI model {}", generation.model);

        Ok(OpenAiLlm
        {   task
          , api
          , model: generation.model
          , max_new_tokens: generation.max_new_tokens
          , temperature: generation.temperature
          , num_threads: generation.num_threads
          , retry_policy: RetryPolicy::from_config(&retry)
          , formatting_fn
          , available_models
        })
    }

    pub fn model(&self) -> &str
    {   &self.model
    }

    pub fn task(&self) -> &T
    {   &self.task
    }

    /// Models the account could use, as fetched at construction
    pub fn available_models(&self) -> &[String]
    {   &self.available_models
    }

    /// Advisory worker count for a caller-side pool
    pub fn num_threads(&self) -> Option<usize>
    {   self.num_threads
    }

    /// Generate `num_generations` completions for one input record,
    /// returning the raw payload and the parsed outputs.
    pub async fn generate_one(
      &self
    , input: &TaskInput
    , num_generations: usize
    ) -> Result<Generation<T::Output>>
    {   if num_generations == 0
        {   return Err(Error::InvalidConfiguration(
              "num_generations must be at least 1".to_string()
            ));
        }

        let prompt = self.task.generate_prompt(input);
        let messages = format_prompt(
          prompt
        , self.formatting_fn.as_ref()
        , &Provider::OpenAI
        )?;

        let request = ChatCompletionRequest
        {   model: self.model.clone()
          , messages
          , n: num_generations
          , temperature: self.temperature
          , max_tokens: self.max_new_tokens
        };

        let raw = providers::complete(
          self.api.as_ref()
        , &self.retry_policy
        , &request
        ).await?;
        let parsed = parse_choices(&self.task, &raw);
        Ok(Generation { raw, parsed })
    }

    /// Run [`generate_one`](Self::generate_one) over `inputs` in order.
    /// The first hard error stops the batch.
    pub async fn generate_batch(
      &self
    , inputs: &[TaskInput]
    , num_generations: usize
    ) -> Result<Vec<Generation<T::Output>>>
    {   debug!("Generating for batch of {} inputs", inputs.len());
        let mut generations = Vec::with_capacity(inputs.len());
        for input in inputs
        {   generations.push(self.generate_one(input, num_generations).await?);
        }
        Ok(generations)
    }
}

#[async_trait]
impl<T: Task> GenerateRecord for OpenAiLlm<T>
{   type Output = T::Output;

    async fn generate_one(
      &self
    , input: &TaskInput
    , num_generations: usize
    ) -> Result<Generation<T::Output>>
    {   OpenAiLlm::generate_one(self, input, num_generations).await
    }
}

#[async_trait]
impl<T: Task> Llm for OpenAiLlm<T>
{   async fn generate(
      &self
    , prompts: &[String]
    , responses: Option<&[Vec<String>]>
    ) -> Result<Vec<String>>
    {   if let Some(responses) = responses
        {   if responses.len() != prompts.len()
            {   return Err(Error::InvalidConfiguration(format!(
                  "got {} prompts but {} response lists"
                , prompts.len(), responses.len()
                )));
            }
        }

        let mut texts = Vec::with_capacity(prompts.len());
        for (i, prompt) in prompts.iter().enumerate()
        {   let mut input = TaskInput::new();
            input.insert("input".to_string(), prompt.clone().into());
            if let Some(responses) = responses
            {   input.insert(
                  "generations".to_string()
                , responses[i].clone().into()
                );
            }

            let generation = self.generate_one(&input, 1).await?;
            let text = generation
              .choice_texts()
              .into_iter()
              .next()
              .flatten()
              .ok_or(Error::NoChoicesInResponse)?;
            texts.push(text.trim().to_string());
        }
        Ok(texts)
    }
}
