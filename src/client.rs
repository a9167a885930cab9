use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use log::{debug, trace, error, info};

use crate::llm::{GenerateRecord, OpenAiLlm};
use crate::task::{Task, TaskInput};
use crate::PoolFoot;

/// Worker count used when none is configured
pub fn default_num_threads() -> usize
{   std::thread::available_parallelism()
      .map(|n| n.get())
      .unwrap_or(1)
}

/// Caller-side worker pool issuing independent per-record generations
/// concurrently, at most `num_threads` at a time.
pub struct GenerationPool<O>
{   hand: crate::PoolHand<O>
  , num_threads: usize
  , _task_handle: tokio::task::JoinHandle<()>
}

impl<O: Send + 'static> GenerationPool<O>
{   /// Create and spawn a new pool around `generator`.
    /// Returns immediately - spawns background task
    pub fn new<G>(
      generator: Arc<G>
    , num_threads: Option<usize>
    ) -> Self
    where
      G: GenerateRecord<Output = O> + 'static
    {   let num_threads = num_threads
          .unwrap_or_else(default_num_threads)
          .max(1);
        debug!("Creating GenerationPool with {} workers", num_threads);

        let (generate_tx, generate_rx)
          = mpsc::unbounded_channel();
        let (kill_process_tx, kill_process_rx)
          = mpsc::unbounded_channel();

        let hand = crate::PoolHand
        {   generate_tx
          , kill_process_tx
        };

        let foot = crate::PoolFoot
        {   generate_rx
          , kill_process_rx
        };

        let _task_handle = tokio::spawn(async move {
          run_pool_loop(foot, generator, num_threads).await
        });

        GenerationPool
        {   hand
          , num_threads
          , _task_handle
        }
    }

    /// Pool sized by the adapter's `num_threads` setting
    pub fn from_llm<T>(llm: OpenAiLlm<T>) -> Self
    where
      T: Task<Output = O> + 'static
    {   let num_threads = llm.num_threads();
        GenerationPool::new(Arc::new(llm), num_threads)
    }

    pub fn num_threads(&self) -> usize
    {   self.num_threads
    }

    /// Queue one record - returns almost immediately
    pub async fn generate(
      &self
    , input: TaskInput
    , num_generations: usize
    ) -> Result<
        mpsc::UnboundedReceiver<crate::GenerateReply<O>>,
        crate::error::Error
      >
    {   trace!("generate queuing command");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::GenerateArgs
        {   input
          , num_generations
          , reply: reply_tx
        };

        self.hand.generate_tx
          .send(cmd)
          .map_err(|_| {
            error!("Pool channel closed");
            crate::error::Error::Other(
              "Pool disconnected".to_string()
            )
          })?;

        Ok(reply_rx)
    }

    /// Queue every input and wait for all replies, in input order
    pub async fn generate_all(
      &self
    , inputs: Vec<TaskInput>
    , num_generations: usize
    ) -> Result<Vec<crate::GenerateReply<O>>, crate::error::Error>
    {   let mut receivers = Vec::with_capacity(inputs.len());
        for input in inputs
        {   receivers.push(self.generate(input, num_generations).await?);
        }

        let mut replies = Vec::with_capacity(receivers.len());
        for mut rx in receivers
        {   let reply = rx.recv().await.unwrap_or_else(|| {
              Err(crate::error::Error::Other(
                "Pool dropped request".to_string()
              ))
            });
            replies.push(reply);
        }
        Ok(replies)
    }

    /// Gracefully shutdown the pool, waiting for in-flight work
    pub async fn shutdown(self)
      -> Result<(), crate::error::Error>
    {   debug!("Shutting down GenerationPool");
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::KillProcessArgs
        {   reply: reply_tx
        };

        self.hand.kill_process_tx
          .send(cmd)
          .map_err(|_| {
            error!("Pool channel already closed");
            crate::error::Error::Other(
              "Pool already shutdown".to_string()
            )
          })?;

        // Wait for shutdown confirmation
        if let Some(result) = reply_rx.recv().await
        {   debug!("Pool shutdown confirmed");
            result
        } else
        {   error!("Pool exited without confirming shutdown");
            Err(crate::error::Error::Other(
              "Pool exited without confirming shutdown".to_string()
            ))
        }
    }
}

/// Main pool event loop
///
/// tokio::select! is ONLY for fast queueing: every command is handed to
/// its own task, and the semaphore bounds how many generate at once.
async fn run_pool_loop<G>(
  foot: PoolFoot<G::Output>
, generator: Arc<G>
, num_threads: usize
)
where
  G: GenerateRecord + 'static
{   debug!("Starting GenerationPool event loop");
    let permits = Arc::new(Semaphore::new(num_threads));
    let mut in_flight = JoinSet::new();
    let PoolFoot
    {   mut generate_rx
      , mut kill_process_rx
    } = foot;

    loop
    { tokio::select!
      { Some(cmd) = generate_rx.recv() => {
          trace!("Received Generate");
          spawn_generation(&mut in_flight, &generator, &permits, cmd);
        }
      , Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
          if let Err(e) = joined
          {   error!("Generation task failed: {}", e);
          }
        }
      , Some(cmd) = kill_process_rx.recv() => {
          debug!(
            "Received KillProcess with {} task(s) in flight"
          , in_flight.len()
          );
          // Stop accepting, but still serve what was already queued
          generate_rx.close();
          while let Some(queued) = generate_rx.recv().await
          {   spawn_generation(&mut in_flight, &generator, &permits, queued);
          }
          while let Some(joined) = in_flight.join_next().await
          {   if let Err(e) = joined
              {   error!("Generation task failed: {}", e);
              }
          }
          let _ = cmd.reply.send(Ok(()));
          info!("GenerationPool shutting down");
          break;
        }
      , else => {
          debug!("All pool handles dropped");
          break;
        }
      }
    }
}

fn spawn_generation<G>(
  in_flight: &mut JoinSet<()>
, generator: &Arc<G>
, permits: &Arc<Semaphore>
, cmd: crate::GenerateArgs<G::Output>
)
where
  G: GenerateRecord + 'static
{   let generator = generator.clone();
    let permits = permits.clone();
    in_flight.spawn(async move {
      let _permit = match permits.acquire_owned().await
      {   Ok(p) => p
        , Err(_) => return
      };
      let result = generator
        .generate_one(&cmd.input, cmd.num_generations)
        .await;
      let _ = cmd.reply.send(result);
    });
}
