//! Retry with randomized exponential backoff

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use log::{debug, info};
use rand::Rng;

/// Default number of attempts, including the first call
pub const DEFAULT_MAX_ATTEMPTS: usize = 6;
/// Default backoff multiplier, in seconds
pub const DEFAULT_MULTIPLIER: f64 = 1.0;
/// Default ceiling for a single wait, in seconds
pub const DEFAULT_MAX_WAIT_SECS: f64 = 10.0;

/// Retry policy for transient failures
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy
{   max_attempts: usize
  , multiplier: f64
  , max_wait: Duration
}

impl RetryPolicy
{   /// Create a new retry policy
    pub fn new(
      max_attempts: usize
    , multiplier: f64
    , max_wait: Duration
    ) -> Self
    {   RetryPolicy
        {   max_attempts: max_attempts.max(1)
          , multiplier: multiplier.max(0.0)
          , max_wait
        }
    }

    /// Single attempt, no waiting
    pub fn no_retry() -> Self
    {   RetryPolicy::new(1, 0.0, Duration::ZERO)
    }

    pub fn from_config(config: &crate::config::RetryConfig) -> Self
    {   RetryPolicy::new(
          config.max_attempts
        , config.multiplier
        , Duration::from_secs_f64(config.max_wait_secs.max(0.0))
        )
    }

    pub fn max_attempts(&self) -> usize
    {   self.max_attempts
    }

    /// Upper bound of the wait after `attempt` (1-based) failed:
    /// `min(max_wait, multiplier * 2^(attempt - 1))`.
    pub fn backoff_ceiling(&self, attempt: usize) -> Duration
    {   let exp = attempt.saturating_sub(1).min(63) as i32;
        let secs = self.multiplier * 2f64.powi(exp);
        let secs = secs.min(self.max_wait.as_secs_f64());
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// Random wait drawn uniformly from `[0, backoff_ceiling(attempt)]`
    pub fn wait_for_attempt(&self, attempt: usize) -> Duration
    {   let ceiling = self.backoff_ceiling(attempt).as_secs_f64();
        if ceiling <= 0.0
        {   return Duration::ZERO;
        }
        let secs = rand::thread_rng().gen_range(0.0..=ceiling);
        debug!(
          "Backoff for attempt {}: {:.3}s (ceiling {:.3}s)"
        , attempt, secs, ceiling
        );
        Duration::from_secs_f64(secs)
    }
}

impl Default for RetryPolicy
{   fn default() -> Self
    {   RetryPolicy::new(
          DEFAULT_MAX_ATTEMPTS
        , DEFAULT_MULTIPLIER
        , Duration::from_secs_f64(DEFAULT_MAX_WAIT_SECS)
        )
    }
}

/// Run `op` until it succeeds, fails with an error `is_transient`
/// rejects, or the policy runs out of attempts. The last error is
/// returned as-is.
pub async fn retry<T, E, F, Fut, P>(
  policy: &RetryPolicy
, is_transient: P
, mut op: F
) -> Result<T, E>
where
  E: Display
, F: FnMut() -> Fut
, Fut: Future<Output = Result<T, E>>
, P: Fn(&E) -> bool
{   let mut attempt = 0;
    loop
    {   attempt += 1;
        let outcome = op().await;
        match outcome
        {   Ok(value) => {
              info!(
                "Attempt {} of {} succeeded"
              , attempt, policy.max_attempts
              );
              return Ok(value);
            }
          , Err(e) => {
              info!(
                "Attempt {} of {} failed: {}"
              , attempt, policy.max_attempts, e
              );
              if !is_transient(&e) || attempt >= policy.max_attempts
              {   return Err(e);
              }
              let wait = policy.wait_for_attempt(attempt);
              info!(
                "Retrying in {:.2}s (attempt {} of {})"
              , wait.as_secs_f64(), attempt + 1, policy.max_attempts
              );
              tokio::time::sleep(wait).await;
            }
        }
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn instant(max_attempts: usize) -> RetryPolicy
    {   RetryPolicy::new(max_attempts, 0.0, Duration::ZERO)
    }

    #[test]
    fn default_policy_matches_documented_defaults()
    {   let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 6);
        assert_eq!(policy.backoff_ceiling(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_ceiling(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_ceiling(4), Duration::from_secs(8));
        assert_eq!(policy.backoff_ceiling(5), Duration::from_secs(10));
        assert_eq!(policy.backoff_ceiling(50), Duration::from_secs(10));
    }

    #[test]
    fn random_wait_stays_under_ceiling()
    {   let policy = RetryPolicy::default();
        for attempt in 1..=6
        {   for _ in 0..50
            {   let wait = policy.wait_for_attempt(attempt);
                assert!(wait <= policy.backoff_ceiling(attempt));
            }
        }
    }

    #[test]
    fn zero_attempts_still_calls_once()
    {   assert_eq!(RetryPolicy::new(0, 1.0, Duration::ZERO).max_attempts(), 1);
    }

    #[tokio::test]
    async fn transient_failures_below_limit_are_absorbed()
    {   let calls = AtomicUsize::new(0);
        let result: Result<&str, String> = retry(
          &instant(6)
        , |_| true
        , || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move
            {   if n < 6 { Err(format!("fail {n}")) } else { Ok("done") }
            }
          }
        ).await;
        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn exhausting_attempts_returns_last_error()
    {   let calls = AtomicUsize::new(0);
        let result: Result<(), String> = retry(
          &instant(6)
        , |_| true
        , || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err(format!("fail {n}")) }
          }
        ).await;
        assert_eq!(result, Err("fail 6".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn non_transient_error_is_not_retried()
    {   let calls = AtomicUsize::new(0);
        let result: Result<(), String> = retry(
          &instant(6)
        , |e: &String| e != "fatal"
        , || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("fatal".to_string()) }
          }
        ).await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
