//! Bounded exponential-backoff retry for arbitrary async operations.

use crate::config::RetryConfig;
use crate::error::RetryConfigError;
use rand::Rng;
use skillflow_core::{ErrorKind, SkillError};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Maps an error onto an [`ErrorKind`] so the default policy can decide
/// whether to retry.
pub trait Classify {
    fn error_kind(&self) -> ErrorKind;
}

impl Classify for SkillError {
    fn error_kind(&self) -> ErrorKind {
        self.kind()
    }
}

impl Classify for std::io::Error {
    fn error_kind(&self) -> ErrorKind {
        use std::io::ErrorKind as Io;
        match self.kind() {
            Io::TimedOut => ErrorKind::Timeout,
            Io::Interrupted
            | Io::WouldBlock
            | Io::ConnectionReset
            | Io::ConnectionAborted
            | Io::ConnectionRefused
            | Io::BrokenPipe => ErrorKind::Transient,
            Io::NotFound => ErrorKind::NotFound,
            Io::PermissionDenied => ErrorKind::Permission,
            Io::InvalidInput | Io::InvalidData => ErrorKind::Validation,
            _ => ErrorKind::Unknown,
        }
    }
}

/// Why a retried operation ultimately failed.
#[derive(Error, Debug)]
pub enum RetryFailure<E> {
    /// Every allowed attempt failed; holds the last error.
    #[error("retries exhausted: {0}")]
    Exhausted(E),

    /// The error was classified as not worth retrying.
    #[error("non-retryable error: {0}")]
    NonRetryable(E),

    /// The overall timeout elapsed before the loop finished.
    #[error("retry loop timed out after {}ms", limit.as_millis())]
    TimedOut {
        limit: Duration,
        /// The most recent error seen before the deadline, if any.
        last_error: Option<E>,
    },
}

impl<E> RetryFailure<E> {
    /// The last operation error, when one was observed.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            RetryFailure::Exhausted(e) | RetryFailure::NonRetryable(e) => Some(e),
            RetryFailure::TimedOut { last_error, .. } => last_error.as_ref(),
        }
    }
}

/// Result of [`RetryStrategy::execute`] plus attempt bookkeeping.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, RetryFailure<E>>,
    /// Attempts started, including the first.
    pub attempts: u32,
    /// Sum of backoff delays scheduled between attempts.
    pub total_delay: Duration,
}

impl<T, E> RetryOutcome<T, E> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> Result<T, RetryFailure<E>> {
        self.result
    }
}

struct LoopStats<E> {
    attempts: u32,
    total_delay: Duration,
    last_error: Option<E>,
}

/// Wraps an operation with bounded exponential-backoff retry.
///
/// `delay(attempt) = min(initial_delay * multiplier^(attempt-1), max_delay)`,
/// optionally scaled by a random factor in `[0.5, 1.0]`.
///
/// # Examples
///
/// ```
/// use skillflow::{RetryConfig, RetryStrategy};
/// use skillflow_core::SkillError;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() {
/// let strategy = RetryStrategy::new(RetryConfig::exponential(3, Duration::from_millis(1))).unwrap();
///
/// let outcome = strategy
///     .execute("fetch", |attempt| async move {
///         if attempt < 2 {
///             Err(SkillError::Transient("connection reset".into()))
///         } else {
///             Ok("payload")
///         }
///     })
///     .await;
///
/// assert_eq!(outcome.attempts, 2);
/// assert_eq!(outcome.result.unwrap(), "payload");
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RetryStrategy {
    config: RetryConfig,
}

impl RetryStrategy {
    pub fn new(config: RetryConfig) -> Result<Self, RetryConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Backoff before the retry that follows failed attempt `attempt` (1-based), without jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let factor = self.config.multiplier.powi(exponent);
        let max_ms = self.config.max_delay_ms as f64;
        let ms = (self.config.initial_delay_ms as f64 * factor).min(max_ms);
        Duration::from_millis(ms as u64)
    }

    fn next_delay(&self, attempt: u32) -> Duration {
        let delay = self.delay_for_attempt(attempt);
        if self.config.jitter {
            delay.mul_f64(rand::thread_rng().gen_range(0.5..=1.0))
        } else {
            delay
        }
    }

    /// Runs `op` with the default classification: timeouts, transient and
    /// unclassified errors are retried; validation, permission and
    /// not-found errors are not.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn execute<T, E, F, Fut>(&self, label: &str, op: F) -> RetryOutcome<T, E>
    where
        E: Classify + Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_if(label, op, |e: &E, _| e.error_kind().is_retryable())
            .await
    }

    /// Runs `op`, asking `should_retry(error, attempt)` whether a failure may be retried.
    pub async fn execute_if<T, E, F, Fut, P>(
        &self,
        label: &str,
        op: F,
        should_retry: P,
    ) -> RetryOutcome<T, E>
    where
        E: Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E, u32) -> bool,
    {
        let mut stats = LoopStats {
            attempts: 0,
            total_delay: Duration::ZERO,
            last_error: None,
        };

        let looped = self.run(label, op, &should_retry, &mut stats);
        let result = match self.config.overall_timeout() {
            Some(limit) => match tokio::time::timeout(limit, looped).await {
                Ok(result) => result,
                Err(_) => Err(RetryFailure::TimedOut {
                    limit,
                    last_error: None,
                }),
            },
            None => looped.await,
        };

        let result = match result {
            Err(RetryFailure::TimedOut { limit, .. }) => {
                warn!(
                    label,
                    attempts = stats.attempts,
                    "Retry loop timed out after {}ms",
                    limit.as_millis()
                );
                Err(RetryFailure::TimedOut {
                    limit,
                    last_error: stats.last_error.take(),
                })
            }
            other => other,
        };

        RetryOutcome {
            result,
            attempts: stats.attempts,
            total_delay: stats.total_delay,
        }
    }

    async fn run<T, E, F, Fut, P>(
        &self,
        label: &str,
        mut op: F,
        should_retry: &P,
        stats: &mut LoopStats<E>,
    ) -> Result<T, RetryFailure<E>>
    where
        E: Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E, u32) -> bool,
    {
        let max_attempts = self.config.max_retries.saturating_add(1);

        loop {
            stats.attempts += 1;
            let attempt = stats.attempts;

            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(label, attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if !should_retry(&error, attempt) {
                        warn!(label, attempt, %error, "Operation failed with non-retryable error");
                        return Err(RetryFailure::NonRetryable(error));
                    }
                    if attempt >= max_attempts {
                        warn!(label, attempt, %error, "Operation failed, retries exhausted");
                        return Err(RetryFailure::Exhausted(error));
                    }

                    let delay = self.next_delay(attempt);
                    info!(
                        label,
                        %error,
                        "Operation failed, retrying ({}/{}) in {}ms",
                        attempt,
                        self.config.max_retries,
                        delay.as_millis()
                    );
                    stats.last_error = Some(error);
                    stats.total_delay += delay;
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self {
            config: RetryConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn strategy(max_retries: u32) -> RetryStrategy {
        RetryStrategy::new(RetryConfig::exponential(
            max_retries,
            Duration::from_millis(100),
        ))
        .unwrap()
    }

    #[test]
    fn test_delay_for_attempt() {
        let strategy = RetryStrategy::new(RetryConfig {
            max_retries: 10,
            initial_delay_ms: 100,
            max_delay_ms: 1_000,
            multiplier: 2.0,
            jitter: false,
            overall_timeout_ms: None,
        })
        .unwrap();

        assert_eq!(strategy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(strategy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(strategy.delay_for_attempt(3), Duration::from_millis(400));
        // capped at max_delay
        assert_eq!(strategy.delay_for_attempt(10), Duration::from_secs(1));
        assert_eq!(strategy.delay_for_attempt(u32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let strategy = RetryStrategy::new(
            RetryConfig::exponential(3, Duration::from_millis(1_000)).with_jitter(true),
        )
        .unwrap();

        for _ in 0..50 {
            let delay = strategy.next_delay(1);
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(1_000));
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = RetryStrategy::new(RetryConfig {
            multiplier: 0.0,
            ..RetryConfig::default()
        });
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let outcome = strategy(5)
            .execute("flaky", |attempt| async move {
                if attempt < 3 {
                    Err(SkillError::Transient(format!("attempt {}", attempt)))
                } else {
                    Ok(attempt)
                }
            })
            .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.total_delay, Duration::from_millis(300));
        assert_eq!(outcome.result.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_last_error() {
        let outcome: RetryOutcome<(), _> = strategy(2)
            .execute("down", |attempt| async move {
                Err(SkillError::Timeout {
                    skill: format!("fetch-{}", attempt),
                    timeout: Duration::from_millis(10),
                })
            })
            .await;

        assert_eq!(outcome.attempts, 3);
        match outcome.result {
            Err(RetryFailure::Exhausted(SkillError::Timeout { skill, .. })) => {
                assert_eq!(skill, "fetch-3");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_stops_immediately() {
        let calls = AtomicU32::new(0);
        let outcome: RetryOutcome<(), _> = strategy(5)
            .execute("validate", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SkillError::InvalidInput("missing field".into())) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.total_delay, Duration::ZERO);
        assert!(matches!(outcome.result, Err(RetryFailure::NonRetryable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_predicate_overrides_classification() {
        let outcome = strategy(5)
            .execute_if(
                "custom",
                |attempt| async move {
                    if attempt < 2 {
                        Err(SkillError::NotFound("not yet visible".into()))
                    } else {
                        Ok("visible")
                    }
                },
                |e: &SkillError, _| matches!(e, SkillError::NotFound(_)),
            )
            .await;

        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.result.unwrap(), "visible");
    }

    #[tokio::test(start_paused = true)]
    async fn test_overall_timeout() {
        let strategy = RetryStrategy::new(
            RetryConfig::fixed(10, Duration::from_millis(10))
                .with_overall_timeout(Duration::from_millis(150)),
        )
        .unwrap();

        let outcome: RetryOutcome<(), SkillError> = strategy
            .execute("slow", |_| async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Err(SkillError::Transient("still busy".into()))
            })
            .await;

        assert_eq!(outcome.attempts, 2);
        match outcome.result {
            Err(RetryFailure::TimedOut { limit, last_error }) => {
                assert_eq!(limit, Duration::from_millis(150));
                assert!(last_error.is_some());
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_io_error_classification() {
        use std::io;
        let timeout = io::Error::new(io::ErrorKind::TimedOut, "slow");
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "no");
        assert_eq!(timeout.error_kind(), ErrorKind::Timeout);
        assert_eq!(denied.error_kind(), ErrorKind::Permission);
    }
}
