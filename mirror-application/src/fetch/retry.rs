use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use mirror_domain::{RemoteError, RemoteErrorKind, RetryPolicy};
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::SyncMetrics;

/// How a failed attempt should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    RateLimited { retry_after: Option<Duration> },
    ServerError,
    Fatal,
}

/// Raised in place of the operation's own error when an attempt overruns its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineExceeded(pub Duration);

impl From<DeadlineExceeded> for RemoteError {
    fn from(value: DeadlineExceeded) -> Self {
        RemoteError::timeout(value.0)
    }
}

#[derive(Debug)]
pub enum RetryError<E> {
    /// Not worth retrying: malformed request, auth, missing entity.
    Fatal { attempts: u32, error: E },
    /// Every attempt failed transiently.
    Exhausted { attempts: u32, last: E },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Fatal { attempts, .. } | RetryError::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn inner(&self) -> &E {
        match self {
            RetryError::Fatal { error, .. } => error,
            RetryError::Exhausted { last, .. } => last,
        }
    }

    pub fn into_inner(self) -> E {
        match self {
            RetryError::Fatal { error, .. } => error,
            RetryError::Exhausted { last, .. } => last,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Fatal { attempts, error } => {
                write!(f, "fatal error after {} attempt(s): {}", attempts, error)
            }
            RetryError::Exhausted { attempts, last } => {
                write!(f, "gave up after {} attempt(s): {}", attempts, last)
            }
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}

pub fn classify_remote(err: &RemoteError) -> FailureClass {
    match err.kind {
        RemoteErrorKind::RateLimited => FailureClass::RateLimited {
            retry_after: err.retry_after,
        },
        RemoteErrorKind::Transport | RemoteErrorKind::Timeout => FailureClass::ServerError,
        RemoteErrorKind::Http => match err.status {
            Some(429) => FailureClass::RateLimited {
                retry_after: err.retry_after,
            },
            Some(status) if status >= 500 => FailureClass::ServerError,
            _ => FailureClass::Fatal,
        },
        RemoteErrorKind::GraphQl | RemoteErrorKind::Malformed | RemoteErrorKind::NotFound => {
            FailureClass::Fatal
        }
    }
}

/// Wraps a remote operation with per-attempt deadlines and bounded backoff.
#[derive(Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    metrics: Option<Arc<SyncMetrics>>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<SyncMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn run<T, E, F, Fut, C>(
        &self,
        label: &str,
        classify: C,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> FailureClass,
        E: From<DeadlineExceeded> + fmt::Display,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            if let Some(metrics) = &self.metrics {
                metrics.record_request();
            }

            let outcome = match timeout(self.policy.attempt_timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(E::from(DeadlineExceeded(self.policy.attempt_timeout))),
            };
            let err = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded on attempt {}", label, attempt);
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            let class = classify(&err);
            let wait = match class {
                FailureClass::Fatal => {
                    return Err(RetryError::Fatal {
                        attempts: attempt,
                        error: err,
                    })
                }
                FailureClass::RateLimited { retry_after } => {
                    self.policy.rate_limit_wait(retry_after)
                }
                FailureClass::ServerError => self.policy.server_backoff(attempt),
            };

            if attempt >= max_attempts {
                warn!("{} failed after {} attempt(s): {}", label, attempt, err);
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: err,
                });
            }

            warn!(
                "{} failed (attempt {}/{}): {}; retrying in {}ms",
                label,
                attempt,
                max_attempts,
                err,
                wait.as_millis()
            );
            if let Some(metrics) = &self.metrics {
                metrics.record_retry(matches!(class, FailureClass::RateLimited { .. }));
            }
            sleep(wait).await;
        }
    }

    pub async fn run_remote<T, F, Fut>(
        &self,
        label: &str,
        operation: F,
    ) -> Result<T, RetryError<RemoteError>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        self.run(label, classify_remote, operation).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            rate_limit_floor: Duration::from_secs(60),
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(60),
            attempt_timeout: Duration::from_secs(30),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_server_errors_until_success() {
        let executor = RetryExecutor::new(policy(5));
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let value = executor
            .run_remote("flaky", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(RemoteError::http(503, None, "unavailable"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await
            .expect("third attempt succeeds");

        assert_eq!(value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s then 2s of backoff
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_waits_at_least_the_floor() {
        let executor = RetryExecutor::new(policy(3));
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        executor
            .run_remote("limited", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(RemoteError::rate_limited(None))
                    } else {
                        Ok(())
                    }
                }
            })
            .await
            .expect("second attempt succeeds");

        assert_eq!(started.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_honors_server_hint() {
        let executor = RetryExecutor::new(policy(3));
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        executor
            .run_remote("limited", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(RemoteError::rate_limited(Some(Duration::from_secs(5))))
                    } else {
                        Ok(())
                    }
                }
            })
            .await
            .expect("second attempt succeeds");

        assert_eq!(started.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let executor = RetryExecutor::new(policy(4));
        let calls = AtomicU32::new(0);

        let err = executor
            .run_remote("down", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(RemoteError::http(502, None, "bad gateway")) }
            })
            .await
            .expect_err("never succeeds");

        assert!(err.is_exhausted());
        assert_eq!(err.attempts(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_errors_are_not_retried() {
        let executor = RetryExecutor::new(policy(10));
        let calls = AtomicU32::new(0);

        let err = executor
            .run_remote("bad request", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(RemoteError::http(400, None, "bad request")) }
            })
            .await
            .expect_err("fatal");

        assert!(!err.is_exhausted());
        assert_eq!(err.attempts(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_attempts_count_as_transient() {
        let executor = RetryExecutor::new(policy(2));
        let calls = AtomicU32::new(0);

        let err = executor
            .run_remote("slow", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    sleep(Duration::from_secs(120)).await;
                    Ok::<(), RemoteError>(())
                }
            })
            .await
            .expect_err("every attempt times out");

        assert!(err.is_exhausted());
        assert_eq!(err.inner().kind, RemoteErrorKind::Timeout);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn classification_matches_status() {
        assert_eq!(
            classify_remote(&RemoteError::http(500, None, "x")),
            FailureClass::ServerError
        );
        assert_eq!(
            classify_remote(&RemoteError::http(404, None, "x")),
            FailureClass::Fatal
        );
        assert_eq!(
            classify_remote(&RemoteError::malformed("x")),
            FailureClass::Fatal
        );
        assert!(matches!(
            classify_remote(&RemoteError::http(429, Some(Duration::from_secs(3)), "x")),
            FailureClass::RateLimited {
                retry_after: Some(_)
            }
        ));
    }
}
