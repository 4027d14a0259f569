use async_trait::async_trait;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_MAX_RETRIES: usize = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Suspends the current stage before its next attempt.
///
/// The default implementation sleeps on the tokio timer; tests substitute a
/// recorder so backoff can be asserted without waiting.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Backoff waits on the tokio timer
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Details of a failed attempt that is about to be retried
#[derive(Debug, Clone)]
pub struct RetryNotice {
    /// 1-based number of the attempt that failed
    pub attempt: usize,
    pub max_attempts: usize,
    pub delay: Duration,
    pub error: String,
}

/// Callback invoked before each backoff wait
pub type RetryCallback = Arc<dyn Fn(&RetryNotice) + Send + Sync>;

/// Bounded retry with exponential backoff and jitter.
///
/// Attempt `i` (0-based) that fails is followed by a wait of
/// `base_delay * (2^i + U[0, 1))`. There is no cap on the wait; bound it by
/// bounding `max_retries`.
#[derive(Clone)]
pub struct RetryPolicy {
    max_retries: usize,
    base_delay: Duration,
    delay: Arc<dyn Delay>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .finish()
    }
}

impl RetryPolicy {
    /// `max_retries` is the total number of attempts; 0 is treated as 1.
    pub fn new(max_retries: usize) -> Self {
        Self {
            max_retries: max_retries.max(1),
            base_delay: DEFAULT_BASE_DELAY,
            delay: Arc::new(TokioDelay),
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Wait before the attempt following failed attempt `attempt_index`
    pub fn backoff_delay(&self, attempt_index: usize) -> Duration {
        self.delay_for(attempt_index, rand::random::<f64>())
    }

    fn delay_for(&self, attempt_index: usize, jitter: f64) -> Duration {
        let exponent = i32::try_from(attempt_index).unwrap_or(i32::MAX);
        let factor = 2f64.powi(exponent) + jitter;
        Duration::try_from_secs_f64(self.base_delay.as_secs_f64() * factor)
            .unwrap_or(Duration::MAX)
    }

    /// Run `op` until it succeeds or attempts run out.
    ///
    /// The final failure is returned unchanged.
    pub async fn run<F, Fut, T, E>(&self, op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.run_with_callback(op, None).await
    }

    /// Like [`RetryPolicy::run`], notifying `on_retry` before every wait
    pub async fn run_with_callback<F, Fut, T, E>(
        &self,
        mut op: F,
        on_retry: Option<RetryCallback>,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt_index = 0usize;

        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if attempt_index + 1 >= self.max_retries {
                debug!(
                    attempts = self.max_retries,
                    error = %err,
                    "Retry attempts exhausted"
                );
                return Err(err);
            }

            let delay = self.backoff_delay(attempt_index);
            let notice = RetryNotice {
                attempt: attempt_index + 1,
                max_attempts: self.max_retries,
                delay,
                error: err.to_string(),
            };
            drop(err);

            warn!(
                attempt = notice.attempt,
                max_attempts = notice.max_attempts,
                delay_secs = delay.as_secs_f64(),
                error = %notice.error,
                "Operation failed, retrying"
            );
            if let Some(ref callback) = on_retry {
                callback(&notice);
            }

            self.delay.wait(delay).await;
            attempt_index += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingDelay {
        waits: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Delay for RecordingDelay {
        async fn wait(&self, duration: Duration) {
            self.waits.lock().unwrap().push(duration);
        }
    }

    fn policy(max_retries: usize) -> (RetryPolicy, Arc<RecordingDelay>) {
        let delay = Arc::new(RecordingDelay::default());
        let policy = RetryPolicy::new(max_retries).with_delay(delay.clone());
        (policy, delay)
    }

    #[tokio::test]
    async fn test_always_failing_op_runs_max_attempts() {
        let (policy, delay) = policy(3);
        let mut calls = 0;

        let result: Result<(), String> = policy
            .run(|| {
                calls += 1;
                let n = calls;
                async move { Err(format!("failure {}", n)) }
            })
            .await;

        assert_eq!(calls, 3);
        assert_eq!(result.unwrap_err(), "failure 3");
        assert_eq!(delay.waits.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_success_on_second_attempt_stops_retrying() {
        let (policy, delay) = policy(3);
        let mut calls = 0;

        let result: Result<usize, String> = policy
            .run(|| {
                calls += 1;
                let n = calls;
                async move {
                    if n < 2 {
                        Err("transient".to_string())
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls, 2);
        assert_eq!(delay.waits.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_single_attempt_never_waits() {
        let (policy, delay) = policy(1);
        let mut calls = 0;

        let result: Result<(), &str> = policy
            .run(|| {
                calls += 1;
                async { Err("nope") }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls, 1);
        assert!(delay.waits.lock().unwrap().is_empty());
    }

    #[test]
    fn test_zero_retries_clamped_to_one_attempt() {
        assert_eq!(RetryPolicy::new(0).max_retries(), 1);
    }

    #[tokio::test]
    async fn test_waits_grow_exponentially_within_jitter() {
        let (policy, delay) = policy(4);
        let policy = policy.with_base_delay(Duration::from_millis(100));

        let _: Result<(), &str> = policy.run(|| async { Err("down") }).await;

        let waits = delay.waits.lock().unwrap().clone();
        assert_eq!(waits.len(), 3);
        for (i, wait) in waits.iter().enumerate() {
            let low = 100.0 * 2f64.powi(i as i32);
            let ms = wait.as_secs_f64() * 1000.0;
            assert!(ms >= low - 1e-6 && ms < low + 100.0, "wait {} = {}ms", i, ms);
        }
    }

    #[test]
    fn test_delay_formula() {
        let policy = RetryPolicy::new(3);
        assert_eq!(policy.delay_for(0, 0.5), Duration::from_millis(1500));
        assert_eq!(policy.delay_for(2, 0.0), Duration::from_secs(4));
    }

    #[test]
    fn test_huge_attempt_index_saturates() {
        let policy = RetryPolicy::new(3);
        assert_eq!(policy.delay_for(5000, 0.0), Duration::MAX);
    }

    #[tokio::test]
    async fn test_callback_receives_each_retry() {
        let (policy, _delay) = policy(3);
        let seen: Arc<Mutex<Vec<RetryNotice>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: RetryCallback = Arc::new(move |notice: &RetryNotice| {
            sink.lock().unwrap().push(notice.clone());
        });

        let _: Result<(), &str> = policy
            .run_with_callback(|| async { Err("boom") }, Some(callback))
            .await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].attempt, 1);
        assert_eq!(seen[1].attempt, 2);
        assert_eq!(seen[1].max_attempts, 3);
        assert_eq!(seen[0].error, "boom");
    }
}
