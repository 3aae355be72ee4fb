use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::trace;

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Fixed-delay retry for transport failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    retries: usize,
    delay: Duration,
}

impl RetryPolicy {
    pub fn new(retries: usize) -> Self {
        Self {
            retries,
            delay: DEFAULT_RETRY_DELAY,
        }
    }

    #[cfg(test)]
    pub fn with_delay(retries: usize, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// Run `operation` once plus up to `retries` more times, returning the
    /// first success or the last error.
    pub async fn run<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.retries {
                        return Err(e);
                    }
                    trace!("Attempt {}/{} failed: {}", attempt, self.retries + 1, e);
                    sleep(self.delay).await;
                }
            }
        }
    }
}
