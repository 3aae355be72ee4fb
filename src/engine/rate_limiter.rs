use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::AbortHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Highest rate the bucket honours; larger requests are capped to it.
pub const MAX_RATE: u32 = 100_000;

/// Token bucket shared by every worker of a run.
///
/// The bucket starts full with `rate` tokens and regains one token every
/// `1/rate` seconds; refills that find the bucket full are dropped.
pub struct RateLimiter {
    tokens: Option<Mutex<mpsc::Receiver<()>>>,
    refill: Option<AbortHandle>,
    rate: u32,
}

impl RateLimiter {
    /// A rate of zero disables limiting entirely. Rates above [`MAX_RATE`]
    /// are capped. Must be called inside a tokio runtime.
    pub fn new(rate: u32) -> Self {
        if rate == 0 {
            return Self::unlimited();
        }
        if rate > MAX_RATE {
            tracing::warn!("Rate limit {} req/s capped to {}", rate, MAX_RATE);
        }
        let rate = rate.min(MAX_RATE);

        let (tx, rx) = mpsc::channel(rate as usize);
        for _ in 0..rate {
            let _ = tx.try_send(());
        }

        let period = refill_period(rate);
        let refill = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(mpsc::error::TrySendError::Closed(_)) = tx.try_send(()) {
                    break;
                }
            }
        });

        tracing::debug!("Rate limiter enabled: {} req/s (one token every {:?})", rate, period);

        Self {
            tokens: Some(Mutex::new(rx)),
            refill: Some(refill.abort_handle()),
            rate,
        }
    }

    pub fn unlimited() -> Self {
        Self {
            tokens: None,
            refill: None,
            rate: 0,
        }
    }

    #[cfg(test)]
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Block until a token is available, then consume it.
    pub async fn wait(&self) {
        let Some(tokens) = &self.tokens else {
            return;
        };
        // None means the refill task is gone; nothing left to throttle
        let _ = tokens.lock().await.recv().await;
    }

    /// Halt refilling. Tokens already in the bucket can still be consumed.
    pub fn stop(&self) {
        if let Some(refill) = &self.refill {
            refill.abort();
        }
    }
}

/// Time between refills, never zero.
fn refill_period(rate: u32) -> Duration {
    (Duration::from_secs(1) / rate.max(1)).max(Duration::from_nanos(1))
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.stop();
    }
}
