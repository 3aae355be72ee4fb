use super::aggregator::Aggregator;
use super::filter::count_lines;
use super::http::{is_directory, resolve_url, Transport};
use super::producer;
use super::queue::JobQueue;
use super::rate_limiter::RateLimiter;
use super::retry::RetryPolicy;
use crate::config::{ScanConfig, Wordlist};
use crate::scan::models::{Job, ScanResult};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Everything the workers of one run share. Outlives pause/resume cycles.
pub struct RunContext {
    pub config: Arc<ScanConfig>,
    pub wordlist: Wordlist,
    pub queue: Arc<JobQueue>,
    pub limiter: RateLimiter,
    pub transport: Arc<dyn Transport>,
    pub aggregator: Arc<Aggregator>,
    pub retry: RetryPolicy,
    /// Run-scoped: fires on restart or quit, stops every producer.
    pub shutdown: CancellationToken,
    pub started: Instant,
}

pub struct Worker {
    id: usize,
    ctx: Arc<RunContext>,
    cancel: CancellationToken,
}

impl Worker {
    pub fn new(id: usize, ctx: Arc<RunContext>, cancel: CancellationToken) -> Self {
        Self { id, ctx, cancel }
    }

    /// Pull jobs until the queue closes or `cancel` fires.
    ///
    /// Cancellation is checked before each dequeue, so a job that has been
    /// taken off the queue is always processed to the end.
    pub async fn run(self) {
        let mut handled = 0usize;
        loop {
            let job = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                job = self.ctx.queue.pop() => match job {
                    Some(job) => job,
                    None => break,
                },
            };
            self.process(&job).await;
            self.ctx.queue.job_done();
            handled += 1;
        }
        tracing::trace!("Worker {} exiting after {} jobs", self.id, handled);
    }

    async fn process(&self, job: &Job) {
        let ctx = &self.ctx;
        let config = &ctx.config;

        let url = resolve_url(&config.target, &job.path);
        ctx.aggregator.record_attempt(&url, ctx.started);

        ctx.limiter.wait().await;
        if !config.delay.is_zero() {
            tokio::time::sleep(config.delay).await;
        }

        let response = match ctx.retry.run(|| ctx.transport.probe(&url)).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Dropping {} after {} retries: {}", url, config.retries, e);
                return;
            }
        };

        let size = response.body.len();
        let lines = count_lines(&response.body);
        if config.filters.excludes(size, lines, &response.body) {
            tracing::trace!("Filtered {} (size {}, lines {})", url, size, lines);
            return;
        }

        if !config.status_codes.contains(&response.status) {
            return;
        }

        let status = response.status;
        ctx.aggregator.push_result(ScanResult {
            path: url.clone(),
            status,
            size,
            lines,
        });

        if config.recursive && job.depth < config.max_depth && is_directory(&url, status) {
            tracing::debug!("Recursing into {} (depth {})", url, job.depth + 1);
            ctx.aggregator.record_recursion();
            producer::spawn_recursive(&ctx.queue, job, ctx.wordlist.clone(), ctx.shutdown.clone());
        }
    }
}

/// Start `size` workers against the shared queue.
pub fn spawn_pool(ctx: &Arc<RunContext>, size: usize, cancel: &CancellationToken) -> JoinSet<()> {
    let mut pool = JoinSet::new();
    for id in 0..size.max(1) {
        pool.spawn(Worker::new(id, Arc::clone(ctx), cancel.clone()).run());
    }
    pool
}
