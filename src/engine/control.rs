use super::aggregator::Aggregator;
use super::http::Transport;
use super::producer::JobProducer;
use super::queue::JobQueue;
use super::rate_limiter::RateLimiter;
use super::retry::RetryPolicy;
use super::worker::{spawn_pool, RunContext};
use crate::config::{ScanConfig, Wordlist};
use crate::scan::errors::ScanError;
use crate::scan::events::{EventSender, ScanEvent};
use crate::scan::models::{ScanResult, ScanState, Stats};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Scan lifecycle owner.
///
/// ```text
/// Ready --start--> Scanning --pause--> Paused --resume--> Scanning
/// Scanning --(pool drained)--> Completed
/// Completed | Paused --reset--> Ready
/// ```
///
/// Control operations must be called from within a tokio runtime.
#[derive(Clone)]
pub struct ControlPlane {
    inner: Arc<Inner>,
}

struct Inner {
    config: Arc<ScanConfig>,
    transport: Arc<dyn Transport>,
    events: Option<EventSender>,
    slot: Mutex<Slot>,
}

struct Slot {
    state: ScanState,
    aggregator: Arc<Aggregator>,
    run: Option<ActiveRun>,
    /// Bumped for every pool launch so a stale supervisor cannot complete a newer pool.
    generation: u64,
}

struct ActiveRun {
    ctx: Arc<RunContext>,
    pool_cancel: CancellationToken,
}

impl ControlPlane {
    pub fn new(config: ScanConfig, transport: Arc<dyn Transport>, events: Option<EventSender>) -> Self {
        let aggregator = Arc::new(Aggregator::new(events.clone()));
        Self {
            inner: Arc::new(Inner {
                config: Arc::new(config),
                transport,
                events,
                slot: Mutex::new(Slot {
                    state: ScanState::Ready,
                    aggregator,
                    run: None,
                    generation: 0,
                }),
            }),
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.inner.config
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.inner.transport)
    }

    pub fn state(&self) -> ScanState {
        self.inner.lock().state
    }

    pub fn results(&self) -> Vec<ScanResult> {
        self.inner.lock().aggregator.results()
    }

    pub fn stats(&self) -> Stats {
        self.inner.lock().aggregator.stats()
    }

    /// Ready -> Scanning: load the wordlist and launch producer and workers.
    pub fn start(&self) -> Result<(), ScanError> {
        self.expect_ready()?;
        let config = Arc::clone(&self.inner.config);
        // file I/O stays outside the slot lock
        let wordlist = Wordlist::load(&config.wordlist)?;

        let mut slot = self.inner.lock();
        if slot.state != ScanState::Ready {
            return Err(ScanError::IllegalTransition {
                from: slot.state,
                action: "start",
            });
        }

        let queue = JobQueue::new(config.threads);
        let shutdown = CancellationToken::new();
        let producer = JobProducer::new(&queue, wordlist.clone(), config.extensions.clone().into(), shutdown.clone());

        let ctx = Arc::new(RunContext {
            limiter: RateLimiter::new(config.rate_limit),
            retry: RetryPolicy::new(config.retries),
            transport: Arc::clone(&self.inner.transport),
            aggregator: Arc::clone(&slot.aggregator),
            started: Instant::now(),
            config,
            wordlist,
            queue,
            shutdown,
        });

        tracing::info!(
            "Starting scan of {} with {} words, {} extensions, {} workers",
            ctx.config.target,
            ctx.wordlist.len(),
            ctx.config.extensions.len(),
            ctx.config.threads
        );

        tokio::spawn(producer.run());
        let run = self.inner.launch_pool(&mut slot, ctx);
        slot.run = Some(run);
        self.inner.transition(&mut slot, ScanState::Scanning);
        Ok(())
    }

    fn expect_ready(&self) -> Result<(), ScanError> {
        match self.state() {
            ScanState::Ready => Ok(()),
            from => Err(ScanError::IllegalTransition { from, action: "start" }),
        }
    }

    /// Scanning -> Paused: workers finish their current job and stop.
    pub fn pause(&self) -> Result<(), ScanError> {
        let mut slot = self.inner.lock();
        if slot.state != ScanState::Scanning {
            return Err(ScanError::IllegalTransition {
                from: slot.state,
                action: "pause",
            });
        }
        if let Some(run) = &slot.run {
            run.pool_cancel.cancel();
        }
        self.inner.transition(&mut slot, ScanState::Paused);
        Ok(())
    }

    /// Paused -> Scanning: a fresh pool continues on the same queue.
    pub fn resume(&self) -> Result<(), ScanError> {
        let mut slot = self.inner.lock();
        if slot.state != ScanState::Paused {
            return Err(ScanError::IllegalTransition {
                from: slot.state,
                action: "resume",
            });
        }
        let Some(ctx) = slot.run.as_ref().map(|run| Arc::clone(&run.ctx)) else {
            return Err(ScanError::IllegalTransition {
                from: slot.state,
                action: "resume",
            });
        };
        let run = self.inner.launch_pool(&mut slot, ctx);
        slot.run = Some(run);
        self.inner.transition(&mut slot, ScanState::Scanning);
        Ok(())
    }

    /// Completed | Paused -> Ready: discard the run, its results and stats.
    pub fn reset(&self) -> Result<(), ScanError> {
        let mut slot = self.inner.lock();
        if !matches!(slot.state, ScanState::Completed | ScanState::Paused) {
            return Err(ScanError::IllegalTransition {
                from: slot.state,
                action: "reset",
            });
        }
        if let Some(run) = slot.run.take() {
            run.teardown();
        }
        slot.aggregator.detach();
        slot.aggregator = Arc::new(Aggregator::new(self.inner.events.clone()));
        self.inner.transition(&mut slot, ScanState::Ready);
        Ok(())
    }

    /// Reset followed by start.
    pub fn restart(&self) -> Result<(), ScanError> {
        self.reset()?;
        self.start()
    }

    /// Pause if scanning, then stop every task of the run. Results are kept.
    pub fn quit(&self) {
        if self.state() == ScanState::Scanning {
            let _ = self.pause();
        }
        let mut slot = self.inner.lock();
        if let Some(run) = slot.run.take() {
            run.teardown();
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn transition(&self, slot: &mut Slot, next: ScanState) {
        tracing::info!("Scan state: {} -> {}", slot.state, next);
        slot.state = next;
        self.emit(ScanEvent::StateChanged(next));
    }

    fn emit(&self, event: ScanEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    /// Spawn a worker pool plus a supervisor that completes the scan once the
    /// pool drains on a closed queue.
    fn launch_pool(self: &Arc<Self>, slot: &mut Slot, ctx: Arc<RunContext>) -> ActiveRun {
        slot.generation += 1;
        let generation = slot.generation;
        let pool_cancel = CancellationToken::new();
        let mut pool = spawn_pool(&ctx, ctx.config.threads, &pool_cancel);

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(joined) = pool.join_next().await {
                if let Err(e) = joined {
                    tracing::error!("Worker task failed: {}", e);
                }
            }
            inner.on_pool_drained(generation);
        });

        ActiveRun { ctx, pool_cancel }
    }

    fn on_pool_drained(&self, generation: u64) {
        let mut slot = self.lock();
        if slot.generation != generation || slot.state != ScanState::Scanning {
            return;
        }
        if let Some(run) = &slot.run {
            run.ctx.limiter.stop();
            let stats = run.ctx.aggregator.stats();
            tracing::info!(
                "Scan complete: {} processed, {} found in {}",
                stats.processed_count,
                stats.found_count,
                stats.elapsed
            );
        }
        self.transition(&mut slot, ScanState::Completed);
        self.emit(ScanEvent::Completed);
    }
}

impl ActiveRun {
    fn teardown(&self) {
        self.pool_cancel.cancel();
        self.ctx.shutdown.cancel();
        self.ctx.limiter.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{collect_until_completed, wordlist_file, MockTransport};
    use crate::scan::events;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn config(target: &str, wordlist: &tempfile::NamedTempFile) -> ScanConfig {
        ScanConfig {
            target: target.to_string(),
            wordlist: wordlist.path().to_path_buf(),
            threads: 4,
            retries: 0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fuzz_template_with_extensions_issues_four_probes() {
        let words = wordlist_file(&["admin", "login"]);
        let transport = Arc::new(MockTransport::new().with_status("http://x/admin", 200).with_status("http://x/login.php", 301));
        let (tx, mut rx) = events::channel();
        let plane = ControlPlane::new(
            ScanConfig {
                extensions: vec![".php".to_string()],
                status_codes: [200, 301].into_iter().collect(),
                ..config("http://x/FUZZ", &words)
            },
            transport.clone(),
            Some(tx),
        );

        plane.start().unwrap();
        assert_eq!(plane.state(), ScanState::Scanning);
        collect_until_completed(&mut rx).await;

        assert_eq!(plane.state(), ScanState::Completed);
        let probed: BTreeSet<String> = transport.probed().into_iter().collect();
        assert_eq!(
            probed,
            ["http://x/admin", "http://x/admin.php", "http://x/login", "http://x/login.php"]
                .into_iter()
                .map(String::from)
                .collect()
        );

        let found: BTreeSet<(String, u16)> = plane.results().into_iter().map(|r| (r.path, r.status)).collect();
        assert_eq!(
            found,
            [("http://x/admin".to_string(), 200), ("http://x/login.php".to_string(), 301)]
                .into_iter()
                .collect()
        );
        let stats = plane.stats();
        assert_eq!(stats.processed_count, 4);
        assert_eq!(stats.found_count, 2);
    }

    #[tokio::test]
    async fn test_result_carries_size_and_lines() {
        let words = wordlist_file(&["robots.txt"]);
        let transport = Arc::new(MockTransport::new().with_response("http://x/robots.txt", 200, b"User-agent: *\nDisallow: /"));
        let (tx, mut rx) = events::channel();
        let plane = ControlPlane::new(config("http://x", &words), transport, Some(tx));

        plane.start().unwrap();
        let results = collect_until_completed(&mut rx).await;

        assert_eq!(
            results,
            vec![ScanResult {
                path: "http://x/robots.txt".to_string(),
                status: 200,
                size: 25,
                lines: 2,
            }]
        );
    }

    #[tokio::test]
    async fn test_filtered_and_unmatched_responses_are_dropped() {
        let words = wordlist_file(&["empty", "missing", "ok"]);
        let transport = Arc::new(
            MockTransport::new()
                .with_response("http://x/empty", 200, b"")
                .with_response("http://x/ok", 200, b"hello"),
        );
        let (tx, mut rx) = events::channel();
        let mut cfg = config("http://x", &words);
        cfg.filters.sizes = Some([0].into_iter().collect());
        let plane = ControlPlane::new(cfg, transport, Some(tx));

        plane.start().unwrap();
        let results = collect_until_completed(&mut rx).await;

        let paths: Vec<String> = results.into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["http://x/ok"]);
        assert_eq!(plane.stats().processed_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failures_retried_then_dropped() {
        let words = wordlist_file(&["flaky", "down"]);
        let transport = Arc::new(
            MockTransport::new()
                .with_status("http://x/flaky", 200)
                .with_failures("http://x/flaky", 2)
                .with_failures("http://x/down", usize::MAX),
        );
        let (tx, mut rx) = events::channel();
        let plane = ControlPlane::new(
            ScanConfig {
                retries: 2,
                ..config("http://x", &words)
            },
            transport.clone(),
            Some(tx),
        );

        plane.start().unwrap();
        let results = collect_until_completed(&mut rx).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].path, "http://x/flaky");
        assert_eq!(transport.attempts("http://x/flaky"), 3);
        assert_eq!(transport.attempts("http://x/down"), 3);
        let stats = plane.stats();
        assert_eq!(stats.processed_count, 2);
        assert_eq!(stats.found_count, 1);
    }

    #[tokio::test]
    async fn test_recursion_stops_at_max_depth() {
        let words = wordlist_file(&["a", "b"]);
        // every probe answers 301, so every match looks like a directory
        let transport = Arc::new(MockTransport::new().with_default_status(301));
        let (tx, mut rx) = events::channel();
        let plane = ControlPlane::new(
            ScanConfig {
                recursive: true,
                max_depth: 1,
                ..config("http://x/FUZZ", &words)
            },
            transport.clone(),
            Some(tx),
        );

        plane.start().unwrap();
        collect_until_completed(&mut rx).await;

        let probed: BTreeSet<String> = transport.probed().into_iter().collect();
        let expected: BTreeSet<String> = ["a", "b", "a/a", "a/b", "b/a", "b/b"]
            .iter()
            .map(|p| format!("http://x/{}", p))
            .collect();
        assert_eq!(probed, expected);

        let stats = plane.stats();
        assert_eq!(stats.processed_count, 6);
        assert_eq!(stats.recursion_count, 2);
        assert!(stats.recursion_active);
    }

    #[tokio::test]
    async fn test_no_recursion_when_disabled() {
        let words = wordlist_file(&["a"]);
        let transport = Arc::new(MockTransport::new().with_default_status(301));
        let (tx, mut rx) = events::channel();
        let plane = ControlPlane::new(config("http://x", &words), transport.clone(), Some(tx));

        plane.start().unwrap();
        collect_until_completed(&mut rx).await;
        assert_eq!(transport.probed(), vec!["http://x/a"]);
        assert!(!plane.stats().recursion_active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_halts_and_resume_finishes_each_job_once() {
        let words: Vec<String> = (0..40).map(|i| format!("w{}", i)).collect();
        let refs: Vec<&str> = words.iter().map(String::as_str).collect();
        let file = wordlist_file(&refs);
        let transport = Arc::new(
            MockTransport::new()
                .with_default_status(200)
                .with_latency(Duration::from_millis(100)),
        );
        let (tx, mut rx) = events::channel();
        let plane = ControlPlane::new(
            ScanConfig {
                threads: 2,
                ..config("http://x", &file)
            },
            transport.clone(),
            Some(tx),
        );

        plane.start().unwrap();
        tokio::time::sleep(Duration::from_millis(350)).await;
        plane.pause().unwrap();
        assert_eq!(plane.state(), ScanState::Paused);

        // in-flight probes finish, then nothing else starts
        tokio::time::sleep(Duration::from_millis(200)).await;
        let paused_at = plane.stats().processed_count;
        assert!(paused_at > 0 && paused_at < 40);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(plane.stats().processed_count, paused_at);
        assert_eq!(transport.probed().len(), paused_at);

        plane.resume().unwrap();
        collect_until_completed(&mut rx).await;

        assert_eq!(plane.state(), ScanState::Completed);
        let mut probed = transport.probed();
        probed.sort();
        probed.dedup();
        assert_eq!(probed.len(), 40);
        assert_eq!(transport.probed().len(), 40);
        assert_eq!(plane.results().len(), 40);
    }

    #[tokio::test]
    async fn test_restart_clears_results() {
        let words = wordlist_file(&["a", "b"]);
        let transport = Arc::new(MockTransport::new().with_default_status(200));
        let (tx, mut rx) = events::channel();
        let plane = ControlPlane::new(config("http://x", &words), transport, Some(tx));

        plane.start().unwrap();
        collect_until_completed(&mut rx).await;
        assert_eq!(plane.results().len(), 2);

        plane.reset().unwrap();
        assert_eq!(plane.state(), ScanState::Ready);
        assert!(plane.results().is_empty());
        assert_eq!(plane.stats(), Stats::default());

        plane.start().unwrap();
        collect_until_completed(&mut rx).await;
        assert_eq!(plane.results().len(), 2);
    }

    #[tokio::test]
    async fn test_illegal_transitions_rejected() {
        let words = wordlist_file(&["a"]);
        let plane = ControlPlane::new(config("http://x", &words), Arc::new(MockTransport::new()), None);

        assert!(matches!(plane.pause(), Err(ScanError::IllegalTransition { .. })));
        assert!(matches!(plane.resume(), Err(ScanError::IllegalTransition { .. })));
        assert!(matches!(plane.reset(), Err(ScanError::IllegalTransition { .. })));
        assert_eq!(plane.state(), ScanState::Ready);

        plane.start().unwrap();
        assert!(matches!(plane.start(), Err(ScanError::IllegalTransition { .. })));
    }

    #[tokio::test]
    async fn test_missing_wordlist_keeps_ready() {
        let plane = ControlPlane::new(
            ScanConfig {
                wordlist: "/no/such/wordlist.txt".into(),
                ..Default::default()
            },
            Arc::new(MockTransport::new()),
            None,
        );
        assert!(matches!(plane.start(), Err(ScanError::Wordlist { .. })));
        assert_eq!(plane.state(), ScanState::Ready);
    }

    #[tokio::test]
    async fn test_second_start_reports_state_before_touching_wordlist() {
        let words = wordlist_file(&["a"]);
        let transport = Arc::new(MockTransport::new().with_latency(Duration::from_secs(5)));
        let plane = ControlPlane::new(config("http://x", &words), transport, None);

        plane.start().unwrap();
        drop(words);
        assert!(matches!(
            plane.start(),
            Err(ScanError::IllegalTransition { from: ScanState::Scanning, .. })
        ));
        plane.quit();
    }

    #[tokio::test]
    async fn test_empty_wordlist_completes() {
        let words = wordlist_file(&[]);
        let (tx, mut rx) = events::channel();
        let plane = ControlPlane::new(config("http://x", &words), Arc::new(MockTransport::new()), Some(tx));
        plane.start().unwrap();
        collect_until_completed(&mut rx).await;
        assert_eq!(plane.state(), ScanState::Completed);
        assert_eq!(plane.stats().processed_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quit_pauses_and_stops() {
        let words = wordlist_file(&["a", "b", "c", "d"]);
        let transport = Arc::new(
            MockTransport::new()
                .with_default_status(200)
                .with_latency(Duration::from_millis(50)),
        );
        let plane = ControlPlane::new(
            ScanConfig {
                threads: 1,
                ..config("http://x", &words)
            },
            transport.clone(),
            None,
        );

        plane.start().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        plane.quit();
        assert_eq!(plane.state(), ScanState::Paused);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(transport.probed().len(), 1);
    }
}
