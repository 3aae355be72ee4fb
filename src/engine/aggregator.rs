use crate::scan::events::{EventSender, ScanEvent};
use crate::scan::models::{ScanResult, Stats};
use crate::utils::time::format_elapsed;
use std::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

/// Results and running statistics of one scan run.
///
/// Results and stats sit behind separate locks so per-request stats updates
/// never queue behind result appends. When both are needed the results lock
/// is taken first.
pub struct Aggregator {
    results: Mutex<Vec<ScanResult>>,
    stats: Mutex<Stats>,
    events: Mutex<Option<EventSender>>,
}

impl Aggregator {
    pub fn new(events: Option<EventSender>) -> Self {
        Self {
            results: Mutex::new(Vec::new()),
            stats: Mutex::new(Stats::default()),
            events: Mutex::new(events),
        }
    }

    /// Count one attempted job and refresh the derived figures in a single update.
    pub fn record_attempt(&self, current_path: &str, started: Instant) {
        let snapshot = {
            let mut stats = lock(&self.stats);
            stats.processed_count += 1;
            let elapsed = started.elapsed();
            let secs = elapsed.as_secs_f64();
            if secs > 0.0 {
                stats.requests_per_second = stats.processed_count as f64 / secs;
            }
            stats.elapsed = format_elapsed(elapsed);
            stats.current_path.clear();
            stats.current_path.push_str(current_path);
            stats.clone()
        };
        self.emit(ScanEvent::Stats(snapshot));
    }

    pub fn push_result(&self, result: ScanResult) {
        let snapshot = {
            let mut results = lock(&self.results);
            results.push(result.clone());
            let mut stats = lock(&self.stats);
            stats.found_count = results.len();
            stats.clone()
        };
        self.emit(ScanEvent::Result(result));
        self.emit(ScanEvent::Stats(snapshot));
    }

    /// Note one directory expanded recursively.
    pub fn record_recursion(&self) {
        let snapshot = {
            let mut stats = lock(&self.stats);
            stats.recursion_count += 1;
            stats.recursion_active = true;
            stats.clone()
        };
        self.emit(ScanEvent::Stats(snapshot));
    }

    /// Copy of the results collected so far, in completion order.
    pub fn results(&self) -> Vec<ScanResult> {
        lock(&self.results).clone()
    }

    pub fn stats(&self) -> Stats {
        lock(&self.stats).clone()
    }

    /// Stop forwarding events; late updates from a discarded run stay local.
    pub fn detach(&self) {
        lock(&self.events).take();
    }

    fn emit(&self, event: ScanEvent) {
        if let Some(events) = lock(&self.events).as_ref() {
            let _ = events.send(event);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
