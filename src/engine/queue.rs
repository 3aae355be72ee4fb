//! Bounded job queue shared by producers and workers.
//!
//! The channel closes once no work is outstanding. Every live producer and
//! every enqueued-but-unfinished job holds one unit of the outstanding
//! counter; when the last unit is released the sender is dropped, so idle
//! workers see the end of the queue instead of waiting forever.

use crate::scan::models::Job;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;

pub struct JobQueue {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    receiver: AsyncMutex<mpsc::Receiver<Job>>,
    outstanding: AtomicUsize,
}

impl JobQueue {
    pub fn new(capacity: usize) -> Arc<Self> {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        Arc::new(Self {
            sender: Mutex::new(Some(sender)),
            receiver: AsyncMutex::new(receiver),
            outstanding: AtomicUsize::new(0),
        })
    }

    /// Units of work not yet finished (producers plus queued/in-flight jobs).
    #[cfg(test)]
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }

    /// Register a producer; the queue stays open at least until the guard drops.
    pub fn register_producer(self: &Arc<Self>) -> ProducerGuard {
        self.acquire();
        ProducerGuard {
            queue: Arc::clone(self),
        }
    }

    /// Enqueue a job, waiting for space. Returns false if the queue is closed
    /// or `shutdown` fires first.
    pub async fn push(&self, job: Job, shutdown: &CancellationToken) -> bool {
        let sender = match self.sender.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            Some(sender) => sender.clone(),
            None => return false,
        };

        self.acquire();
        let sent = tokio::select! {
            biased;
            _ = shutdown.cancelled() => false,
            result = sender.send(job) => result.is_ok(),
        };
        if !sent {
            self.release();
        }
        sent
    }

    /// Next job, or None once the queue is closed and drained.
    pub async fn pop(&self) -> Option<Job> {
        self.receiver.lock().await.recv().await
    }

    /// Mark a popped job as fully processed.
    pub fn job_done(&self) {
        self.release();
    }

    fn acquire(&self) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.close();
        }
    }

    fn close(&self) {
        if self
            .sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .is_some()
        {
            tracing::debug!("Job queue closed: no outstanding work");
        }
    }
}

/// Keeps the queue open while a producer is still emitting jobs.
pub struct ProducerGuard {
    queue: Arc<JobQueue>,
}

impl ProducerGuard {
    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.queue
    }
}

impl Drop for ProducerGuard {
    fn drop(&mut self) {
        self.queue.release();
    }
}
