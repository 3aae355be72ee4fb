use super::queue::{JobQueue, ProducerGuard};
use crate::config::Wordlist;
use crate::scan::models::Job;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Base jobs in emission order: each word, then the word with every extension.
pub fn base_jobs<'a>(wordlist: &'a [String], extensions: &'a [String]) -> impl Iterator<Item = Job> + 'a {
    wordlist.iter().flat_map(move |word| {
        std::iter::once(Job::root(word.as_str()))
            .chain(extensions.iter().map(move |ext| Job::root(format!("{}{}", word, ext))))
    })
}

/// Feeds the job queue from the wordlist.
///
/// Checks `shutdown` before every enqueue; a full queue simply blocks, which
/// is also what holds production back while the scan is paused.
pub struct JobProducer {
    guard: ProducerGuard,
    wordlist: Wordlist,
    extensions: Arc<[String]>,
    shutdown: CancellationToken,
}

impl JobProducer {
    /// Registers with the queue immediately so it cannot close before `run` starts.
    pub fn new(
        queue: &Arc<JobQueue>,
        wordlist: Wordlist,
        extensions: Arc<[String]>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            guard: queue.register_producer(),
            wordlist,
            extensions,
            shutdown,
        }
    }

    pub async fn run(self) {
        let queue = self.guard.queue();
        let mut emitted = 0usize;
        for job in base_jobs(&self.wordlist, &self.extensions) {
            if self.shutdown.is_cancelled() || !queue.push(job, &self.shutdown).await {
                tracing::debug!("Job producer stopped early after {} jobs", emitted);
                return;
            }
            emitted += 1;
        }
        tracing::info!("Job producer finished: {} base jobs", emitted);
    }
}

/// Fan out one child job per word below `parent` on a separate task.
///
/// The producer is registered before returning, so the caller may release
/// `parent` right away without the queue closing underneath the children.
pub fn spawn_recursive(
    queue: &Arc<JobQueue>,
    parent: &Job,
    wordlist: Wordlist,
    shutdown: CancellationToken,
) {
    let guard = queue.register_producer();
    let parent = parent.clone();
    tokio::spawn(async move {
        let queue = guard.queue();
        for word in wordlist.iter() {
            if shutdown.is_cancelled() || !queue.push(parent.child(word), &shutdown).await {
                return;
            }
        }
        tracing::debug!(
            "Queued {} child jobs under {} at depth {}",
            wordlist.len(),
            parent.path,
            parent.depth + 1
        );
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_word_then_extensions_order() {
        let words = strings(&["admin", "login"]);
        let exts = strings(&[".php", ".bak"]);
        let paths: Vec<String> = base_jobs(&words, &exts).map(|j| j.path).collect();
        assert_eq!(
            paths,
            vec!["admin", "admin.php", "admin.bak", "login", "login.php", "login.bak"]
        );
        assert!(base_jobs(&words, &exts).all(|j| j.depth == 0));
    }

    proptest! {
        #[test]
        fn test_emits_k_times_one_plus_e(
            words in proptest::collection::vec("[a-z]{1,8}", 0..30),
            exts in proptest::collection::vec("\\.[a-z]{1,4}", 0..5),
        ) {
            prop_assert_eq!(base_jobs(&words, &exts).count(), words.len() * (1 + exts.len()));
        }
    }

    #[tokio::test]
    async fn test_producer_fills_queue_then_closes() {
        let queue = JobQueue::new(2);
        let producer = JobProducer::new(
            &queue,
            Wordlist::from(strings(&["a", "b"])),
            strings(&[".txt"]).into(),
            CancellationToken::new(),
        );
        tokio::spawn(producer.run());

        let mut seen = Vec::new();
        while let Some(job) = queue.pop().await {
            seen.push(job.path);
            queue.job_done();
        }
        assert_eq!(seen, vec!["a", "a.txt", "b", "b.txt"]);
    }

    #[tokio::test]
    async fn test_cancelled_producer_emits_nothing() {
        let queue = JobQueue::new(4);
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        JobProducer::new(&queue, Wordlist::from(strings(&["a", "b"])), Arc::from(Vec::new()), shutdown)
            .run()
            .await;
        assert!(queue.is_closed());
        assert_eq!(queue.pop().await, None);
    }

    #[tokio::test]
    async fn test_recursive_children_follow_parent() {
        let queue = JobQueue::new(4);
        let keep_open = queue.register_producer();
        let parent = Job::root("admin/");

        spawn_recursive(&queue, &parent, Wordlist::from(strings(&["x", "y"])), CancellationToken::new());
        drop(keep_open);

        let mut children = Vec::new();
        while let Some(job) = queue.pop().await {
            children.push((job.path, job.depth));
            queue.job_done();
        }
        assert_eq!(
            children,
            vec![("admin/x".to_string(), 1), ("admin/y".to_string(), 1)]
        );
    }
}
