//! Scripted transport and helpers for engine tests.

use super::http::{ProbeResponse, Transport};
use crate::scan::errors::ScanError;
use crate::scan::events::{EventReceiver, ScanEvent};
use crate::scan::models::ScanResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
pub struct MockTransport {
    routes: HashMap<String, (u16, Vec<u8>)>,
    failures: Mutex<HashMap<String, usize>>,
    default_status: Option<u16>,
    latency: Duration,
    probed: Mutex<Vec<String>>,
}

impl MockTransport {
    /// Unknown URLs answer 404 with an empty body.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.with_response(url, status, b"")
    }

    pub fn with_response(mut self, url: &str, status: u16, body: &[u8]) -> Self {
        self.routes.insert(url.to_string(), (status, body.to_vec()));
        self
    }

    /// Fail the first `count` probes of `url` with a transport error.
    pub fn with_failures(self, url: &str, count: usize) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(url.to_string(), count);
        self
    }

    pub fn with_default_status(mut self, status: u16) -> Self {
        self.default_status = Some(status);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Every probe issued so far, retries included, in call order.
    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }

    pub fn attempts(&self, url: &str) -> usize {
        self.probed.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn probe(&self, url: &str) -> Result<ProbeResponse, ScanError> {
        self.probed.lock().unwrap().push(url.to_string());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(url) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(ScanError::Transport(format!("scripted failure for {}", url)));
                }
            }
        }

        let (status, body) = self
            .routes
            .get(url)
            .cloned()
            .unwrap_or_else(|| (self.default_status.unwrap_or(404), Vec::new()));
        Ok(ProbeResponse {
            status,
            body,
            ..Default::default()
        })
    }
}

pub fn wordlist_file(words: &[&str]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for word in words {
        writeln!(file, "{}", word).unwrap();
    }
    file.flush().unwrap();
    file
}

/// Drain events until the scan completes, returning the results seen on the way.
pub async fn collect_until_completed(rx: &mut EventReceiver) -> Vec<ScanResult> {
    let mut results = Vec::new();
    let drain = async {
        while let Some(event) = rx.recv().await {
            match event {
                ScanEvent::Result(result) => results.push(result),
                ScanEvent::Completed => return,
                _ => {}
            }
        }
        panic!("event channel closed before completion");
    };
    tokio::time::timeout(Duration::from_secs(60), drain)
        .await
        .expect("scan did not complete");
    results
}
