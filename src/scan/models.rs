use serde::{Deserialize, Serialize};
use std::fmt;

/// A candidate path waiting in the job queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job {
    pub path: String, // bare word, word+extension, or parent/word
    pub depth: usize,
}

impl Job {
    pub fn root(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            depth: 0,
        }
    }

    /// Child job one level below this one.
    pub fn child(&self, word: &str) -> Self {
        Self {
            path: format!("{}/{}", self.path.trim_end_matches('/'), word),
            depth: self.depth + 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub path: String, // fully resolved URL
    pub status: u16,
    pub size: usize,
    pub lines: usize,
}

impl ScanResult {
    /// Status class digit (2 for 2xx, 3 for 3xx, ...).
    pub fn class(&self) -> u16 {
        self.status / 100
    }
}

impl fmt::Display for ScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (Size: {}, Lines: {})",
            self.status, self.path, self.size, self.lines
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stats {
    pub processed_count: usize,
    pub found_count: usize,
    pub recursion_count: usize,
    pub recursion_active: bool,
    pub current_path: String,
    pub requests_per_second: f64,
    pub elapsed: String, // HH:MM:SS
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanState {
    Ready,
    Scanning,
    Paused,
    Completed,
}

impl ScanState {
    pub fn label(&self) -> &'static str {
        match self {
            ScanState::Ready => "Ready to scan",
            ScanState::Scanning => "Scanning in progress...",
            ScanState::Paused => "Scan paused",
            ScanState::Completed => "Scan completed",
        }
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanState::Ready => "ready",
            ScanState::Scanning => "scanning",
            ScanState::Paused => "paused",
            ScanState::Completed => "completed",
        };
        f.write_str(name)
    }
}
