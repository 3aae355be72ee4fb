use super::models::{ScanResult, ScanState, Stats};
use std::collections::BTreeMap;
use tokio::sync::mpsc;

/// Engine-to-presentation notifications, pushed as they happen.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    Result(ScanResult),
    Stats(Stats),
    StateChanged(ScanState),
    /// Worker pool drained after the queue closed.
    Completed,
    Technologies(BTreeMap<String, Option<String>>),
}

pub type EventSender = mpsc::UnboundedSender<ScanEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ScanEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
