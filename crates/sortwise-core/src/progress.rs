use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

/// Pipeline phase a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Scan,
    Classify,
    Remote,
    Execute,
}

/// One progress tick: `current` of `total` items, `item` being the file name
/// (or batch label) just handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub current: usize,
    pub total: usize,
    pub item: String,
}

impl ProgressEvent {
    pub fn new(phase: Phase, current: usize, total: usize, item: impl Into<String>) -> Self {
        Self {
            phase,
            current,
            total,
            item: item.into(),
        }
    }
}

/// Sink for progress events.
///
/// The CLI hands the engine the sending half of a channel and drives its
/// progress bars from the receiver. The default method is a no-op.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, _event: ProgressEvent) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

impl ProgressReporter for Sender<ProgressEvent> {
    fn report(&self, event: ProgressEvent) {
        // A dropped receiver only means nobody is watching.
        let _ = self.send(event);
    }
}

/// Cooperative stop flag shared between the caller and every phase.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
