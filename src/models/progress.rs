/// Progress of a long-running batch operation.
#[derive(Clone, Debug)]
pub struct ProgressEvent {
    pub completed: usize,
    pub total: usize,
    pub current: String,
}

/// Observer interface for batch imports. The core stays pull-based and
/// synchronous per item; how progress is displayed is the caller's concern.
pub trait ProgressObserver {
    fn on_progress(&self, event: ProgressEvent);

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Observer that drops everything. Useful default for non-interactive calls.
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _event: ProgressEvent) {}
}
