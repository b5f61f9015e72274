/// Trait for reporting scan and execution progress.
///
/// The CLI implements it with indicatif; all methods default to no-ops.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self) {}
    fn on_scan_progress(&self, _items_found: usize) {}
    fn on_scan_complete(&self, _total_items: usize, _duration_secs: f64) {}
    fn on_metadata_start(&self, _total_items: usize) {}
    fn on_metadata_progress(&self, _items_read: usize) {}
    fn on_metadata_complete(&self, _failures: usize, _duration_secs: f64) {}
    fn on_execute_start(&self, _total_actions: usize) {}
    fn on_action_complete(&self, _done: usize, _total: usize) {}
    fn on_execute_complete(&self, _successes: usize, _errors: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
