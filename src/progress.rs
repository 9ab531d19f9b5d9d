// src/progress.rs
/// Lightweight progress reporting for long ingestion runs.
/// Frontends implement this to surface status to users.
pub trait Progress {
    /// Called at the start with the total number of keys (if known).
    fn begin(&mut self, _total: usize) {}

    /// Free-form status line for human eyes.
    fn log(&mut self, _msg: &str) {}

    /// Called when one key was persisted.
    fn item_done(&mut self, _ein: &str) {}

    /// Called when one key failed; the run continues regardless.
    fn item_failed(&mut self, _ein: &str, _why: &str) {}

    /// Called at the end, successful or not.
    fn finish(&mut self) {}
}

/// A no-op progress sink.
pub struct NullProgress;
impl Progress for NullProgress {}
