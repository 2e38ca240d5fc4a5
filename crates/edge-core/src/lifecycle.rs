//! Render lifecycle tracking.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Lifecycle phases for a single render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Render created, nothing written yet.
    Start,
    /// The first chunk reached the destination.
    FirstChunk,
    /// Render completed successfully.
    Completion,
    /// Render was cancelled by the request.
    Aborted,
    /// An error occurred.
    Error(String),
}

pub const MARK_ROUTE_MATCHED: &str = "route_matched";
pub const MARK_FIRST_CHUNK: &str = "first_chunk";
pub const MARK_COMPLETE: &str = "complete";
pub const MARK_ABORTED: &str = "aborted";

/// Timing context for observability.
#[derive(Debug, Clone)]
pub struct TimingContext {
    start: Instant,
    marks: HashMap<String, Instant>,
    error: Option<String>,
}

impl TimingContext {
    /// Create a new timing context.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            marks: HashMap::new(),
            error: None,
        }
    }

    /// Record a timing mark. Later marks with the same name overwrite earlier ones.
    pub fn mark(&mut self, name: &str) {
        self.marks.insert(name.to_string(), Instant::now());
    }

    /// Record a timing mark only the first time it is seen.
    pub fn mark_once(&mut self, name: &str) {
        self.marks
            .entry(name.to_string())
            .or_insert_with(Instant::now);
    }

    /// Whether a mark has been recorded.
    pub fn has_mark(&self, name: &str) -> bool {
        self.marks.contains_key(name)
    }

    /// Time from start to the named mark.
    pub fn since_start(&self, name: &str) -> Option<Duration> {
        self.marks.get(name).map(|t| t.duration_since(self.start))
    }

    /// Get elapsed time since start.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Get time to the first written chunk.
    pub fn time_to_first_chunk(&self) -> Option<Duration> {
        self.since_start(MARK_FIRST_CHUNK)
    }

    /// Get total render time, if the render completed.
    pub fn total_time(&self) -> Option<Duration> {
        self.since_start(MARK_COMPLETE)
    }

    /// Record a render failure.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// The phase implied by the recorded marks.
    pub fn phase(&self) -> LifecyclePhase {
        if let Some(error) = &self.error {
            LifecyclePhase::Error(error.clone())
        } else if self.has_mark(MARK_ABORTED) {
            LifecyclePhase::Aborted
        } else if self.has_mark(MARK_COMPLETE) {
            LifecyclePhase::Completion
        } else if self.has_mark(MARK_FIRST_CHUNK) {
            LifecyclePhase::FirstChunk
        } else {
            LifecyclePhase::Start
        }
    }
}

impl Default for TimingContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_progression() {
        let mut timing = TimingContext::new();
        assert_eq!(timing.phase(), LifecyclePhase::Start);

        timing.mark_once(MARK_FIRST_CHUNK);
        assert_eq!(timing.phase(), LifecyclePhase::FirstChunk);
        assert!(timing.time_to_first_chunk().is_some());
        assert!(timing.total_time().is_none());

        timing.mark(MARK_COMPLETE);
        assert_eq!(timing.phase(), LifecyclePhase::Completion);
    }

    #[test]
    fn test_error_wins_over_marks() {
        let mut timing = TimingContext::new();
        timing.mark(MARK_ABORTED);
        assert_eq!(timing.phase(), LifecyclePhase::Aborted);
        timing.record_error("boom");
        assert_eq!(timing.phase(), LifecyclePhase::Error("boom".to_string()));
    }

    #[test]
    fn test_mark_once_keeps_first() {
        let mut timing = TimingContext::new();
        timing.mark_once(MARK_FIRST_CHUNK);
        let first = timing.time_to_first_chunk();
        std::thread::sleep(Duration::from_millis(2));
        timing.mark_once(MARK_FIRST_CHUNK);
        assert_eq!(timing.time_to_first_chunk(), first);
    }
}
