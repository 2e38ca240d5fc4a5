//! Explicit flush control for sink-backed output.

use edge_core::RenderConfig;

/// When buffered bytes are handed to the underlying sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushPolicy {
    /// Hand every chunk over as soon as it is written.
    #[default]
    EveryChunk,
    /// Coalesce chunks until the buffer reaches the controller's threshold.
    Threshold,
    /// Only flush when the destination is finished.
    OnFinish,
}

/// Controller for managing flush behavior.
#[derive(Debug)]
pub struct FlushController {
    policy: FlushPolicy,
    pending_bytes: usize,
    max_buffer: usize,
}

impl FlushController {
    /// Create a new flush controller with given policy.
    pub fn new(policy: FlushPolicy) -> Self {
        Self {
            policy,
            pending_bytes: 0,
            max_buffer: 0,
        }
    }

    /// Build the controller described by the render configuration.
    pub fn from_config(config: &RenderConfig) -> Self {
        if config.flush_threshold == 0 {
            Self::new(FlushPolicy::EveryChunk)
        } else {
            Self::new(FlushPolicy::Threshold).with_max_buffer(config.flush_threshold)
        }
    }

    /// Set the buffer size that triggers a flush under [`FlushPolicy::Threshold`].
    pub fn with_max_buffer(mut self, bytes: usize) -> Self {
        self.max_buffer = bytes;
        self
    }

    /// Record bytes added to buffer.
    pub fn add_bytes(&mut self, count: usize) {
        self.pending_bytes += count;
    }

    /// Check if flush is needed.
    pub fn should_flush(&self) -> bool {
        match self.policy {
            FlushPolicy::EveryChunk => self.pending_bytes > 0,
            FlushPolicy::Threshold => self.pending_bytes >= self.max_buffer.max(1),
            FlushPolicy::OnFinish => false,
        }
    }

    /// Reset pending byte count after flush.
    pub fn reset(&mut self) {
        self.pending_bytes = 0;
    }

    pub fn pending_bytes(&self) -> usize {
        self.pending_bytes
    }

    pub fn policy(&self) -> FlushPolicy {
        self.policy
    }
}

impl Default for FlushController {
    fn default() -> Self {
        Self::new(FlushPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_chunk() {
        let mut controller = FlushController::default();
        assert!(!controller.should_flush());
        controller.add_bytes(1);
        assert!(controller.should_flush());
        controller.reset();
        assert!(!controller.should_flush());
    }

    #[test]
    fn test_threshold() {
        let mut controller = FlushController::new(FlushPolicy::Threshold).with_max_buffer(10);
        controller.add_bytes(6);
        assert!(!controller.should_flush());
        controller.add_bytes(4);
        assert!(controller.should_flush());
    }

    #[test]
    fn test_on_finish_never_flushes_early() {
        let mut controller = FlushController::new(FlushPolicy::OnFinish);
        controller.add_bytes(1 << 20);
        assert!(!controller.should_flush());
    }

    #[test]
    fn test_from_config() {
        let config = RenderConfig::default();
        assert_eq!(FlushController::from_config(&config).policy(), FlushPolicy::EveryChunk);

        let config = RenderConfig {
            flush_threshold: 4096,
            ..RenderConfig::default()
        };
        assert_eq!(FlushController::from_config(&config).policy(), FlushPolicy::Threshold);
    }
}
