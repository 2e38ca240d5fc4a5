//! Observability for the edge rendering pipeline.
//!
//! This crate provides:
//! - `init_tracing` - Installs the global `tracing` subscriber from `LogConfig`
//! - `RenderMetrics` - Per-render timing and write counters

mod logging;
mod metrics;

pub use logging::*;
pub use metrics::*;

// Re-export RequestId and TimingContext from edge-core for convenience
pub use edge_core::{RequestId, TimingContext};
