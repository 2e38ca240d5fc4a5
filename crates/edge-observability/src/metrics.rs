//! Per-render timing metrics.

use std::time::Duration;

use edge_core::{LifecyclePhase, RequestId, TimingContext, MARK_ABORTED, MARK_ROUTE_MATCHED};
use edge_streaming::RenderSummary;
use serde::{Deserialize, Serialize};

/// How a render ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStatus {
    /// Still writing, or stopped without completing.
    Streaming,
    Complete,
    Aborted,
    Failed,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Streaming => "streaming",
            Self::Complete => "complete",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        }
    }
}

/// Metrics for a single render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderMetrics {
    /// Request ID for correlation.
    pub request_id: String,
    /// Matched route pattern, e.g. `/blog/[slug]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    /// Time to route selection (microseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_route_us: Option<u64>,
    /// Time to the first chunk reaching the destination (microseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_first_chunk_us: Option<u64>,
    /// Total render duration (microseconds).
    pub total_duration_us: u64,
    pub bytes_written: usize,
    pub chunks_written: usize,
    pub instructions_materialized: usize,
    pub status: RenderStatus,
    /// Error message if the render failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

impl RenderMetrics {
    /// Build metrics from a finished (or failed) render.
    pub fn from_summary(request_id: &RequestId, summary: &RenderSummary) -> Self {
        let timing = &summary.timing;
        let (status, error) = match timing.phase() {
            LifecyclePhase::Start | LifecyclePhase::FirstChunk => (RenderStatus::Streaming, None),
            LifecyclePhase::Completion => (RenderStatus::Complete, None),
            LifecyclePhase::Aborted => (RenderStatus::Aborted, None),
            LifecyclePhase::Error(message) => (RenderStatus::Failed, Some(message)),
        };

        Self {
            request_id: request_id.to_string(),
            route: None,
            time_to_route_us: timing.since_start(MARK_ROUTE_MATCHED).map(micros),
            time_to_first_chunk_us: timing.time_to_first_chunk().map(micros),
            total_duration_us: micros(end_time(timing)),
            bytes_written: summary.stats.bytes_written,
            chunks_written: summary.stats.chunks_written,
            instructions_materialized: summary.stats.instructions_materialized,
            status,
            error,
        }
    }

    /// Attach the matched route.
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    /// Emit the metrics as a structured `tracing` event.
    pub fn record(&self) {
        tracing::info!(
            request_id = %self.request_id,
            route = self.route.as_deref().unwrap_or("-"),
            ttfc_us = self.time_to_first_chunk_us,
            total_us = self.total_duration_us,
            bytes = self.bytes_written,
            chunks = self.chunks_written,
            status = self.status.as_str(),
            "render metrics"
        );
    }

    /// Format as JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Format as human-readable summary.
    pub fn to_summary(&self) -> String {
        let mut lines = Vec::new();

        match &self.route {
            Some(route) => lines.push(format!("Render {} ({})", self.request_id, route)),
            None => lines.push(format!("Render {}", self.request_id)),
        }

        if let Some(ttfc) = self.time_to_first_chunk_us {
            lines.push(format!(
                "  Time to first chunk: {}us ({:.2}ms)",
                ttfc,
                ttfc as f64 / 1000.0
            ));
        }

        lines.push(format!(
            "  Total: {}us ({:.2}ms)",
            self.total_duration_us,
            self.total_duration_us as f64 / 1000.0
        ));
        lines.push(format!(
            "  Written: {} bytes in {} chunks, {} instructions",
            self.bytes_written, self.chunks_written, self.instructions_materialized
        ));

        match &self.error {
            Some(error) => lines.push(format!("  Status: failed - {}", error)),
            None => lines.push(format!("  Status: {}", self.status.as_str())),
        }

        lines.join("\n")
    }
}

fn end_time(timing: &TimingContext) -> Duration {
    timing
        .total_time()
        .or_else(|| timing.since_start(MARK_ABORTED))
        .unwrap_or_else(|| timing.elapsed())
}
