//! Render destinations.

use std::sync::Arc;

use async_trait::async_trait;
use edge_core::{LifecyclePhase, TimingContext, MARK_ABORTED, MARK_COMPLETE, MARK_FIRST_CHUNK};
use serde::Serialize;

use crate::chunk::RenderChunk;
use crate::error::RenderError;
use crate::escape::HtmlString;
use crate::instruction::{InstructionHandler, RenderInstruction};

/// Ordered sink for render chunks.
///
/// Implementations must keep chunks in the order they are written.
#[async_trait]
pub trait RenderDestination: Send {
    async fn write(&mut self, chunk: RenderChunk) -> Result<(), RenderError>;
}

#[async_trait]
impl<D: RenderDestination + ?Sized> RenderDestination for &mut D {
    async fn write(&mut self, chunk: RenderChunk) -> Result<(), RenderError> {
        (**self).write(chunk).await
    }
}

#[async_trait]
impl<D: RenderDestination + ?Sized> RenderDestination for Box<D> {
    async fn write(&mut self, chunk: RenderChunk) -> Result<(), RenderError> {
        (**self).write(chunk).await
    }
}

/// Counters kept by text-producing destinations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteStats {
    pub bytes_written: usize,
    pub chunks_written: usize,
    pub instructions_materialized: usize,
}

/// Timing and counters for a finished render.
#[derive(Debug, Clone)]
pub struct RenderSummary {
    pub timing: TimingContext,
    pub stats: WriteStats,
}

#[derive(Debug, Default)]
pub(crate) struct WriteTracker {
    timing: TimingContext,
    stats: WriteStats,
}

impl WriteTracker {
    pub(crate) fn new(timing: TimingContext) -> Self {
        Self {
            timing,
            stats: WriteStats::default(),
        }
    }

    pub(crate) fn record(&mut self, bytes: usize, instruction: bool) {
        if bytes == 0 {
            return;
        }
        self.timing.mark_once(MARK_FIRST_CHUNK);
        self.stats.bytes_written += bytes;
        self.stats.chunks_written += 1;
        if instruction {
            self.stats.instructions_materialized += 1;
        }
    }

    pub(crate) fn complete(&mut self) {
        self.timing.mark(MARK_COMPLETE);
    }

    pub(crate) fn record_error(&mut self, error: &RenderError) {
        if error.is_aborted() {
            self.timing.mark(MARK_ABORTED);
        } else {
            self.timing.record_error(error.to_string());
        }
    }

    pub(crate) fn phase(&self) -> LifecyclePhase {
        self.timing.phase()
    }

    pub(crate) fn summary(&self) -> RenderSummary {
        RenderSummary {
            timing: self.timing.clone(),
            stats: self.stats,
        }
    }
}

/// Records every chunk in order without interpreting instructions.
///
/// Used for slot rendering and for siblings that render ahead of their turn.
#[derive(Debug, Default)]
pub struct BufferDestination {
    chunks: Vec<RenderChunk>,
}

impl BufferDestination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunks(&self) -> &[RenderChunk] {
        &self.chunks
    }

    pub fn into_chunks(self) -> Vec<RenderChunk> {
        self.chunks
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Concatenated text of the recorded chunks, skipping instructions.
    pub fn html(&self) -> HtmlString {
        let text: String = self
            .chunks
            .iter()
            .filter_map(|chunk| match chunk {
                RenderChunk::Html(html) => Some(html.as_str().to_string()),
                RenderChunk::Bytes(bytes) => Some(bytes.to_string_lossy().into_owned()),
                RenderChunk::Instruction(_) => None,
            })
            .collect();
        HtmlString::trusted(text)
    }

    /// Instructions in the order they were written.
    pub fn instructions(&self) -> Vec<RenderInstruction> {
        self.chunks
            .iter()
            .filter_map(|chunk| match chunk {
                RenderChunk::Instruction(instruction) => Some(instruction.clone()),
                _ => None,
            })
            .collect()
    }

    /// Write the recorded chunks to `dest`, preserving order.
    pub async fn drain_into(
        self,
        dest: &mut (dyn RenderDestination + '_),
    ) -> Result<(), RenderError> {
        for chunk in self.chunks {
            dest.write(chunk).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl RenderDestination for BufferDestination {
    async fn write(&mut self, chunk: RenderChunk) -> Result<(), RenderError> {
        self.chunks.push(chunk);
        Ok(())
    }
}

/// Builds the complete response body in memory, materializing instructions.
pub struct StringDestination {
    output: String,
    handler: Arc<dyn InstructionHandler>,
    tracker: WriteTracker,
}

impl StringDestination {
    pub fn new(handler: Arc<dyn InstructionHandler>) -> Self {
        Self::with_timing(handler, TimingContext::new())
    }

    pub fn with_timing(handler: Arc<dyn InstructionHandler>, timing: TimingContext) -> Self {
        Self {
            output: String::new(),
            handler,
            tracker: WriteTracker::new(timing),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.output
    }

    /// Record that the render failed.
    pub fn record_error(&mut self, error: &RenderError) {
        self.tracker.record_error(error);
    }

    /// Finish the render and return the body with its summary.
    pub fn finish(mut self) -> (String, RenderSummary) {
        self.tracker.complete();
        let summary = self.tracker.summary();
        (self.output, summary)
    }
}

#[async_trait]
impl RenderDestination for StringDestination {
    async fn write(&mut self, chunk: RenderChunk) -> Result<(), RenderError> {
        let instruction = chunk.is_instruction();
        if let Some(text) = chunk.to_text(self.handler.as_ref()) {
            self.tracker.record(text.len(), instruction);
            self.output.push_str(&text);
        }
        Ok(())
    }
}
