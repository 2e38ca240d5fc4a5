//! Sink-backed render destination.

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use edge_core::{LifecyclePhase, TimingContext};
use futures::{Sink, SinkExt};
use tracing::trace;

use crate::chunk::RenderChunk;
use crate::destination::{RenderDestination, RenderSummary, WriteTracker};
use crate::error::RenderError;
use crate::flush::FlushController;
use crate::instruction::InstructionHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SinkState {
    Open,
    Finished,
}

/// Destination that streams bytes into any `Sink<Vec<u8>>`.
///
/// Instructions are materialized through the handler as they arrive. Bytes
/// are coalesced according to the [`FlushController`]; [`SinkDestination::finish`]
/// hands over whatever is still buffered and closes the sink.
pub struct SinkDestination<S> {
    inner: S,
    state: SinkState,
    handler: Arc<dyn InstructionHandler>,
    flush: FlushController,
    pending: Vec<u8>,
    tracker: WriteTracker,
}

impl<S, E> SinkDestination<S>
where
    S: Sink<Vec<u8>, Error = E> + Unpin + Send,
    E: Display + Send,
{
    pub fn new(sink: S, handler: Arc<dyn InstructionHandler>, flush: FlushController) -> Self {
        Self::with_timing(sink, handler, flush, TimingContext::new())
    }

    pub fn with_timing(
        sink: S,
        handler: Arc<dyn InstructionHandler>,
        flush: FlushController,
        timing: TimingContext,
    ) -> Self {
        Self {
            inner: sink,
            state: SinkState::Open,
            handler,
            flush,
            pending: Vec::new(),
            tracker: WriteTracker::new(timing),
        }
    }

    async fn flush_pending(&mut self) -> Result<(), RenderError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let bytes = std::mem::take(&mut self.pending);
        trace!(bytes = bytes.len(), "flushing to sink");
        self.inner
            .send(bytes)
            .await
            .map_err(|e| RenderError::Destination(e.to_string()))?;
        self.flush.reset();
        Ok(())
    }

    /// Flush buffered bytes and close the sink. Later writes fail.
    pub async fn finish(&mut self) -> Result<(), RenderError> {
        if self.state == SinkState::Finished {
            return Ok(());
        }
        self.flush_pending().await?;
        self.inner
            .close()
            .await
            .map_err(|e| RenderError::Destination(e.to_string()))?;
        self.state = SinkState::Finished;
        self.tracker.complete();
        Ok(())
    }

    /// Record that the render failed after output may already have been flushed.
    pub fn record_error(&mut self, error: &RenderError) {
        self.tracker.record_error(error);
    }

    /// Bytes written but not yet handed to the sink.
    pub fn pending_bytes(&self) -> usize {
        self.pending.len()
    }

    pub fn summary(&self) -> RenderSummary {
        self.tracker.summary()
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.tracker.phase()
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S, E> RenderDestination for SinkDestination<S>
where
    S: Sink<Vec<u8>, Error = E> + Unpin + Send,
    E: Display + Send,
{
    async fn write(&mut self, chunk: RenderChunk) -> Result<(), RenderError> {
        if self.state == SinkState::Finished {
            return Err(RenderError::Destination("Sink already finished".to_string()));
        }

        let instruction = chunk.is_instruction();
        let Some(bytes) = chunk.into_bytes(self.handler.as_ref()) else {
            return Ok(());
        };
        if bytes.is_empty() {
            return Ok(());
        }

        self.tracker.record(bytes.len(), instruction);
        self.flush.add_bytes(bytes.len());
        self.pending.extend_from_slice(&bytes);

        if self.flush.should_flush() {
            self.flush_pending().await?;
        }
        Ok(())
    }
}
