//! Per-request render context.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use edge_core::{RenderConfig, RequestId};
use edge_streaming::RenderError;
use futures::channel::oneshot;
use futures::future::{self, FutureExt, Shared};
use tracing::trace;

use crate::head::HeadItems;

/// Identity of one component instance within a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Cancellation signal shared between a request and its render.
///
/// Pending awaits inside the render race against the signal, so an abort
/// ends the render without waiting for a hung child to resolve.
#[derive(Clone)]
pub struct AbortHandle {
    inner: Arc<AbortInner>,
}

struct AbortInner {
    aborted: AtomicBool,
    trigger: Mutex<Option<oneshot::Sender<()>>>,
    signal: Shared<oneshot::Receiver<()>>,
}

impl AbortHandle {
    pub fn new() -> Self {
        let (trigger, signal) = oneshot::channel();
        Self {
            inner: Arc::new(AbortInner {
                aborted: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                signal: signal.shared(),
            }),
        }
    }

    /// Ask the render to stop. Nothing further is written once observed.
    pub fn abort(&self) {
        self.inner.aborted.store(true, Ordering::SeqCst);
        let trigger = self
            .inner
            .trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(trigger) = trigger {
            let _ = trigger.send(());
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::SeqCst)
    }

    /// Resolves once [`abort`](Self::abort) has been called.
    pub fn aborted(&self) -> impl Future<Output = ()> + Send + 'static {
        let signal = self.inner.signal.clone();
        async move {
            // The trigger lives as long as any handle; a dropped trigger never fires.
            if signal.await.is_err() {
                future::pending::<()>().await;
            }
        }
    }
}

impl Default for AbortHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AbortHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AbortHandle").field(&self.is_aborted()).finish()
    }
}

#[derive(Debug, Default)]
pub(crate) struct RequestState {
    pub(crate) head: HeadItems,
    pub(crate) propagated: HashSet<InstanceId>,
    pub(crate) hydration_rendered: bool,
    pub(crate) directives_rendered: HashSet<String>,
    pub(crate) head_rendered: bool,
    pub(crate) island_runtime_rendered: bool,
}

struct ContextInner {
    request_id: RequestId,
    config: RenderConfig,
    partial: bool,
    abort: AbortHandle,
    next_instance: AtomicU64,
    state: Mutex<RequestState>,
}

/// State shared by everything rendered for one request.
///
/// Cloning is cheap and yields a handle to the same request state. The
/// context owns the collected head items and the once-per-request flags used
/// when instructions are materialized.
#[derive(Clone)]
pub struct RenderContext {
    inner: Arc<ContextInner>,
}

impl fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("request_id", &self.inner.request_id)
            .field("partial", &self.inner.partial)
            .field("aborted", &self.is_aborted())
            .finish()
    }
}

/// Builder for [`RenderContext`].
#[derive(Debug, Default)]
pub struct RenderContextBuilder {
    request_id: Option<RequestId>,
    config: RenderConfig,
    partial: bool,
    abort: AbortHandle,
}

impl RenderContextBuilder {
    pub fn request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    /// Mark the render as a partial (a fragment without a document head).
    pub fn partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }

    pub fn abort_handle(mut self, abort: AbortHandle) -> Self {
        self.abort = abort;
        self
    }

    pub fn build(self) -> RenderContext {
        RenderContext {
            inner: Arc::new(ContextInner {
                request_id: self.request_id.unwrap_or_else(RequestId::generate),
                config: self.config,
                partial: self.partial,
                abort: self.abort,
                next_instance: AtomicU64::new(0),
                state: Mutex::new(RequestState::default()),
            }),
        }
    }
}

impl RenderContext {
    pub fn builder() -> RenderContextBuilder {
        RenderContextBuilder::default()
    }

    /// A context with a fresh request id and the given configuration.
    pub fn new(config: RenderConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn request_id(&self) -> &RequestId {
        &self.inner.request_id
    }

    pub fn config(&self) -> &RenderConfig {
        &self.inner.config
    }

    pub fn is_partial(&self) -> bool {
        self.inner.partial
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.inner.abort.clone()
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.abort.is_aborted()
    }

    /// Fail with [`RenderError::Aborted`] once the request has been cancelled.
    pub fn check_abort(&self) -> Result<(), RenderError> {
        if self.is_aborted() {
            Err(RenderError::Aborted)
        } else {
            Ok(())
        }
    }

    /// Await `work` unless the request is aborted first.
    ///
    /// An abort while `work` is pending drops it and returns
    /// [`RenderError::Aborted`] immediately.
    pub(crate) async fn until_aborted<F, T>(&self, work: F) -> Result<T, RenderError>
    where
        F: Future<Output = Result<T, RenderError>>,
    {
        self.check_abort()?;
        let work = work.fuse();
        let aborted = self.inner.abort.aborted().fuse();
        futures::pin_mut!(work, aborted);

        futures::select_biased! {
            _ = aborted => Err(RenderError::Aborted),
            result = work => {
                let value = result?;
                self.check_abort()?;
                Ok(value)
            }
        }
    }

    pub(crate) fn next_instance_id(&self) -> InstanceId {
        InstanceId(self.inner.next_instance.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, RequestState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Merge an instance's head items into the request, at most once per instance.
    ///
    /// Returns `false` when the instance already propagated its items.
    pub fn propagate_head(&self, instance: InstanceId, items: HeadItems) -> bool {
        let mut state = self.state();
        if !state.propagated.insert(instance) {
            return false;
        }
        trace!(%instance, items = items.len(), "propagating head items");
        state.head.merge(items);
        true
    }

    /// Add head items that do not belong to a component instance.
    pub fn add_head(&self, items: HeadItems) {
        self.state().head.merge(items);
    }

    /// Snapshot of the head items collected so far.
    pub fn head_items(&self) -> HeadItems {
        self.state().head.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_propagation_is_once_per_instance() {
        let ctx = RenderContext::new(RenderConfig::default());
        let a = ctx.next_instance_id();
        let b = ctx.next_instance_id();
        assert_ne!(a, b);

        assert!(ctx.propagate_head(a, HeadItems::new().with_stylesheet("/a.css")));
        assert!(!ctx.propagate_head(a, HeadItems::new().with_stylesheet("/again.css")));
        assert!(ctx.propagate_head(b, HeadItems::new().with_stylesheet("/b.css")));
        assert_eq!(ctx.head_items().len(), 2);
    }

    #[test]
    fn test_abort_is_shared() {
        let abort = AbortHandle::new();
        let ctx = RenderContext::builder().abort_handle(abort.clone()).build();
        assert!(ctx.check_abort().is_ok());
        abort.abort();
        assert_eq!(ctx.check_abort(), Err(RenderError::Aborted));
        assert!(ctx.clone().is_aborted());
    }

    #[tokio::test]
    async fn test_abort_interrupts_pending_work() {
        let ctx = RenderContext::new(RenderConfig::default());
        let abort = ctx.abort_handle();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            abort.abort();
        });

        let started = std::time::Instant::now();
        let result = ctx
            .until_aborted(async {
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert_eq!(result, Err(RenderError::Aborted));
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_finished_work_passes_through() {
        let ctx = RenderContext::new(RenderConfig::default());
        assert_eq!(ctx.until_aborted(async { Ok(7) }).await, Ok(7));

        ctx.abort_handle().abort();
        assert_eq!(
            ctx.until_aborted(async { Ok(7) }).await,
            Err(RenderError::Aborted)
        );
    }

    #[test]
    fn test_builder_keeps_request_id() {
        let ctx = RenderContext::builder()
            .request_id(RequestId::from_string("req-1"))
            .partial(true)
            .build();
        assert_eq!(ctx.request_id().as_str(), "req-1");
        assert!(ctx.is_partial());
    }
}
