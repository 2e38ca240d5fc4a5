//! Component instances.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use edge_streaming::{RenderChunk, RenderDestination, RenderError};
use futures::future::BoxFuture;
use futures::lock::Mutex;
use futures::FutureExt;
use tracing::{debug, trace};

use crate::child::Child;
use crate::context::{InstanceId, RenderContext};
use crate::head::HeadItems;
use crate::renderer::render_node;
use crate::slot::{SlotFn, SlotSet};

/// Component properties.
pub type Props = serde_json::Map<String, serde_json::Value>;

/// What a component factory receives.
#[derive(Debug)]
pub struct ComponentInput {
    pub props: Props,
    pub slots: SlotSet,
}

/// What a component renders to.
pub enum ComponentOutput {
    /// Content rendered immediately.
    Direct(Child),
    /// Head items merged into the request before `content` is rendered.
    HeadAndContent { content: Child, head: HeadItems },
}

impl ComponentOutput {
    pub fn direct(child: impl Into<Child>) -> Self {
        Self::Direct(child.into())
    }
}

impl From<Child> for ComponentOutput {
    fn from(child: Child) -> Self {
        Self::Direct(child)
    }
}

/// Result of invoking a factory: ready now, or settling later.
pub enum FactoryResult {
    Ready(ComponentOutput),
    Pending(BoxFuture<'static, Result<ComponentOutput, RenderError>>),
}

impl FactoryResult {
    pub fn pending<F>(future: F) -> Self
    where
        F: std::future::Future<Output = Result<ComponentOutput, RenderError>> + Send + 'static,
    {
        Self::Pending(future.boxed())
    }
}

impl From<ComponentOutput> for FactoryResult {
    fn from(output: ComponentOutput) -> Self {
        Self::Ready(output)
    }
}

/// Builds a component's output from its input.
pub type ComponentFactory =
    Box<dyn FnOnce(&RenderContext, ComponentInput) -> Result<FactoryResult, RenderError> + Send>;

enum InstanceState {
    Unresolved {
        factory: ComponentFactory,
        input: ComponentInput,
    },
    /// Output recorded for instances that can be rendered again.
    Resolved(Vec<RenderChunk>),
    /// Output streamed once and not recorded.
    Consumed,
    Failed(RenderError),
}

struct InstanceInner {
    id: InstanceId,
    name: String,
    state: Mutex<InstanceState>,
}

/// A component factory bound to its props and slots for one request.
///
/// The factory runs at most once. Clones share the instance: when more than
/// one handle exists the output is recorded and replayed on later renders,
/// and a factory failure is returned again by every later render.
#[derive(Clone)]
pub struct ComponentInstance {
    inner: Arc<InstanceInner>,
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish()
    }
}

/// Builder for [`ComponentInstance`].
pub struct ComponentBuilder {
    name: String,
    factory: ComponentFactory,
    props: Props,
    slots: Vec<(String, SlotFn)>,
}

impl ComponentBuilder {
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    pub fn props(mut self, props: Props) -> Self {
        self.props.extend(props);
        self
    }

    pub fn slot(mut self, name: impl Into<String>, producer: SlotFn) -> Self {
        self.slots.push((name.into(), producer));
        self
    }

    /// Bind the instance to `ctx`. Slot producers run here, before the factory.
    pub fn build(self, ctx: &RenderContext) -> ComponentInstance {
        let id = ctx.next_instance_id();
        let slots = SlotSet::bind(self.slots, ctx);
        trace!(%id, name = %self.name, "component instance bound");

        ComponentInstance {
            inner: Arc::new(InstanceInner {
                id,
                name: self.name,
                state: Mutex::new(InstanceState::Unresolved {
                    factory: self.factory,
                    input: ComponentInput {
                        props: self.props,
                        slots,
                    },
                }),
            }),
        }
    }
}

impl ComponentInstance {
    pub fn builder<F>(name: impl Into<String>, factory: F) -> ComponentBuilder
    where
        F: FnOnce(&RenderContext, ComponentInput) -> Result<FactoryResult, RenderError>
            + Send
            + 'static,
    {
        ComponentBuilder {
            name: name.into(),
            factory: Box::new(factory),
            props: Props::new(),
            slots: Vec::new(),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub(crate) async fn render_in(
        &self,
        dest: &mut (dyn RenderDestination + '_),
        ctx: &RenderContext,
        ancestors: &[InstanceId],
    ) -> Result<(), RenderError> {
        let id = self.id();
        if ancestors.contains(&id) {
            return Err(RenderError::Reentrant(self.inner.name.clone()));
        }

        let mut state = self.inner.state.lock().await;
        let (factory, input) = match std::mem::replace(&mut *state, InstanceState::Consumed) {
            InstanceState::Unresolved { factory, input } => (factory, input),
            InstanceState::Resolved(chunks) => {
                *state = InstanceState::Resolved(chunks.clone());
                drop(state);
                trace!(%id, chunks = chunks.len(), "replaying component output");
                for chunk in chunks {
                    ctx.check_abort()?;
                    dest.write(chunk).await?;
                }
                return Ok(());
            }
            InstanceState::Failed(error) => {
                *state = InstanceState::Failed(error.clone());
                return Err(error);
            }
            InstanceState::Consumed => {
                return Err(RenderError::Consumed(self.inner.name.clone()));
            }
        };

        let output = match self.resolve(factory, input, ctx).await {
            Ok(output) => output,
            Err(error) => {
                debug!(%id, name = %self.inner.name, %error, "component factory failed");
                *state = InstanceState::Failed(error.clone());
                return Err(error);
            }
        };

        let content = match output {
            ComponentOutput::Direct(content) => content,
            ComponentOutput::HeadAndContent { content, head } => {
                ctx.propagate_head(id, head);
                content
            }
        };

        let mut path = ancestors.to_vec();
        path.push(id);

        let result = if Arc::strong_count(&self.inner) > 1 {
            let mut recorder = RecordingDestination {
                inner: dest,
                recorded: Vec::new(),
            };
            let result = render_node(&mut recorder, ctx, content, &path).await;
            if result.is_ok() {
                *state = InstanceState::Resolved(recorder.recorded);
            }
            result
        } else {
            render_node(dest, ctx, content, &path).await
        };

        if let Err(error) = &result {
            *state = InstanceState::Failed(error.clone());
        }
        result
    }

    async fn resolve(
        &self,
        factory: ComponentFactory,
        input: ComponentInput,
        ctx: &RenderContext,
    ) -> Result<ComponentOutput, RenderError> {
        let output = match factory(ctx, input).map_err(|e| self.factory_error(e))? {
            FactoryResult::Ready(output) => output,
            FactoryResult::Pending(future) => ctx
                .until_aborted(future)
                .await
                .map_err(|e| self.factory_error(e))?,
        };
        Ok(output)
    }

    fn factory_error(&self, error: RenderError) -> RenderError {
        match error {
            RenderError::Aborted | RenderError::Component { .. } => error,
            other => RenderError::component(self.inner.name.clone(), other),
        }
    }
}

/// Writes through to the real destination while keeping a copy for replay.
struct RecordingDestination<'a> {
    inner: &'a mut (dyn RenderDestination + 'a),
    recorded: Vec<RenderChunk>,
}

#[async_trait]
impl RenderDestination for RecordingDestination<'_> {
    async fn write(&mut self, chunk: RenderChunk) -> Result<(), RenderError> {
        self.recorded.push(chunk.clone());
        self.inner.write(chunk).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::render_to_string;
    use edge_core::RenderConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn ctx() -> RenderContext {
        RenderContext::new(RenderConfig::default())
    }

    #[tokio::test]
    async fn test_direct_output_with_props() {
        let ctx = ctx();
        let instance = ComponentInstance::builder("Greeting", |_ctx, input: ComponentInput| {
            let name = input.props.get("name").cloned().unwrap_or_default();
            Ok(ComponentOutput::direct(vec![
                Child::html("<h1>"),
                Child::from(name),
                Child::html("</h1>"),
            ])
            .into())
        })
        .prop("name", "<World>")
        .build(&ctx);

        let output = render_to_string(&ctx, instance.into()).await.unwrap();
        assert_eq!(output.html, "<h1>&lt;World&gt;</h1>");
    }

    #[tokio::test]
    async fn test_pending_factory_resolves_once() {
        let ctx = ctx();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let instance = ComponentInstance::builder("Slow", move |_ctx, _input| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(FactoryResult::pending(async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(ComponentOutput::from(Child::html("<p>slow</p>")))
            }))
        })
        .build(&ctx);

        let page = Child::from(vec![Child::from(instance.clone()), Child::from(instance)]);
        let output = render_to_string(&ctx, page).await.unwrap();
        assert_eq!(output.html, "<p>slow</p><p>slow</p>");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_head_and_content_propagates_once() {
        let ctx = ctx();
        let instance = ComponentInstance::builder("Styled", |_ctx, _input| {
            Ok(ComponentOutput::HeadAndContent {
                content: Child::html("<div></div>"),
                head: HeadItems::new().with_stylesheet("/styled.css"),
            }
            .into())
        })
        .build(&ctx);

        let page = Child::from(vec![
            Child::from(instance.clone()),
            Child::from(instance.clone()),
        ]);
        render_to_string(&ctx, page).await.unwrap();
        assert_eq!(ctx.head_items().len(), 1);
        assert!(!ctx.propagate_head(instance.id(), HeadItems::new().with_style("x")));
    }

    #[tokio::test]
    async fn test_failed_factory_resurfaces_same_error() {
        let ctx = ctx();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let instance = ComponentInstance::builder("Broken", move |_ctx, _input| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(RenderError::msg("no data"))
        })
        .build(&ctx);
        let again = instance.clone();

        let first = render_to_string(&ctx, instance.into()).await.unwrap_err();
        let second = render_to_string(&ctx, again.into()).await.unwrap_err();
        assert_eq!(first, RenderError::component("Broken", "no data"));
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reentrant_render_is_an_error() {
        let ctx = ctx();
        let cell: Arc<std::sync::Mutex<Option<ComponentInstance>>> = Default::default();
        let inner_cell = cell.clone();
        let instance = ComponentInstance::builder("Loop", move |_ctx, _input| {
            let me = inner_cell.lock().unwrap().take();
            Ok(ComponentOutput::direct(me).into())
        })
        .build(&ctx);
        *cell.lock().unwrap() = Some(instance.clone());

        let err = render_to_string(&ctx, instance.into()).await.unwrap_err();
        assert_eq!(err, RenderError::Reentrant("Loop".to_string()));
    }

    #[tokio::test]
    async fn test_slots_are_primed_before_factory() {
        let ctx = ctx();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let slot_order = order.clone();
        let factory_order = order.clone();

        let instance = ComponentInstance::builder("Layout", move |ctx, mut input| {
            factory_order.lock().unwrap().push("factory");
            Ok(ComponentOutput::direct(vec![
                Child::html("<main>"),
                input.slots.take("default", ctx),
                Child::html("</main>"),
            ])
            .into())
        })
        .slot(
            "default",
            crate::slot::slot_fn(move |_| {
                slot_order.lock().unwrap().push("slot");
                Child::text("body")
            }),
        )
        .build(&ctx);

        assert_eq!(*order.lock().unwrap(), vec!["slot"]);
        let output = render_to_string(&ctx, instance.into()).await.unwrap();
        assert_eq!(output.html, "<main>body</main>");
        assert_eq!(*order.lock().unwrap(), vec!["slot", "factory"]);
    }
}
