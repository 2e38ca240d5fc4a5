//! Slot binding and memoization.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use edge_streaming::{BufferDestination, HtmlString, RenderError, RenderInstruction};

use crate::child::Child;
use crate::context::RenderContext;
use crate::renderer::render_child;

/// Produces a slot's content for a request.
pub type SlotFn = Arc<dyn Fn(&RenderContext) -> Child + Send + Sync>;

/// Wrap a closure as a [`SlotFn`].
pub fn slot_fn<F>(producer: F) -> SlotFn
where
    F: Fn(&RenderContext) -> Child + Send + Sync + 'static,
{
    Arc::new(producer)
}

/// Memo attached to one bound slot.
///
/// A binding runs its producer once when created. The first read replays that
/// value; every later read runs the producer again.
pub enum SlotMemo {
    NotYetRun(SlotFn),
    Cached(Child, SlotFn),
    MultiUse(SlotFn),
}

impl fmt::Debug for SlotMemo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotYetRun(_) => f.write_str("NotYetRun"),
            Self::Cached(child, _) => f.debug_tuple("Cached").field(child).finish(),
            Self::MultiUse(_) => f.write_str("MultiUse"),
        }
    }
}

/// One slot bound to a component instance.
#[derive(Debug)]
pub struct BoundSlot {
    memo: Option<SlotMemo>,
}

impl BoundSlot {
    /// Bind `producer`, running it immediately so its side effects are visible
    /// before the owning component renders.
    pub fn bind(producer: SlotFn, ctx: &RenderContext) -> Self {
        let mut slot = Self {
            memo: Some(SlotMemo::NotYetRun(producer)),
        };
        slot.prime(ctx);
        slot
    }

    fn prime(&mut self, ctx: &RenderContext) {
        if let Some(SlotMemo::NotYetRun(producer)) = self.memo.take() {
            let value = producer(ctx);
            self.memo = Some(SlotMemo::Cached(value, producer));
        }
    }

    /// Read the slot: the cached value on the first read, a fresh value afterwards.
    pub fn take(&mut self, ctx: &RenderContext) -> Child {
        let (child, producer) = match self.memo.take() {
            Some(SlotMemo::Cached(child, producer)) => (child, producer),
            Some(SlotMemo::NotYetRun(producer)) | Some(SlotMemo::MultiUse(producer)) => {
                (producer(ctx), producer)
            }
            None => return Child::Empty,
        };
        self.memo = Some(SlotMemo::MultiUse(producer));
        child
    }

    pub fn memo(&self) -> Option<&SlotMemo> {
        self.memo.as_ref()
    }
}

/// Named slots bound to one component instance.
#[derive(Debug, Default)]
pub struct SlotSet {
    slots: BTreeMap<String, BoundSlot>,
}

impl SlotSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind and prime every producer.
    pub fn bind<I>(producers: I, ctx: &RenderContext) -> Self
    where
        I: IntoIterator<Item = (String, SlotFn)>,
    {
        Self {
            slots: producers
                .into_iter()
                .map(|(name, producer)| (name, BoundSlot::bind(producer, ctx)))
                .collect(),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// Read a slot. Missing slots render nothing.
    pub fn take(&mut self, name: &str, ctx: &RenderContext) -> Child {
        self.slots
            .get_mut(name)
            .map_or(Child::Empty, |slot| slot.take(ctx))
    }

    /// Read a slot and render it to completion.
    pub async fn render(&mut self, name: &str, ctx: &RenderContext) -> Result<SlotResult, RenderError> {
        let child = self.take(name, ctx);
        render_slot_to_string(ctx, child)
            .await
            .map_err(|e| match e {
                RenderError::Aborted | RenderError::Slot { .. } => e,
                other => RenderError::Slot {
                    slot: name.to_string(),
                    message: other.to_string(),
                },
            })
    }
}

/// A slot rendered to completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotResult {
    pub content: HtmlString,
    pub instructions: Option<Vec<RenderInstruction>>,
}

/// Render `child` into a temporary buffer, collecting text and instructions separately.
pub async fn render_slot_to_string(
    ctx: &RenderContext,
    child: Child,
) -> Result<SlotResult, RenderError> {
    let mut buffer = BufferDestination::new();
    render_child(&mut buffer, ctx, child).await?;

    let instructions = buffer.instructions();
    Ok(SlotResult {
        content: buffer.html(),
        instructions: (!instructions.is_empty()).then_some(instructions),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_producer(calls: Arc<AtomicUsize>) -> SlotFn {
        slot_fn(move |_ctx| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Child::text(format!("call {}", n))
        })
    }

    #[tokio::test]
    async fn test_first_read_replays_primed_value() {
        let ctx = RenderContext::new(Default::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let mut slot = BoundSlot::bind(counting_producer(calls.clone()), &ctx);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(slot.memo(), Some(SlotMemo::Cached(..))));

        let first = render_slot_to_string(&ctx, slot.take(&ctx)).await.unwrap();
        assert_eq!(first.content.as_str(), "call 1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let second = render_slot_to_string(&ctx, slot.take(&ctx)).await.unwrap();
        assert_eq!(second.content.as_str(), "call 2");
        assert!(matches!(slot.memo(), Some(SlotMemo::MultiUse(_))));
    }

    #[tokio::test]
    async fn test_independent_bindings_rerun_producer() {
        let ctx = RenderContext::new(Default::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let producer = counting_producer(calls.clone());

        let mut a = BoundSlot::bind(producer.clone(), &ctx);
        let mut b = BoundSlot::bind(producer, &ctx);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let a = render_slot_to_string(&ctx, a.take(&ctx)).await.unwrap();
        let b = render_slot_to_string(&ctx, b.take(&ctx)).await.unwrap();
        assert_eq!(a.content.as_str(), "call 1");
        assert_eq!(b.content.as_str(), "call 2");
    }

    #[tokio::test]
    async fn test_slot_result_collects_instructions() {
        let ctx = RenderContext::new(Default::default());
        let mut slots = SlotSet::bind(
            [(
                "default".to_string(),
                slot_fn(|_| {
                    Child::from(vec![
                        Child::html("<i>"),
                        RenderInstruction::directive("load").into(),
                        Child::html("</i>"),
                    ])
                }),
            )],
            &ctx,
        );

        let result = slots.render("default", &ctx).await.unwrap();
        assert_eq!(result.content.as_str(), "<i></i>");
        assert_eq!(
            result.instructions,
            Some(vec![RenderInstruction::directive("load")])
        );

        let missing = slots.render("footer", &ctx).await.unwrap();
        assert_eq!(missing, SlotResult::default());
    }

    #[tokio::test]
    async fn test_failing_slot_names_the_slot() {
        let ctx = RenderContext::new(Default::default());
        let mut slots = SlotSet::bind(
            [(
                "default".to_string(),
                slot_fn(|_| Child::future(async { Err(RenderError::msg("boom")) })),
            )],
            &ctx,
        );
        let err = slots.render("default", &ctx).await.unwrap_err();
        assert_eq!(
            err,
            RenderError::Slot {
                slot: "default".to_string(),
                message: "boom".to_string()
            }
        );
    }
}
