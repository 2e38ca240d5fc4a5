//! Recursive child rendering.

use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::Arc;

use edge_streaming::{
    BufferDestination, FlushController, HtmlBytes, HtmlString, RenderChunk, RenderDestination,
    RenderError, RenderSummary, SinkDestination, StringDestination,
};
use futures::future::BoxFuture;
use futures::stream::FuturesOrdered;
use futures::{FutureExt, Sink, StreamExt};
use tracing::{debug, warn};

use crate::child::{format_float, Child};
use crate::context::{InstanceId, RenderContext};

/// Render `child` into `dest`.
///
/// Output follows the depth-first, left-to-right order of the tree no matter
/// where the render suspends. An abort is observed before every write and
/// interrupts any pending suspension.
pub fn render_child<'a>(
    dest: &'a mut (dyn RenderDestination + 'a),
    ctx: &'a RenderContext,
    child: Child,
) -> BoxFuture<'a, Result<(), RenderError>> {
    render_node(dest, ctx, child, &[])
}

pub(crate) fn render_node<'a>(
    dest: &'a mut (dyn RenderDestination + 'a),
    ctx: &'a RenderContext,
    child: Child,
    ancestors: &'a [InstanceId],
) -> BoxFuture<'a, Result<(), RenderError>> {
    async move {
        ctx.check_abort()?;

        match child {
            Child::Empty | Child::Bool(false) => Ok(()),
            Child::Bool(true) => write_html(dest, ctx, HtmlString::trusted("true")).await,
            Child::Int(n) => write_html(dest, ctx, HtmlString::trusted(n.to_string())).await,
            Child::Float(n) => write_html(dest, ctx, HtmlString::trusted(format_float(n))).await,
            Child::Text(text) => write_html(dest, ctx, HtmlString::escape(&text)).await,
            Child::Html(html) => write_html(dest, ctx, html).await,
            Child::Bytes(bytes) => write_bytes(dest, ctx, bytes).await,
            Child::Instruction(instruction) => {
                dest.write(RenderChunk::Instruction(instruction)).await
            }
            Child::Future(future) => {
                let resolved = ctx.until_aborted(future).await?;
                render_node(dest, ctx, resolved, ancestors).await
            }
            Child::List(children) => render_list(dest, ctx, children, ancestors).await,
            Child::Thunk(thunk) => render_node(dest, ctx, thunk(), ancestors).await,
            Child::Iter(iter) => {
                for item in iter {
                    render_node(&mut *dest, ctx, item, ancestors).await?;
                }
                Ok(())
            }
            Child::Stream(mut stream) => {
                while let Some(item) = ctx.until_aborted(stream.next().map(Ok)).await? {
                    render_node(&mut *dest, ctx, item?, ancestors).await?;
                }
                Ok(())
            }
            Child::Component(instance) => instance.render_in(dest, ctx, ancestors).await,
            Child::Response(mut body) => {
                while let Some(chunk) = ctx.until_aborted(body.next().map(Ok)).await? {
                    write_bytes(&mut *dest, ctx, HtmlBytes::new(chunk?)).await?;
                }
                Ok(())
            }
            Child::Display(value) => {
                warn!("rendering unrecognized value through Display");
                write_html(dest, ctx, HtmlString::escape(&value.to_string())).await
            }
        }
    }
    .boxed()
}

async fn write_html(
    dest: &mut (dyn RenderDestination + '_),
    ctx: &RenderContext,
    html: HtmlString,
) -> Result<(), RenderError> {
    if html.is_empty() {
        return Ok(());
    }
    ctx.check_abort()?;
    dest.write(RenderChunk::Html(html)).await
}

async fn write_bytes(
    dest: &mut (dyn RenderDestination + '_),
    ctx: &RenderContext,
    bytes: HtmlBytes,
) -> Result<(), RenderError> {
    if bytes.is_empty() {
        return Ok(());
    }
    ctx.check_abort()?;
    dest.write(RenderChunk::Bytes(bytes)).await
}

/// Render siblings in order.
///
/// With concurrent siblings enabled, the first sibling streams straight to
/// `dest` while the others render ahead into private buffers. Buffers are
/// drained strictly in sibling order.
async fn render_list<'a>(
    dest: &'a mut (dyn RenderDestination + 'a),
    ctx: &'a RenderContext,
    children: Vec<Child>,
    ancestors: &'a [InstanceId],
) -> Result<(), RenderError> {
    if children.len() < 2 || !ctx.config().concurrent_siblings {
        for child in children {
            render_node(&mut *dest, ctx, child, ancestors).await?;
        }
        return Ok(());
    }

    let mut children = children.into_iter();
    let Some(first) = children.next() else {
        return Ok(());
    };

    let mut ahead: FuturesOrdered<_> = children
        .map(|child| render_ahead(ctx, child, ancestors))
        .collect();
    let mut finished = VecDeque::new();

    {
        let current = render_node(&mut *dest, ctx, first, ancestors).fuse();
        futures::pin_mut!(current);
        loop {
            futures::select_biased! {
                result = current => {
                    result?;
                    break;
                }
                buffered = ahead.select_next_some() => finished.push_back(buffered),
            }
        }
    }

    for buffered in finished {
        ctx.check_abort()?;
        buffered?.drain_into(&mut *dest).await?;
    }
    while let Some(buffered) = ahead.next().await {
        ctx.check_abort()?;
        buffered?.drain_into(&mut *dest).await?;
    }
    Ok(())
}

fn render_ahead<'a>(
    ctx: &'a RenderContext,
    child: Child,
    ancestors: &'a [InstanceId],
) -> BoxFuture<'a, Result<BufferDestination, RenderError>> {
    async move {
        let mut buffer = BufferDestination::new();
        render_node(&mut buffer, ctx, child, ancestors).await?;
        Ok(buffer)
    }
    .boxed()
}

/// A fully buffered render.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub html: String,
    pub summary: RenderSummary,
}

/// Render `child` to a complete string, materializing instructions against `ctx`.
pub async fn render_to_string(ctx: &RenderContext, child: Child) -> Result<RenderOutput, RenderError> {
    let mut dest = StringDestination::new(Arc::new(ctx.clone()));
    if let Err(error) = render_child(&mut dest, ctx, child).await {
        dest.record_error(&error);
        debug!(request_id = %ctx.request_id(), %error, "render to string failed");
        return Err(error);
    }

    let (html, summary) = dest.finish();
    debug!(
        request_id = %ctx.request_id(),
        bytes = summary.stats.bytes_written,
        "render to string complete"
    );
    Ok(RenderOutput { html, summary })
}

/// Stream `child` into `sink`, flushing according to `flush`.
///
/// On failure or cancellation, bytes already handed to the sink stay there;
/// the sink is not closed.
pub async fn render_to_sink<S, E>(
    ctx: &RenderContext,
    child: Child,
    sink: S,
    flush: FlushController,
) -> Result<RenderSummary, RenderError>
where
    S: Sink<Vec<u8>, Error = E> + Unpin + Send,
    E: Display + Send,
{
    let mut dest = SinkDestination::new(sink, Arc::new(ctx.clone()), flush);
    let result = match render_child(&mut dest, ctx, child).await {
        Ok(()) => dest.finish().await,
        Err(error) => Err(error),
    };

    match result {
        Ok(()) => {
            let summary = dest.summary();
            debug!(
                request_id = %ctx.request_id(),
                bytes = summary.stats.bytes_written,
                chunks = summary.stats.chunks_written,
                "streamed render complete"
            );
            Ok(summary)
        }
        Err(error) => {
            dest.record_error(&error);
            if error.is_aborted() {
                debug!(request_id = %ctx.request_id(), "streamed render aborted");
            } else {
                warn!(request_id = %ctx.request_id(), %error, "streamed render failed");
            }
            Err(error)
        }
    }
}
