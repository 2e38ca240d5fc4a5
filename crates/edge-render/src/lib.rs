//! Streaming HTML renderer.
//!
//! A page is a tree of [`Child`] values. [`render_child`] walks the tree
//! depth-first and writes [`RenderChunk`]s to a [`RenderDestination`]:
//!
//! - text is escaped, [`HtmlString`] and bytes are written as-is
//! - futures, streams and component factories suspend the walk without
//!   reordering output
//! - [`RenderInstruction`]s travel beside the text and are materialized once
//!   per request by the [`RenderContext`]
//!
//! ```
//! use edge_core::RenderConfig;
//! use edge_render::{render_to_string, Child, RenderContext};
//!
//! # futures::executor::block_on(async {
//! let ctx = RenderContext::new(RenderConfig::default());
//! let page = Child::from(vec![Child::html("<p>"), Child::text("a < b"), Child::html("</p>")]);
//! let output = render_to_string(&ctx, page).await.unwrap();
//! assert_eq!(output.html, "<p>a &lt; b</p>");
//! # });
//! ```

mod child;
mod component;
mod context;
mod head;
mod materialize;
mod renderer;
mod slot;

pub use child::*;
pub use component::*;
pub use context::*;
pub use head::*;
pub use renderer::*;
pub use slot::*;

pub use edge_streaming::{
    escape_html, BufferDestination, FlushController, FlushPolicy, HtmlBytes, HtmlString,
    InstructionHandler, InstructionKind, RenderChunk, RenderDestination, RenderError,
    RenderInstruction, RenderSummary, SinkDestination, StringDestination, WriteStats,
};
