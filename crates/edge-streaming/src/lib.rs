//! Streaming output primitives for the HTML renderer.
//!
//! This crate provides the write side of a render:
//! - `HtmlString` / `HtmlBytes` - Content that must not be escaped again
//! - `RenderChunk` / `RenderInstruction` - What a render hands to its destination
//! - `RenderDestination` - Ordered sink for chunks
//! - `BufferDestination`, `StringDestination`, `SinkDestination` - Destination backings
//! - `FlushPolicy` - Coalescing control for sink-backed output

mod chunk;
mod destination;
mod error;
mod escape;
mod flush;
mod instruction;
mod sink;

pub use chunk::*;
pub use destination::*;
pub use error::*;
pub use escape::*;
pub use flush::*;
pub use instruction::*;
pub use sink::*;
