//! Units of rendered output.

use std::borrow::Cow;

use crate::escape::{HtmlBytes, HtmlString};
use crate::instruction::{InstructionHandler, RenderInstruction};

/// One ordered write handed to a destination.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderChunk {
    Html(HtmlString),
    Bytes(HtmlBytes),
    Instruction(RenderInstruction),
}

impl RenderChunk {
    /// Output size in bytes. Instructions count as zero until materialized.
    pub fn len(&self) -> usize {
        match self {
            Self::Html(html) => html.len(),
            Self::Bytes(bytes) => bytes.len(),
            Self::Instruction(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0 && !self.is_instruction()
    }

    pub fn is_instruction(&self) -> bool {
        matches!(self, Self::Instruction(_))
    }

    /// Text form of the chunk, materializing instructions through `handler`.
    pub fn to_text(&self, handler: &dyn InstructionHandler) -> Option<Cow<'_, str>> {
        match self {
            Self::Html(html) => Some(Cow::Borrowed(html.as_str())),
            Self::Bytes(bytes) => Some(bytes.to_string_lossy()),
            Self::Instruction(instruction) => handler
                .materialize(instruction)
                .map(|html| Cow::Owned(html.into_string())),
        }
    }

    /// Byte form of the chunk, materializing instructions through `handler`.
    pub fn into_bytes(self, handler: &dyn InstructionHandler) -> Option<Vec<u8>> {
        match self {
            Self::Html(html) => Some(html.into_string().into_bytes()),
            Self::Bytes(bytes) => Some(bytes.into_vec()),
            Self::Instruction(instruction) => handler
                .materialize(&instruction)
                .map(|html| html.into_string().into_bytes()),
        }
    }
}

impl From<HtmlString> for RenderChunk {
    fn from(html: HtmlString) -> Self {
        Self::Html(html)
    }
}

impl From<HtmlBytes> for RenderChunk {
    fn from(bytes: HtmlBytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<RenderInstruction> for RenderChunk {
    fn from(instruction: RenderInstruction) -> Self {
        Self::Instruction(instruction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::DiscardInstructions;

    #[test]
    fn test_chunk_lengths() {
        assert_eq!(RenderChunk::from(HtmlString::trusted("<p>")).len(), 3);
        assert_eq!(RenderChunk::from(HtmlBytes::new(vec![1, 2])).len(), 2);
        let instruction = RenderChunk::from(RenderInstruction::head());
        assert_eq!(instruction.len(), 0);
        assert!(!instruction.is_empty());
        assert!(RenderChunk::from(HtmlString::default()).is_empty());
    }

    #[test]
    fn test_discarded_instruction_has_no_text() {
        let chunk = RenderChunk::from(RenderInstruction::hydration_script());
        assert!(chunk.to_text(&DiscardInstructions).is_none());
        assert!(chunk.into_bytes(&DiscardInstructions).is_none());
    }
}
