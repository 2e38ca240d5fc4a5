//! Out-of-band render instructions.

use serde::{Deserialize, Serialize};

use crate::escape::HtmlString;

/// What an instruction asks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "kebab-case")]
pub enum InstructionKind {
    /// The hydration bootstrap script.
    HydrationScript,
    /// The loader script for a named client directive (e.g. `load`, `visible`).
    Directive(String),
    /// The collected head items.
    Head,
    /// The collected head items, unless the render is a partial.
    MaybeHead,
    /// The server island runtime script.
    ServerIslandRuntime,
}

/// A directive that travels beside the text stream and is materialized by the destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderInstruction {
    pub kind: InstructionKind,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl RenderInstruction {
    pub fn new(kind: InstructionKind) -> Self {
        Self {
            kind,
            payload: serde_json::Value::Null,
        }
    }

    pub fn hydration_script() -> Self {
        Self::new(InstructionKind::HydrationScript)
    }

    pub fn directive(name: impl Into<String>) -> Self {
        Self::new(InstructionKind::Directive(name.into()))
    }

    pub fn head() -> Self {
        Self::new(InstructionKind::Head)
    }

    pub fn maybe_head() -> Self {
        Self::new(InstructionKind::MaybeHead)
    }

    pub fn server_island_runtime() -> Self {
        Self::new(InstructionKind::ServerIslandRuntime)
    }

    /// Attach a free-form payload.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Turns instructions into markup for destinations that write a text stream.
///
/// Returning `None` means the instruction produces nothing, for example
/// because the same script was already emitted for this request.
pub trait InstructionHandler: Send + Sync {
    fn materialize(&self, instruction: &RenderInstruction) -> Option<HtmlString>;
}

/// Handler that drops every instruction.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardInstructions;

impl InstructionHandler for DiscardInstructions {
    fn materialize(&self, _instruction: &RenderInstruction) -> Option<HtmlString> {
        None
    }
}
