//! Render error types.

use std::fmt::Display;

use thiserror::Error;

/// Errors raised while rendering or writing output.
///
/// Payloads are plain strings so an error can be cloned and re-surfaced by
/// every later render of a failed component.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("Render aborted")]
    Aborted,

    #[error("Destination write failed: {0}")]
    Destination(String),

    #[error("Component '{component}' failed: {message}")]
    Component { component: String, message: String },

    #[error("Component '{0}' rendered itself while resolving")]
    Reentrant(String),

    #[error("Component '{0}' output was already consumed")]
    Consumed(String),

    #[error("Slot '{slot}' failed: {message}")]
    Slot { slot: String, message: String },

    #[error("Response body failed: {0}")]
    Body(String),

    #[error("{0}")]
    Message(String),
}

impl RenderError {
    /// Create a free-form error.
    pub fn msg(message: impl Display) -> Self {
        Self::Message(message.to_string())
    }

    /// Wrap a failure raised by a component factory.
    pub fn component(component: impl Into<String>, message: impl Display) -> Self {
        Self::Component {
            component: component.into(),
            message: message.to_string(),
        }
    }

    /// Whether the error came from cancellation rather than a failure.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}
