//! The renderable value tree.

use std::fmt;
use std::future::Future;

use edge_streaming::{HtmlBytes, HtmlString, RenderError, RenderInstruction};
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, Stream, StreamExt};

use crate::component::ComponentInstance;

/// A child that resolves later.
pub type ChildFuture = BoxFuture<'static, Result<Child, RenderError>>;

/// An asynchronous sequence of children.
pub type ChildStream = BoxStream<'static, Result<Child, RenderError>>;

/// Body chunks of an embedded response.
pub type BodyStream = BoxStream<'static, Result<Vec<u8>, RenderError>>;

/// Every value shape the renderer accepts.
pub enum Child {
    /// Renders nothing.
    Empty,
    /// Raw text, escaped on output.
    Text(String),
    /// Markup that is written as-is.
    Html(HtmlString),
    /// Pre-rendered bytes written as-is.
    Bytes(HtmlBytes),
    Int(i64),
    Float(f64),
    /// `false` renders nothing, `true` renders `true`.
    Bool(bool),
    /// Siblings rendered in order without separators.
    List(Vec<Child>),
    /// Suspends until resolved, then renders the result.
    Future(ChildFuture),
    /// Invoked at render time.
    Thunk(Box<dyn FnOnce() -> Child + Send>),
    /// Drained lazily, in order.
    Iter(Box<dyn Iterator<Item = Child> + Send>),
    /// Drained with a suspension between items.
    Stream(ChildStream),
    Component(ComponentInstance),
    /// Out-of-band directive passed to the destination.
    Instruction(RenderInstruction),
    /// Body of an embedded response, written as bytes.
    Response(BodyStream),
    /// Anything else; rendered through `Display` and escaped.
    Display(Box<dyn fmt::Display + Send>),
}

impl Child {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn html(markup: impl Into<String>) -> Self {
        Self::Html(HtmlString::trusted(markup))
    }

    /// A child produced by a fallible future.
    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = Result<Child, RenderError>> + Send + 'static,
    {
        Self::Future(future.boxed())
    }

    /// A child invoked when the renderer reaches it.
    pub fn lazy<F>(thunk: F) -> Self
    where
        F: FnOnce() -> Child + Send + 'static,
    {
        Self::Thunk(Box::new(thunk))
    }

    /// A lazily drained sequence.
    pub fn iter<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Child> + 'static,
        I::IntoIter: Send + 'static,
    {
        Self::Iter(Box::new(items.into_iter().map(Into::into)))
    }

    /// An asynchronous sequence.
    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Child, RenderError>> + Send + 'static,
    {
        Self::Stream(stream.boxed())
    }

    /// Embed a response whose body is a byte stream.
    pub fn response<B, E>(response: http::Response<B>) -> Self
    where
        B: Stream<Item = Result<Vec<u8>, E>> + Send + 'static,
        E: fmt::Display,
    {
        let body = response
            .into_body()
            .map(|chunk| chunk.map_err(|e| RenderError::Body(e.to_string())));
        Self::Response(body.boxed())
    }

    /// Best-effort rendering through `Display`.
    pub fn display<T>(value: T) -> Self
    where
        T: fmt::Display + Send + 'static,
    {
        Self::Display(Box::new(value))
    }

    /// Whether the child is one of the shapes that renders nothing.
    pub fn is_falsy(&self) -> bool {
        matches!(self, Self::Empty | Self::Bool(false))
    }
}

impl fmt::Debug for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Html(html) => f.debug_tuple("Html").field(html).finish(),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Int(n) => f.debug_tuple("Int").field(n).finish(),
            Self::Float(n) => f.debug_tuple("Float").field(n).finish(),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::List(children) => f.debug_tuple("List").field(children).finish(),
            Self::Future(_) => f.write_str("Future(..)"),
            Self::Thunk(_) => f.write_str("Thunk(..)"),
            Self::Iter(_) => f.write_str("Iter(..)"),
            Self::Stream(_) => f.write_str("Stream(..)"),
            Self::Component(instance) => f.debug_tuple("Component").field(instance).finish(),
            Self::Instruction(instruction) => {
                f.debug_tuple("Instruction").field(instruction).finish()
            }
            Self::Response(_) => f.write_str("Response(..)"),
            Self::Display(value) => f.debug_tuple("Display").field(&value.to_string()).finish(),
        }
    }
}

/// Mark text as safe markup. Already-safe values and non-text values are returned unchanged.
pub fn mark_safe(child: Child) -> Child {
    match child {
        Child::Text(text) => Child::Html(HtmlString::trusted(text)),
        other => other,
    }
}

/// Normalize a child so nothing inside it is escaped again.
///
/// Text is marked safe; futures, sequences and streams are mapped so their
/// items are normalized when produced. Bytes, responses and other shapes pass through.
pub fn unescape_html(child: Child) -> Child {
    match child {
        Child::Text(_) => mark_safe(child),
        Child::List(children) => Child::List(children.into_iter().map(unescape_html).collect()),
        Child::Future(future) => Child::Future(future.map(|r| r.map(unescape_html)).boxed()),
        Child::Iter(iter) => Child::Iter(Box::new(iter.map(unescape_html))),
        Child::Stream(stream) => Child::Stream(stream.map(|r| r.map(unescape_html)).boxed()),
        Child::Thunk(thunk) => Child::Thunk(Box::new(move || unescape_html(thunk()))),
        other => other,
    }
}

/// Number text as JavaScript's `Number#toString` prints it.
///
/// Magnitudes of at least 1e21 or below 1e-6 use exponent notation (`1e+21`, `1.5e-7`).
pub(crate) fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let magnitude = value.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let formatted = format!("{:e}", value);
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => formatted,
        };
    }

    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

impl From<()> for Child {
    fn from(_: ()) -> Self {
        Self::Empty
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<HtmlString> for Child {
    fn from(html: HtmlString) -> Self {
        Self::Html(html)
    }
}

impl From<HtmlBytes> for Child {
    fn from(bytes: HtmlBytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<i32> for Child {
    fn from(n: i32) -> Self {
        Self::Int(n.into())
    }
}

impl From<i64> for Child {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<u32> for Child {
    fn from(n: u32) -> Self {
        Self::Int(n.into())
    }
}

impl From<f64> for Child {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for Child {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<RenderInstruction> for Child {
    fn from(instruction: RenderInstruction) -> Self {
        Self::Instruction(instruction)
    }
}

impl From<ComponentInstance> for Child {
    fn from(instance: ComponentInstance) -> Self {
        Self::Component(instance)
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Empty, Into::into)
    }
}

impl<T: Into<Child>> From<Vec<T>> for Child {
    fn from(children: Vec<T>) -> Self {
        Self::List(children.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for Child {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Empty,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map_or_else(|| Self::Text(n.to_string()), Self::Float),
            },
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::List(items.into_iter().map(Child::from).collect()),
            object @ Value::Object(_) => Self::Text(object.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_safe_is_idempotent() {
        let once = mark_safe(Child::text("<b>"));
        let twice = mark_safe(mark_safe(Child::text("<b>")));
        match (once, twice) {
            (Child::Html(a), Child::Html(b)) => {
                assert_eq!(a, b);
                assert_eq!(a.as_str(), "<b>");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_mark_safe_passes_scalars_through() {
        assert!(matches!(mark_safe(Child::Int(0)), Child::Int(0)));
        assert!(matches!(mark_safe(Child::Empty), Child::Empty));
    }

    #[test]
    fn test_unescape_html_maps_lists() {
        match unescape_html(Child::from(vec!["<i>", "<u>"])) {
            Child::List(items) => assert!(items.iter().all(|c| matches!(c, Child::Html(_)))),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(3.0), "3");
        assert_eq!(format_float(-0.0), "0");
        assert_eq!(format_float(0.5), "0.5");
        assert_eq!(format_float(f64::NAN), "NaN");
        assert_eq!(format_float(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_format_float_exponent_ranges() {
        assert_eq!(format_float(1e21), "1e+21");
        assert_eq!(format_float(-2e22), "-2e+22");
        assert_eq!(format_float(1.23e27), "1.23e+27");
        assert_eq!(format_float(1e-7), "1e-7");
        assert_eq!(format_float(1.5e-7), "1.5e-7");
        assert_eq!(format_float(1e20), "100000000000000000000");
        assert_eq!(format_float(0.000001), "0.000001");
    }

    #[test]
    fn test_json_conversion() {
        assert!(matches!(Child::from(serde_json::Value::Null), Child::Empty));
        assert!(matches!(Child::from(serde_json::json!(0)), Child::Int(0)));
        assert!(matches!(Child::from(serde_json::json!(1.5)), Child::Float(_)));
        assert!(matches!(Child::from(serde_json::json!(false)), Child::Bool(false)));
        match Child::from(serde_json::json!(["a", 1])) {
            Child::List(items) => assert_eq!(items.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }
}
