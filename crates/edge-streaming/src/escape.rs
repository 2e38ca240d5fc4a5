//! HTML escaping and pre-escaped content markers.

use std::borrow::Cow;
use std::fmt;

/// Escape `&`, `<`, `>`, `"` and `'` for use in HTML text or attribute values.
///
/// Borrows the input when nothing needs escaping.
pub fn escape_html(raw: &str) -> Cow<'_, str> {
    let Some(first) = raw.find(['&', '<', '>', '"', '\'']) else {
        return Cow::Borrowed(raw);
    };

    let mut escaped = String::with_capacity(raw.len() + 16);
    escaped.push_str(&raw[..first]);
    for c in raw[first..].chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// Markup that is already safe to write and must never be escaped again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct HtmlString(String);

impl HtmlString {
    /// Wrap markup that is already safe.
    pub fn trusted(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }

    /// Escape raw text and wrap the result.
    pub fn escape(raw: &str) -> Self {
        Self(escape_html(raw).into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append already-safe markup.
    pub fn push(&mut self, other: &HtmlString) {
        self.0.push_str(&other.0);
    }
}

impl fmt::Display for HtmlString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<HtmlString> for String {
    fn from(html: HtmlString) -> Self {
        html.0
    }
}

/// Bytes that were rendered elsewhere (e.g. a proxied response body) and are written as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct HtmlBytes(Vec<u8>);

impl HtmlBytes {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode as UTF-8, replacing invalid sequences.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}
