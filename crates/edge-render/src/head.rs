//! Head items collected while rendering.

use edge_streaming::{escape_html, HtmlString};

/// Styles and scripts a component needs in the document head.
///
/// Items keep insertion order; adding an item that is already present is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadItems {
    styles: Vec<String>,
    scripts: Vec<String>,
}

impl HeadItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stylesheet link.
    pub fn with_stylesheet(mut self, href: &str) -> Self {
        self.push_style(format!(r#"<link rel="stylesheet" href="{}">"#, escape_html(href)));
        self
    }

    /// Add inline CSS.
    pub fn with_style(mut self, css: &str) -> Self {
        self.push_style(format!("<style>{}</style>", css));
        self
    }

    /// Add an external module script.
    pub fn with_script(mut self, src: &str) -> Self {
        self.push_script(format!(
            r#"<script type="module" src="{}"></script>"#,
            escape_html(src)
        ));
        self
    }

    /// Add an inline module script.
    pub fn with_inline_script(mut self, js: &str) -> Self {
        self.push_script(format!(r#"<script type="module">{}</script>"#, js));
        self
    }

    fn push_style(&mut self, tag: String) {
        if !self.styles.contains(&tag) {
            self.styles.push(tag);
        }
    }

    fn push_script(&mut self, tag: String) {
        if !self.scripts.contains(&tag) {
            self.scripts.push(tag);
        }
    }

    /// Merge `other` into `self`, keeping first-seen order.
    pub fn merge(&mut self, other: HeadItems) {
        for style in other.styles {
            self.push_style(style);
        }
        for script in other.scripts {
            self.push_script(script);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty() && self.scripts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.styles.len() + self.scripts.len()
    }

    /// Render styles, then scripts.
    pub fn render(&self) -> HtmlString {
        let mut html = String::new();
        for tag in self.styles.iter().chain(self.scripts.iter()) {
            html.push_str(tag);
        }
        HtmlString::trusted(html)
    }
}
