//! HTML serialization helpers
//!
//! Shared by the bundled [`Dom`](crate::target::Dom) binding and by
//! transformers that need to print a [`Fragment`].

use crate::attr::Attrs;
use crate::node::{Fragment, FragmentNode};

// =============================================================================
// RenderConfig
// =============================================================================

/// Configuration for document serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderConfig {
    /// Prefix the document with `<!DOCTYPE html>`.
    pub doctype: bool,
    /// Close void elements XML-style (`<br />`).
    pub xhtml: bool,
}

impl RenderConfig {
    /// HTML5 output, no doctype.
    pub const HTML5: Self = Self {
        doctype: false,
        xhtml: false,
    };

    /// XHTML-compatible output.
    pub const XHTML: Self = Self {
        doctype: false,
        xhtml: true,
    };

    /// Emit a doctype line before the document.
    pub const fn with_doctype(mut self) -> Self {
        self.doctype = true;
        self
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::HTML5
    }
}

// =============================================================================
// Writers
// =============================================================================

/// Write `<tag attrs>` (or the self-closing form of a void element).
///
/// Returns `false` when the element is void and must not be closed.
pub(crate) fn open_tag(tag: &str, attrs: &Attrs, config: &RenderConfig, output: &mut String) -> bool {
    output.push('<');
    output.push_str(tag);
    render_attrs(attrs, output);

    if is_void_element(tag) {
        output.push_str(if config.xhtml { " />" } else { ">" });
        return false;
    }
    output.push('>');
    true
}

/// Write `</tag>`.
pub(crate) fn close_tag(tag: &str, output: &mut String) {
    output.push_str("</");
    output.push_str(tag);
    output.push('>');
}

/// Write text content; raw inside `script`/`style`.
pub(crate) fn write_text(parent_tag: &str, text: &str, output: &mut String) {
    if is_raw_text_element(parent_tag) {
        output.push_str(text);
    } else {
        output.push_str(&escape_html(text));
    }
}

/// Render a fragment to an HTML string.
pub fn render_fragment(fragment: &Fragment, config: &RenderConfig) -> String {
    let mut output = String::new();
    if let Some(text) = &fragment.text {
        output.push_str(&escape_html(text));
    }
    for node in &fragment.nodes {
        render_fragment_node(node, "", config, &mut output);
    }
    output
}

fn render_fragment_node(node: &FragmentNode, parent_tag: &str, config: &RenderConfig, output: &mut String) {
    if open_tag(&node.tag, &node.attrs, config, output) {
        if let Some(text) = &node.text {
            write_text(&node.tag, text, output);
        }
        for child in &node.children {
            render_fragment_node(child, &node.tag, config, output);
        }
        close_tag(&node.tag, output);
    }
    if let Some(tail) = &node.tail {
        write_text(parent_tag, tail, output);
    }
}

/// Render attributes to HTML.
fn render_attrs(attrs: &Attrs, output: &mut String) {
    for (name, value) in attrs.iter() {
        output.push(' ');
        output.push_str(name);
        output.push_str("=\"");
        output.push_str(&escape_attr(value));
        output.push('"');
    }
}

/// Escape HTML special characters.
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape attribute value special characters.
pub fn escape_attr(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

/// Check if element is a void element (never has content).
pub fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Elements whose text content is emitted without escaping.
fn is_raw_text_element(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape_html("a < b & c"), "a &lt; b &amp; c");
        assert_eq!(escape_attr(r#"say "hi""#), "say &quot;hi&quot;");
    }

    #[test]
    fn test_render_fragment_with_tails() {
        let mut frag = Fragment::empty();
        frag.push_text("lead ");
        frag.push(FragmentNode::new("b").text("bold").tail(" & more"));
        frag.push(FragmentNode::new("br"));
        assert_eq!(
            render_fragment(&frag, &RenderConfig::HTML5),
            "lead <b>bold</b> &amp; more<br>"
        );
        assert_eq!(
            render_fragment(&frag, &RenderConfig::XHTML),
            "lead <b>bold</b> &amp; more<br />"
        );
    }

    #[test]
    fn test_script_text_is_raw() {
        let frag = Fragment::single(FragmentNode::new("script").text("if (a < b) {}"));
        assert_eq!(
            render_fragment(&frag, &RenderConfig::default()),
            "<script>if (a < b) {}</script>"
        );
    }

    #[test]
    fn test_attrs_in_order() {
        let frag = Fragment::single(FragmentNode::new("a").attr("href", "/x?a=1&b=2").attr("id", "l"));
        assert_eq!(
            render_fragment(&frag, &RenderConfig::default()),
            r#"<a href="/x?a=1&amp;b=2" id="l"></a>"#
        );
    }
}
