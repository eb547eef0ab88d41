//! Content node - foreign-format source rendered by a transformer
//!
//! The node mounts as a container element (`<div>` unless changed). The
//! container's render-target children are owned by the transformer output
//! and replaced wholesale whenever the source or configuration changes.

use compact_str::CompactString;

use crate::attr::Value;
use crate::transform::{Raw, Transformer};

use super::Element;

/// Content transformer node.
#[derive(Debug)]
pub struct Content {
    /// Container element; its children are never rendered
    pub container: Element,
    /// Source text handed to the transformer
    pub source: String,
    pub transformer: Box<dyn Transformer>,
    /// Options applied to the transformer when mounted
    pub options: Vec<(CompactString, Value)>,
}

impl Content {
    /// Content node for a plug-in transformer.
    pub fn custom(transformer: impl Transformer + 'static, source: impl Into<String>) -> Self {
        Self {
            container: Element::new("div"),
            source: source.into(),
            transformer: Box::new(transformer),
            options: Vec::new(),
        }
    }

    /// Raw markup, parsed once per source change.
    pub fn raw(source: impl Into<String>) -> Self {
        Self::custom(Raw, source)
    }

    /// Markdown converted to HTML.
    #[cfg(feature = "markdown")]
    pub fn markdown(source: impl Into<String>) -> Self {
        Self::custom(crate::transform::Markdown::default(), source)
    }

    /// Syntax-highlighted code block.
    #[cfg(feature = "highlight")]
    pub fn code(source: impl Into<String>) -> Self {
        Self::custom(crate::transform::Code::default(), source)
    }

    /// Notebook document.
    #[cfg(feature = "notebook")]
    pub fn notebook(source: impl Into<String>) -> Self {
        Self::custom(crate::transform::Notebook::default(), source)
    }

    /// Set a transformer option (or a container attribute when the
    /// transformer does not know the key).
    pub fn option(mut self, key: impl Into<CompactString>, value: impl Into<Value>) -> Self {
        self.options.push((key.into(), value.into()));
        self
    }

    /// Change the container tag
    pub fn tag(mut self, tag: impl Into<CompactString>) -> Self {
        self.container.tag = tag.into();
        self
    }

    /// Set a typed attribute on the container
    pub fn attr(mut self, name: impl Into<CompactString>, value: impl Into<Value>) -> Self {
        self.container = self.container.attr(name, value);
        self
    }

    /// Set an escape-hatch attribute on the container
    pub fn extra(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.container = self.container.extra(name, value);
        self
    }

    pub fn tail(mut self, tail: impl Into<CompactString>) -> Self {
        self.container = self.container.tail(tail);
        self
    }

    pub fn named(mut self, name: impl Into<CompactString>) -> Self {
        self.container = self.container.named(name);
        self
    }

    /// Make `source`, an option key or a container attribute follow a
    /// view variable
    pub fn bind(mut self, attr: impl Into<CompactString>, var: impl Into<CompactString>) -> Self {
        self.container = self.container.bind(attr, var);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_content_defaults() {
        let content = Content::raw("<p>hi</p>").attr("id", "body").option("x", 1);
        assert_eq!(content.container.tag, "div");
        assert_eq!(content.transformer.name(), "raw");
        assert_eq!(content.source, "<p>hi</p>");
        assert_eq!(content.options.len(), 1);
        assert_eq!(content.container.get("id"), Some(&Value::from("body")));
    }

    #[test]
    fn test_container_tag() {
        let content = Content::raw("").tag("section").tail("after");
        assert_eq!(content.container.tag, "section");
        assert_eq!(content.container.tail.as_deref(), Some("after"));
    }
}
