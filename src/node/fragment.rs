//! Fragment - transformer output spliced under a content container

use crate::attr::{Attrs, AttrsExt};

/// A detached markup fragment.
///
/// `text` is the text before the first top-level node; every node carries
/// its own tail. This is the same text model render targets use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub text: Option<String>,
    pub nodes: Vec<FragmentNode>,
}

/// One element of a [`Fragment`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentNode {
    pub tag: String,
    pub attrs: Attrs,
    pub text: Option<String>,
    pub tail: Option<String>,
    pub children: Vec<FragmentNode>,
}

impl Fragment {
    /// Empty fragment: the container stays as the anchor.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Fragment holding a single node.
    pub fn single(node: FragmentNode) -> Self {
        Self {
            text: None,
            nodes: vec![node],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.text.as_deref().is_none_or(str::is_empty)
    }

    /// Append a top-level node
    pub fn push(&mut self, node: FragmentNode) {
        self.nodes.push(node);
    }

    /// Append top-level text: leading text before any node, otherwise the
    /// last node's tail.
    pub fn push_text(&mut self, text: &str) {
        match self.nodes.last_mut() {
            Some(last) => append(&mut last.tail, text),
            None => append(&mut self.text, text),
        }
    }

    /// Total number of elements, nested ones included.
    pub fn element_count(&self) -> usize {
        self.nodes.iter().map(FragmentNode::element_count).sum()
    }
}

impl FragmentNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.set_attr(name, value);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn tail(mut self, tail: impl Into<String>) -> Self {
        self.tail = Some(tail.into());
        self
    }

    pub fn child(mut self, child: FragmentNode) -> Self {
        self.children.push(child);
        self
    }

    /// Append text inside this node: leading text before any child,
    /// otherwise the last child's tail.
    pub fn push_text(&mut self, text: &str) {
        match self.children.last_mut() {
            Some(last) => append(&mut last.tail, text),
            None => append(&mut self.text, text),
        }
    }

    fn element_count(&self) -> usize {
        1 + self.children.iter().map(Self::element_count).sum::<usize>()
    }
}

fn append(slot: &mut Option<String>, text: &str) {
    if text.is_empty() {
        return;
    }
    match slot {
        Some(existing) => existing.push_str(text),
        None => *slot = Some(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_text_goes_to_text_then_tail() {
        let mut frag = Fragment::empty();
        assert!(frag.is_empty());
        frag.push_text("lead ");
        frag.push(FragmentNode::new("p").text("body"));
        frag.push_text("after");
        frag.push_text("!");

        assert_eq!(frag.text.as_deref(), Some("lead "));
        assert_eq!(frag.nodes[0].tail.as_deref(), Some("after!"));
        assert!(!frag.is_empty());
    }

    #[test]
    fn test_element_count() {
        let frag = Fragment::single(
            FragmentNode::new("ul")
                .child(FragmentNode::new("li"))
                .child(FragmentNode::new("li").child(FragmentNode::new("b"))),
        );
        assert_eq!(frag.element_count(), 4);
    }
}
