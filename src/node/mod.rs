//! Declarative node model
//!
//! The declarative layer describes a page as a tree of [`Node`]s:
//!
//! - [`Element`]: one markup tag with typed attributes, text, tail and children
//! - [`Looper`]: dynamic children generated from an iterable and a template
//! - [`Content`]: foreign-format source converted by a [`Transformer`]
//!
//! A declaration tree is inert. Mounting it into a
//! [`View`](crate::view::View) builds the render targets.
//!
//! [`Transformer`]: crate::transform::Transformer

mod content;
mod element;
mod fragment;
mod looper;

pub use content::Content;
pub use element::{Binding, Element};
pub use fragment::{Fragment, FragmentNode};
pub use looper::{LoopItem, LoopKey, Looper, Template};

/// Node in a declaration tree.
#[derive(Debug)]
pub enum Node {
    Element(Box<Element>),
    Looper(Looper),
    Content(Content),
}

impl Node {
    impl_enum_accessors!(element, looper, content);

    /// Short kind name, for logs and structural comparisons.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Element(_) => "element",
            Self::Looper(_) => "looper",
            Self::Content(_) => "content",
        }
    }

    /// Lookup name, whatever the node kind.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Element(e) => e.name.as_deref(),
            Self::Looper(l) => l.name.as_deref(),
            Self::Content(c) => c.container.name.as_deref(),
        }
    }
}

impl From<Element> for Node {
    #[inline]
    fn from(elem: Element) -> Self {
        Self::Element(Box::new(elem))
    }
}

impl From<Looper> for Node {
    #[inline]
    fn from(looper: Looper) -> Self {
        Self::Looper(looper)
    }
}

impl From<Content> for Node {
    #[inline]
    fn from(content: Content) -> Self {
        Self::Content(content)
    }
}

/// Children collection.
///
/// Heap-allocated: `Node` reaches `Element` through `Content`'s container,
/// so an inline buffer of `Node`s would make the type recursive.
pub type Children = Vec<Node>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_kind_and_name() {
        let node: Node = Element::new("div").named("main").into();
        assert_eq!(node.kind(), "element");
        assert_eq!(node.name(), Some("main"));

        let node: Node = Looper::each(0..3i64, |_| Element::new("li")).named("items").into();
        assert_eq!(node.kind(), "looper");
        assert_eq!(node.name(), Some("items"));

        let node: Node = Content::raw("<p/>").named("body").into();
        assert_eq!(node.kind(), "content");
        assert_eq!(node.name(), Some("body"));
    }

    #[test]
    fn test_content_nested_in_element() {
        let node: Node = Element::new("article")
            .child(Content::raw("<p>intro</p>").named("intro"))
            .child(Element::new("section").child(Content::raw("").named("body")))
            .into();
        let article = node.as_element().unwrap();
        assert_eq!(article.children.len(), 2);
        assert_eq!(article.children[0].kind(), "content");
        let section = article.children[1].as_element().unwrap();
        assert_eq!(section.children[0].name(), Some("body"));
    }
}
