//! Element type - one markup tag as declared by the declarative layer
//!
//! The core building block of a view tree. An `Element` is a declaration:
//! mounting it into a [`View`](crate::view::View) gives it a node id and a
//! render target.

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::attr::{Attr, Attrs, AttrsExt, Value};
use crate::codec::AttrKind;

use super::{Children, Node};

/// Subscription of an attribute to a view variable (`attr << var`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Attribute (or reserved name such as `text`) that follows the variable
    pub attr: CompactString,
    /// View variable name
    pub var: CompactString,
}

// =============================================================================
// Element
// =============================================================================

/// Markup element with typed attributes, text, tail and children
#[derive(Debug, Default)]
pub struct Element {
    /// Tag name, fixed once mounted
    pub tag: CompactString,
    /// Typed attributes in declaration order
    pub attrs: SmallVec<[Attr; 4]>,
    /// Escape hatch for attributes the typed model cannot name
    /// (`data-*`, hyphenated or host-specific attributes)
    pub extra: Attrs,
    /// Text before the first child
    pub text: Option<CompactString>,
    /// Text emitted right after the closing tag
    pub tail: Option<CompactString>,
    /// Child nodes in document order
    pub children: Children,
    /// Lookup name (see [`View::lookup`](crate::view::View::lookup))
    pub name: Option<CompactString>,
    /// Variable subscriptions
    pub bindings: SmallVec<[Binding; 2]>,
}

impl Element {
    /// Create an element with no attributes or children
    pub fn new(tag: impl Into<CompactString>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder
    // ─────────────────────────────────────────────────────────────────────────

    /// Set a typed attribute, kind taken from the lookup table
    pub fn attr(mut self, name: impl Into<CompactString>, value: impl Into<Value>) -> Self {
        self.set(Attr::new(name, value));
        self
    }

    /// Set a typed attribute with an explicit kind
    pub fn attr_with(
        mut self,
        name: impl Into<CompactString>,
        kind: AttrKind,
        value: impl Into<Value>,
    ) -> Self {
        self.set(Attr::with_kind(name, kind, value));
        self
    }

    /// Set one escape-hatch attribute, name used literally
    pub fn extra(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.set_attr(name, value);
        self
    }

    /// Replace the whole escape-hatch mapping
    pub fn attrs<K, V>(mut self, entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.extra = entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    /// Set leading text
    pub fn text(mut self, text: impl Into<CompactString>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set tail text
    pub fn tail(mut self, tail: impl Into<CompactString>) -> Self {
        self.tail = Some(tail.into());
        self
    }

    /// Append a child node
    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Append several child nodes
    pub fn children<N: Into<Node>>(mut self, children: impl IntoIterator<Item = N>) -> Self {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// Give the element a lookup name
    pub fn named(mut self, name: impl Into<CompactString>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Subscribe `attr` to view variable `var`
    pub fn bind(mut self, attr: impl Into<CompactString>, var: impl Into<CompactString>) -> Self {
        self.bindings.push(Binding {
            attr: attr.into(),
            var: var.into(),
        });
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Attribute access
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert or replace a typed attribute, keeping its position
    pub fn set(&mut self, attr: Attr) {
        if let Some(slot) = self.attrs.iter_mut().find(|a| a.name == attr.name) {
            *slot = attr;
        } else {
            self.attrs.push(attr);
        }
    }

    /// Typed attribute value by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attrs.iter().find(|a| a.name == name).map(|a| &a.value)
    }

    /// Whether `attr` follows a view variable
    pub fn is_bound(&self, attr: &str) -> bool {
        self.bindings.iter().any(|b| b.attr == attr)
    }

    /// Number of direct children
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Iterate over child element references
    pub fn children_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| n.as_element())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_basics() {
        let elem = Element::new("div");
        assert_eq!(elem.tag, "div");
        assert_eq!(elem.child_count(), 0);
        assert!(elem.text.is_none());
    }

    #[test]
    fn test_element_builder() {
        let elem = Element::new("div")
            .attr("id", "main")
            .attr("class", ["btn", "btn-large"])
            .extra("data-tooltip", "Tooltip")
            .child(Element::new("span"))
            .text("Hello")
            .tail("after");

        assert_eq!(elem.get("id"), Some(&Value::from("main")));
        assert_eq!(elem.attrs[1].kind, AttrKind::List);
        assert_eq!(elem.extra.get_attr("data-tooltip"), Some("Tooltip"));
        assert_eq!(elem.child_count(), 1);
        assert_eq!(elem.text.as_deref(), Some("Hello"));
        assert_eq!(elem.tail.as_deref(), Some("after"));
    }

    #[test]
    fn test_set_keeps_position() {
        let elem = Element::new("a").attr("href", "#").attr("id", "x").attr("href", "/home/");
        assert_eq!(elem.attrs.len(), 2);
        assert_eq!(elem.attrs[0].name, "href");
        assert_eq!(elem.get("href"), Some(&Value::from("/home/")));
    }

    #[test]
    fn test_bindings() {
        let elem = Element::new("a").bind("href", "v");
        assert!(elem.is_bound("href"));
        assert!(!elem.is_bound("id"));
        assert_eq!(elem.bindings[0].var, "v");
    }

    #[test]
    fn test_attrs_replaces_extra() {
        let elem = Element::new("div").extra("a", "1").attrs([("data-x", "2")]);
        assert_eq!(elem.extra, vec![("data-x".to_string(), "2".to_string())]);
    }

    #[test]
    fn test_children_elements() {
        let elem = Element::new("ul").children([Element::new("li"), Element::new("li")]);
        assert_eq!(elem.children_elements().count(), 2);
    }
}
