//! Render-target abstraction
//!
//! The update engine never talks to a document-tree library directly. It
//! drives a [`RenderTarget`], the capability set a binding implements:
//!
//! - node creation and release: `create`, `release`
//! - mutation: `set_attribute`, `set_text`, `set_tail`, `set_fragment`
//! - structure: `append_child`, `remove_child`, `reorder_children`
//! - introspection: `find`, `serialize`
//!
//! Every capability has a default that fails with
//! [`ViewError::NotImplemented`], so a binding states exactly what it
//! supports. [`verify`] is the conformance check new bindings run.

mod dom;
mod query;

pub use dom::{Dom, DomNode};
pub use query::{Navigate, Query};

use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{ViewError, ViewResult};
use crate::node::{Fragment, FragmentNode};

/// Capability interface of a document-tree binding.
pub trait RenderTarget {
    /// Handle to one node of the underlying tree.
    type Handle: Copy + Eq + Hash + Debug;

    /// Create a detached element.
    fn create(&mut self, tag: &str) -> ViewResult<Self::Handle> {
        let _ = tag;
        Err(ViewError::not_implemented("create"))
    }

    /// Set (`Some`) or remove (`None`) an attribute.
    fn set_attribute(&mut self, handle: Self::Handle, name: &str, value: Option<&str>) -> ViewResult<()> {
        let _ = (handle, name, value);
        Err(ViewError::not_implemented("set_attribute"))
    }

    /// Set the text before the element's first child.
    fn set_text(&mut self, handle: Self::Handle, text: Option<&str>) -> ViewResult<()> {
        let _ = (handle, text);
        Err(ViewError::not_implemented("set_text"))
    }

    /// Set the text following the element's closing tag.
    fn set_tail(&mut self, handle: Self::Handle, tail: Option<&str>) -> ViewResult<()> {
        let _ = (handle, tail);
        Err(ViewError::not_implemented("set_tail"))
    }

    /// Append `child` as the last child of `parent`.
    ///
    /// A child that already has a parent is moved.
    fn append_child(&mut self, parent: Self::Handle, child: Self::Handle) -> ViewResult<()> {
        let _ = (parent, child);
        Err(ViewError::not_implemented("append_child"))
    }

    /// Detach `child` from `parent`. The child stays alive until released.
    fn remove_child(&mut self, parent: Self::Handle, child: Self::Handle) -> ViewResult<()> {
        let _ = (parent, child);
        Err(ViewError::not_implemented("remove_child"))
    }

    /// Reorder the children of `parent` to exactly `order`.
    ///
    /// `order` must be a permutation of the current children.
    fn reorder_children(&mut self, parent: Self::Handle, order: &[Self::Handle]) -> ViewResult<()> {
        let _ = (parent, order);
        Err(ViewError::not_implemented("reorder_children"))
    }

    /// Structural query relative to `handle`.
    fn find(&self, handle: Self::Handle, query: &str) -> ViewResult<Vec<Self::Handle>> {
        let _ = (handle, query);
        Err(ViewError::not_implemented("find"))
    }

    /// Serialize the subtree rooted at `handle` (its tail excluded).
    fn serialize(&self, handle: Self::Handle) -> ViewResult<String> {
        let _ = handle;
        Err(ViewError::not_implemented("serialize"))
    }

    /// Replace text and children of `handle` with `fragment`, releasing
    /// the old children.
    fn set_fragment(&mut self, handle: Self::Handle, fragment: &Fragment) -> ViewResult<()> {
        let _ = (handle, fragment);
        Err(ViewError::not_implemented("set_fragment"))
    }

    /// Destroy `handle` and its whole subtree.
    fn release(&mut self, handle: Self::Handle) -> ViewResult<()> {
        let _ = handle;
        Err(ViewError::not_implemented("release"))
    }
}

/// Binding with no capabilities.
///
/// Every call fails with [`ViewError::NotImplemented`]; a view built on it
/// reports the missing integration on first use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Unbound;

impl RenderTarget for Unbound {
    type Handle = ();
}

// =============================================================================
// Conformance
// =============================================================================

fn check(cond: bool, what: &str) -> ViewResult<()> {
    if cond {
        Ok(())
    } else {
        Err(ViewError::Conformance(what.to_string()))
    }
}

/// Conformance check for a render-target binding.
///
/// Builds a small tree through the capability set and checks the observable
/// contract: attribute removal, tail placement, child moves, reordering,
/// fragment replacement and queries. Fails with
/// [`ViewError::Conformance`] on the first violation, or with the
/// binding's own error when a capability is missing.
pub fn verify<T: RenderTarget>(target: &mut T) -> ViewResult<()> {
    let root = target.create("div")?;
    let a = target.create("span")?;
    let b = target.create("p")?;

    target.set_attribute(a, "class", Some("x"))?;
    target.set_attribute(a, "hidden", Some("hidden"))?;
    target.set_attribute(a, "hidden", None)?;
    target.set_text(a, Some("one"))?;
    target.set_tail(a, Some(" tail"))?;
    target.append_child(root, a)?;
    target.append_child(root, b)?;

    let html = target.serialize(root)?;
    check(
        html == r#"<div><span class="x">one</span> tail<p></p></div>"#,
        &format!("unexpected serialization after build: {html}"),
    )?;

    target.reorder_children(root, &[b, a])?;
    let html = target.serialize(root)?;
    check(
        html == r#"<div><p></p><span class="x">one</span> tail</div>"#,
        &format!("unexpected serialization after reorder: {html}"),
    )?;

    // Appending an attached child moves it.
    target.append_child(root, b)?;
    check(
        target.find(root, "span")?.len() == 1 && target.find(root, "p")?.len() == 1,
        "append of an attached child duplicated it",
    )?;
    check(target.find(root, "//span[@class=\"x\"]")? == vec![a], "attribute query")?;

    target.remove_child(root, a)?;
    target.release(a)?;
    check(target.find(root, "span")?.is_empty(), "removed child still reachable")?;

    let fragment = Fragment::single(FragmentNode::new("h1").text("title"));
    target.set_fragment(root, &fragment)?;
    let html = target.serialize(root)?;
    check(
        html == "<div><h1>title</h1></div>",
        &format!("unexpected serialization after set_fragment: {html}"),
    )?;

    target.release(root)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbound_has_no_capabilities() {
        let mut target = Unbound;
        assert!(target.create("div").unwrap_err().is_not_implemented());
        assert!(target.find((), "//div").unwrap_err().is_not_implemented());
        assert!(target.serialize(()).unwrap_err().is_not_implemented());
        assert!(matches!(
            target.set_fragment((), &Fragment::empty()),
            Err(ViewError::NotImplemented { capability: "set_fragment" })
        ));
    }

    #[test]
    fn test_verify_fails_on_unbound() {
        let err = verify(&mut Unbound).unwrap_err();
        assert!(err.is_not_implemented());
    }

    #[test]
    fn test_verify_passes_on_dom() {
        let mut dom = Dom::new();
        verify(&mut dom).unwrap();
        assert!(dom.is_empty());
    }

    /// Binding that ignores reorders.
    #[derive(Default)]
    struct SilentReorder(Dom);

    impl RenderTarget for SilentReorder {
        type Handle = crate::id::DomId;

        fn create(&mut self, tag: &str) -> ViewResult<Self::Handle> {
            self.0.create(tag)
        }
        fn set_attribute(&mut self, h: Self::Handle, name: &str, value: Option<&str>) -> ViewResult<()> {
            self.0.set_attribute(h, name, value)
        }
        fn set_text(&mut self, h: Self::Handle, text: Option<&str>) -> ViewResult<()> {
            self.0.set_text(h, text)
        }
        fn set_tail(&mut self, h: Self::Handle, tail: Option<&str>) -> ViewResult<()> {
            self.0.set_tail(h, tail)
        }
        fn append_child(&mut self, parent: Self::Handle, child: Self::Handle) -> ViewResult<()> {
            self.0.append_child(parent, child)
        }
        fn reorder_children(&mut self, parent: Self::Handle, order: &[Self::Handle]) -> ViewResult<()> {
            // Drops the reorder silently.
            let _ = (parent, order);
            Ok(())
        }
        fn serialize(&self, h: Self::Handle) -> ViewResult<String> {
            self.0.serialize(h)
        }
    }

    #[test]
    fn test_verify_reports_violation() {
        let err = verify(&mut SilentReorder::default()).unwrap_err();
        assert!(matches!(err, ViewError::Conformance(msg) if msg.contains("reorder")));
    }
}
