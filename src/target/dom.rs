//! Dom - the bundled arena-backed render target
//!
//! Nodes live in a generational arena, so a released handle can never
//! alias a newer node. An element's `text`
//! precedes its first child and each element's `tail` follows its closing
//! tag inside the parent.

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::arena::Arena;
use crate::attr::{Attrs, AttrsExt};
use crate::error::{ViewError, ViewResult};
use crate::id::DomId;
use crate::node::{Fragment, FragmentNode};
use crate::render::{self, RenderConfig};

use super::query::{Navigate, Query};
use super::RenderTarget;

/// One element of a [`Dom`].
#[derive(Debug, Clone, Default)]
pub struct DomNode {
    pub tag: CompactString,
    pub attrs: Attrs,
    pub text: Option<String>,
    pub tail: Option<String>,
    parent: Option<DomId>,
    children: SmallVec<[DomId; 8]>,
}

impl DomNode {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn parent(&self) -> Option<DomId> {
        self.parent
    }

    pub fn children(&self) -> &[DomId] {
        &self.children
    }
}

/// Arena-backed document tree.
#[derive(Debug, Default)]
pub struct Dom {
    nodes: Arena<DomNode>,
    config: RenderConfig,
}

impl Dom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dom serializing with `config`.
    pub fn with_config(config: RenderConfig) -> Self {
        Self {
            nodes: Arena::new(),
            config,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: RenderConfig) {
        self.config = config;
    }

    /// Live node count.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: DomId) -> bool {
        self.nodes.contains(id.0)
    }

    /// Node by handle, or a stale-handle error.
    pub fn node(&self, id: DomId) -> ViewResult<&DomNode> {
        self.nodes.get(id.0).ok_or_else(|| stale(id))
    }

    fn node_mut(&mut self, id: DomId) -> ViewResult<&mut DomNode> {
        self.nodes.get_mut(id.0).ok_or_else(|| stale(id))
    }

    /// Attribute value of a live node.
    pub fn attr(&self, id: DomId, name: &str) -> Option<&str> {
        self.nodes.get(id.0).and_then(|n| n.attrs.get_attr(name))
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    fn is_ancestor(&self, ancestor: DomId, id: DomId) -> bool {
        let mut current = Some(id);
        while let Some(cur) = current {
            if cur == ancestor {
                return true;
            }
            current = self.nodes.get(cur.0).and_then(|n| n.parent);
        }
        false
    }

    fn detach(&mut self, child: DomId) -> ViewResult<()> {
        if let Some(parent) = self.node_mut(child)?.parent.take() {
            self.node_mut(parent)?.children.retain(|c| *c != child);
        }
        Ok(())
    }

    fn build_fragment_node(&mut self, parent: DomId, node: &FragmentNode) -> ViewResult<()> {
        let id = self.create(&node.tag)?;
        {
            let dom_node = self.node_mut(id)?;
            dom_node.attrs = node.attrs.clone();
            dom_node.text = node.text.clone();
            dom_node.tail = node.tail.clone();
        }
        self.append_child(parent, id)?;
        for child in &node.children {
            self.build_fragment_node(id, child)?;
        }
        Ok(())
    }

    fn write_node(&self, id: DomId, output: &mut String) -> ViewResult<()> {
        let node = self.node(id)?;
        if render::open_tag(&node.tag, &node.attrs, &self.config, output) {
            if let Some(text) = &node.text {
                render::write_text(&node.tag, text, output);
            }
            for &child in &node.children {
                self.write_node(child, output)?;
                if let Some(tail) = &self.node(child)?.tail {
                    render::write_text(&node.tag, tail, output);
                }
            }
            render::close_tag(&node.tag, output);
        }
        Ok(())
    }
}

fn stale(id: DomId) -> ViewError {
    ViewError::StaleHandle(id.to_string())
}

impl RenderTarget for Dom {
    type Handle = DomId;

    fn create(&mut self, tag: &str) -> ViewResult<DomId> {
        Ok(DomId(self.nodes.insert(DomNode::new(tag))))
    }

    fn set_attribute(&mut self, handle: DomId, name: &str, value: Option<&str>) -> ViewResult<()> {
        let node = self.node_mut(handle)?;
        match value {
            Some(value) => node.attrs.set_attr(name, value),
            None => {
                node.attrs.remove_attr(name);
            }
        }
        Ok(())
    }

    fn set_text(&mut self, handle: DomId, text: Option<&str>) -> ViewResult<()> {
        self.node_mut(handle)?.text = text.map(str::to_string);
        Ok(())
    }

    fn set_tail(&mut self, handle: DomId, tail: Option<&str>) -> ViewResult<()> {
        self.node_mut(handle)?.tail = tail.map(str::to_string);
        Ok(())
    }

    fn append_child(&mut self, parent: DomId, child: DomId) -> ViewResult<()> {
        self.node(parent)?;
        if self.is_ancestor(child, parent) {
            return Err(ViewError::Structure(format!(
                "cannot append {child} under its own descendant {parent}"
            )));
        }
        self.detach(child)?;
        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.children.push(child);
        Ok(())
    }

    fn remove_child(&mut self, parent: DomId, child: DomId) -> ViewResult<()> {
        if self.node(child)?.parent != Some(parent) {
            return Err(ViewError::Structure(format!("{child} is not a child of {parent}")));
        }
        self.detach(child)
    }

    fn reorder_children(&mut self, parent: DomId, order: &[DomId]) -> ViewResult<()> {
        let node = self.node_mut(parent)?;
        let mut current: SmallVec<[DomId; 8]> = node.children.clone();
        let mut wanted: SmallVec<[DomId; 8]> = order.iter().copied().collect();
        current.sort_unstable_by_key(|id| (id.0.index(), id.0.generation()));
        wanted.sort_unstable_by_key(|id| (id.0.index(), id.0.generation()));
        if current != wanted {
            return Err(ViewError::Structure(format!(
                "reorder of {parent} is not a permutation of its children"
            )));
        }
        node.children = order.iter().copied().collect();
        Ok(())
    }

    fn find(&self, handle: DomId, query: &str) -> ViewResult<Vec<DomId>> {
        self.node(handle)?;
        Ok(Query::parse(query)?.select(self, handle))
    }

    fn serialize(&self, handle: DomId) -> ViewResult<String> {
        let mut output = String::new();
        if self.config.doctype && self.node(handle)?.parent.is_none() {
            output.push_str("<!DOCTYPE html>");
        }
        self.write_node(handle, &mut output)?;
        Ok(output)
    }

    fn set_fragment(&mut self, handle: DomId, fragment: &Fragment) -> ViewResult<()> {
        let old: SmallVec<[DomId; 8]> = self.node(handle)?.children.clone();
        for child in old {
            self.release(child)?;
        }
        self.node_mut(handle)?.text = fragment.text.clone();
        for node in &fragment.nodes {
            self.build_fragment_node(handle, node)?;
        }
        Ok(())
    }

    fn release(&mut self, handle: DomId) -> ViewResult<()> {
        self.detach(handle)?;
        let mut stack = vec![handle];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.remove(id.0) {
                stack.extend(node.children);
            }
        }
        Ok(())
    }
}

impl Navigate for Dom {
    type Id = DomId;

    fn tag(&self, id: DomId) -> Option<&str> {
        self.nodes.get(id.0).map(|n| n.tag.as_str())
    }

    fn attr(&self, id: DomId, name: &str) -> Option<&str> {
        Dom::attr(self, id, name)
    }

    fn text(&self, id: DomId) -> Option<&str> {
        self.nodes.get(id.0).and_then(|n| n.text.as_deref())
    }

    fn tail(&self, id: DomId) -> Option<&str> {
        self.nodes.get(id.0).and_then(|n| n.tail.as_deref())
    }

    fn children(&self, id: DomId) -> &[DomId] {
        self.nodes.get(id.0).map_or(&[], |n| n.children.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn page(dom: &mut Dom) -> (DomId, DomId, DomId) {
        let html = dom.create("html").unwrap();
        let body = dom.create("body").unwrap();
        let a = dom.create("a").unwrap();
        dom.append_child(html, body).unwrap();
        dom.append_child(body, a).unwrap();
        dom.set_attribute(a, "href", Some("/home/")).unwrap();
        dom.set_text(a, Some("Home")).unwrap();
        dom.set_tail(a, Some("for more info")).unwrap();
        (html, body, a)
    }

    #[test]
    fn test_serialize_with_tail() {
        let mut dom = Dom::new();
        let (html, _, _) = page(&mut dom);
        assert_eq!(
            dom.serialize(html).unwrap(),
            r#"<html><body><a href="/home/">Home</a>for more info</body></html>"#
        );
    }

    #[test]
    fn test_doctype_and_void_elements() {
        let mut dom = Dom::with_config(RenderConfig::XHTML.with_doctype());
        let html = dom.create("html").unwrap();
        let br = dom.create("br").unwrap();
        dom.append_child(html, br).unwrap();
        assert_eq!(dom.serialize(html).unwrap(), "<!DOCTYPE html><html><br /></html>");
        // No doctype for an inner subtree.
        assert_eq!(dom.serialize(br).unwrap(), "<br />");
    }

    #[test]
    fn test_find_queries() {
        let mut dom = Dom::new();
        let (html, body, a) = page(&mut dom);
        assert_eq!(dom.find(html, "/html/body").unwrap(), vec![body]);
        assert_eq!(dom.find(html, "//a[@href=\"/home/\"]").unwrap(), vec![a]);
        assert_eq!(dom.find(html, "//body[text()=\"for more info\"]").unwrap(), vec![body]);
        assert_eq!(dom.find(html, "//a[text()='Home']").unwrap(), vec![a]);
        assert!(dom.find(html, "/body").unwrap().is_empty());
        assert!(dom.find(html, "//a[@id]").unwrap().is_empty());
    }

    #[test]
    fn test_positional_and_document_order() {
        let mut dom = Dom::new();
        let ul = dom.create("ul").unwrap();
        let mut items = Vec::new();
        for _ in 0..3 {
            let li = dom.create("li").unwrap();
            dom.append_child(ul, li).unwrap();
            items.push(li);
        }
        let nested = dom.create("li").unwrap();
        dom.append_child(items[0], nested).unwrap();

        assert_eq!(dom.find(ul, "li[2]").unwrap(), vec![items[1]]);
        assert_eq!(
            dom.find(ul, "//li").unwrap(),
            vec![items[0], nested, items[1], items[2]]
        );
        assert_eq!(dom.find(ul, "//li[1]").unwrap(), vec![items[0], nested]);
    }

    #[test]
    fn test_append_moves_and_rejects_cycles() {
        let mut dom = Dom::new();
        let (html, body, a) = page(&mut dom);
        dom.append_child(html, a).unwrap();
        assert!(dom.node(body).unwrap().children().is_empty());
        assert_eq!(dom.node(a).unwrap().parent(), Some(html));

        let err = dom.append_child(body, html).unwrap_err();
        assert!(matches!(err, ViewError::Structure(_)));
    }

    #[test]
    fn test_reorder_requires_permutation() {
        let mut dom = Dom::new();
        let (html, body, a) = page(&mut dom);
        let err = dom.reorder_children(html, &[body, a]).unwrap_err();
        assert!(matches!(err, ViewError::Structure(_)));
    }

    #[test]
    fn test_release_frees_subtree() {
        let mut dom = Dom::new();
        let (html, body, a) = page(&mut dom);
        dom.release(body).unwrap();
        assert_eq!(dom.len(), 1);
        assert!(!dom.contains(a));
        assert!(matches!(dom.set_text(a, None), Err(ViewError::StaleHandle(_))));
        assert_eq!(dom.serialize(html).unwrap(), "<html></html>");
    }

    #[test]
    fn test_set_fragment_replaces_children() {
        let mut dom = Dom::new();
        let (html, body, _) = page(&mut dom);
        let mut frag = Fragment::empty();
        frag.push_text("intro ");
        frag.push(FragmentNode::new("p").text("x").tail(" end"));
        dom.set_fragment(body, &frag).unwrap();

        assert_eq!(
            dom.serialize(html).unwrap(),
            "<html><body>intro <p>x</p> end</body></html>"
        );
        assert_eq!(dom.len(), 3);
    }

    #[test]
    fn test_remove_child_checks_parent() {
        let mut dom = Dom::new();
        let (html, body, a) = page(&mut dom);
        assert!(dom.remove_child(html, a).is_err());
        dom.remove_child(body, a).unwrap();
        assert!(dom.contains(a));
        assert!(dom.node(a).unwrap().parent().is_none());
    }
}
