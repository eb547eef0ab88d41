//! Mounted tree: build phase
//!
//! Mounting turns a declaration into arena records that own render-target
//! handles. A record is attached to its parent's handle only once its own
//! subtree built successfully; on failure everything created so far is
//! released, so no orphaned handle survives a failed build.

use std::mem;

use smallvec::SmallVec;
use tracing::{debug, instrument, trace, warn};

use compact_str::CompactString;

use crate::algo;
use crate::arena::Arena;
use crate::attr::Value;
use crate::codec;
use crate::error::{ViewError, ViewResult};
use crate::hash::StableHasher;
use crate::id::NodeId;
use crate::node::{Binding, Content, Element, LoopKey, Looper, Node};
use crate::target::RenderTarget;
use crate::transform::Transformer;

use super::View;

/// Arena record of a mounted node.
#[derive(Debug)]
pub(super) struct Mounted<H> {
    pub(super) parent: Option<NodeId>,
    pub(super) kind: MountedKind<H>,
}

#[derive(Debug)]
pub(super) enum MountedKind<H> {
    Element(MountedElement<H>),
    Looper(MountedLooper),
    Content(MountedContent<H>),
}

/// Element with its current attribute state. `decl.children` is always
/// empty; the mounted children are `children`.
#[derive(Debug)]
pub(super) struct MountedElement<H> {
    pub(super) decl: Element,
    pub(super) handle: H,
    pub(super) children: SmallVec<[NodeId; 8]>,
}

#[derive(Debug)]
pub(super) struct MountedLooper {
    pub(super) looper: Looper,
    pub(super) entries: Vec<LoopEntry>,
}

/// One rendered looper item.
#[derive(Debug)]
pub(super) struct LoopEntry {
    pub(super) key: LoopKey,
    pub(super) value: Value,
    /// Position the roots were instantiated for.
    pub(super) index: usize,
    pub(super) roots: SmallVec<[NodeId; 2]>,
}

#[derive(Debug)]
pub(super) struct MountedContent<H> {
    pub(super) container: MountedElement<H>,
    pub(super) source: String,
    pub(super) transformer: Box<dyn Transformer>,
    /// Fingerprint of the fragment currently spliced in
    pub(super) fingerprint: Option<u64>,
}

pub(super) fn element_mut<H>(nodes: &mut Arena<Mounted<H>>, id: NodeId) -> ViewResult<&mut MountedElement<H>> {
    match nodes.get_mut(id.0) {
        Some(Mounted {
            kind: MountedKind::Element(el),
            ..
        }) => Ok(el),
        _ => Err(ViewError::StaleNode(id)),
    }
}

pub(super) fn looper_mut<H>(nodes: &mut Arena<Mounted<H>>, id: NodeId) -> ViewResult<&mut MountedLooper> {
    match nodes.get_mut(id.0) {
        Some(Mounted {
            kind: MountedKind::Looper(l),
            ..
        }) => Ok(l),
        _ => Err(ViewError::StaleNode(id)),
    }
}

pub(super) fn content_mut<H>(nodes: &mut Arena<Mounted<H>>, id: NodeId) -> ViewResult<&mut MountedContent<H>> {
    match nodes.get_mut(id.0) {
        Some(Mounted {
            kind: MountedKind::Content(c),
            ..
        }) => Ok(c),
        _ => Err(ViewError::StaleNode(id)),
    }
}

/// Text-like value of a reserved name (`text`, `tail`, `source`).
pub(super) fn text_value(name: &str, value: &Value) -> ViewResult<Option<CompactString>> {
    match value {
        Value::Unset => Ok(None),
        Value::Text(_) | Value::Int(_) => Ok(value.to_text()),
        other => Err(ViewError::unsupported(name, "text", other.shape())),
    }
}

/// Assign a value to an unmounted element declaration.
pub(super) fn assign(elem: &mut Element, name: &str, value: Value) -> ViewResult<()> {
    match name {
        "text" => elem.text = text_value(name, &value)?,
        "tail" => elem.tail = text_value(name, &value)?,
        "attrs" => elem.extra = extra_value(&value)?,
        _ => {
            let kind = elem
                .attrs
                .iter()
                .find(|a| a.name == name)
                .map_or_else(|| codec::AttrKind::of(name), |a| a.kind);
            codec::encode(name, kind, &value)?;
            elem.set(crate::attr::Attr::with_kind(name, kind, value));
        }
    }
    Ok(())
}

/// Escape-hatch mapping from a `Map` value.
pub(super) fn extra_value(value: &Value) -> ViewResult<crate::attr::Attrs> {
    match value {
        Value::Unset => Ok(Vec::new()),
        Value::Map(entries) => Ok(entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()),
        other => Err(ViewError::unsupported("attrs", "string-mapping", other.shape())),
    }
}

impl<T: RenderTarget> View<T> {
    // ─────────────────────────────────────────────────────────────────────────
    // Mount
    // ─────────────────────────────────────────────────────────────────────────

    /// Mount a declaration under `parent`, appending its handles to
    /// `attach` when given.
    pub(super) fn mount(&mut self, node: Node, parent: Option<NodeId>, attach: Option<T::Handle>) -> ViewResult<NodeId> {
        match node {
            Node::Element(elem) => self.mount_element(*elem, parent, attach),
            Node::Looper(looper) => self.mount_looper(looper, parent, attach),
            Node::Content(content) => self.mount_content(content, parent, attach),
        }
    }

    fn mount_element(&mut self, mut decl: Element, parent: Option<NodeId>, attach: Option<T::Handle>) -> ViewResult<NodeId> {
        for (attr, value) in self.resolve(&decl.bindings)? {
            assign(&mut decl, &attr, value)?;
        }
        let children = mem::take(&mut decl.children);

        let handle = self.target.create(&decl.tag)?;
        if let Err(err) = self.encode(handle, &decl) {
            self.discard(handle);
            return Err(err);
        }

        let (name, bindings) = (decl.name.clone(), decl.bindings.clone());
        let id = NodeId(self.nodes.insert(Mounted {
            parent,
            kind: MountedKind::Element(MountedElement {
                decl,
                handle,
                children: SmallVec::new(),
            }),
        }));
        self.subscribe(id, &bindings);
        self.register(name, id);

        for child in children {
            let child_id = match self.mount(child, Some(id), Some(handle)) {
                Ok(child_id) => child_id,
                Err(err) => {
                    self.abandon(id);
                    return Err(err);
                }
            };
            if let Ok(el) = element_mut(&mut self.nodes, id) {
                el.children.push(child_id);
            }
        }

        if let Some(parent_handle) = attach {
            if let Err(err) = self.target.append_child(parent_handle, handle) {
                self.abandon(id);
                return Err(err);
            }
        }
        trace!(node = %id, ?handle, "mounted element");
        Ok(id)
    }

    fn mount_looper(&mut self, mut looper: Looper, parent: Option<NodeId>, attach: Option<T::Handle>) -> ViewResult<NodeId> {
        if let Some(var) = &looper.binding {
            looper.iterable = self.var_value(var)?.clone();
        }
        let items = Looper::items(&looper.iterable)?.to_vec();
        let keys = looper.keys(&items);
        let plan = algo::plan::<LoopKey>(&[], &keys);

        let (name, binding) = (looper.name.clone(), looper.binding.clone());
        let id = NodeId(self.nodes.insert(Mounted {
            parent,
            kind: MountedKind::Looper(MountedLooper {
                looper,
                entries: Vec::with_capacity(plan.items.len()),
            }),
        }));
        if let Some(var) = binding {
            self.subscribe(id, &[Binding {
                attr: "iterable".into(),
                var,
            }]);
        }
        self.register(name, id);

        for planned in &plan.items {
            let value = items[planned.item].clone();
            let roots = match self.mount_item(id, planned.item, &value, attach) {
                Ok(roots) => roots,
                Err(err) => {
                    self.abandon(id);
                    return Err(err);
                }
            };
            if let Ok(l) = looper_mut(&mut self.nodes, id) {
                l.entries.push(LoopEntry {
                    key: keys[planned.item].clone(),
                    value,
                    index: planned.item,
                    roots,
                });
            }
        }

        debug!(node = %id, items = plan.items.len(), "mounted looper");
        Ok(id)
    }

    fn mount_content(&mut self, content: Content, parent: Option<NodeId>, attach: Option<T::Handle>) -> ViewResult<NodeId> {
        let Content {
            mut container,
            mut source,
            mut transformer,
            mut options,
        } = content;
        container.children.clear();

        for (attr, value) in self.resolve(&container.bindings)? {
            if attr == "source" {
                source = text_value("source", &value)?.map(String::from).unwrap_or_default();
            } else {
                options.push((attr, value));
            }
        }
        for (key, value) in options {
            if !transformer.set_option(&key, &value)? {
                assign(&mut container, &key, value)?;
            }
        }

        let handle = self.target.create(&container.tag)?;
        if let Err(err) = self.encode(handle, &container) {
            self.discard(handle);
            return Err(err);
        }

        let (name, bindings) = (container.name.clone(), container.bindings.clone());
        let id = NodeId(self.nodes.insert(Mounted {
            parent,
            kind: MountedKind::Content(MountedContent {
                container: MountedElement {
                    decl: container,
                    handle,
                    children: SmallVec::new(),
                },
                source,
                transformer,
                fingerprint: None,
            }),
        }));
        self.subscribe(id, &bindings);
        self.register(name, id);

        let attached = self.refresh_content(id).and_then(|_| match attach {
            Some(parent_handle) => self.target.append_child(parent_handle, handle),
            None => Ok(()),
        });
        if let Err(err) = attached {
            self.abandon(id);
            return Err(err);
        }
        Ok(id)
    }

    /// Instantiate the looper template for one item.
    pub(super) fn instantiate(&mut self, looper: NodeId, index: usize, value: &Value) -> ViewResult<Vec<Node>> {
        Ok(looper_mut(&mut self.nodes, looper)?.looper.instantiate(index, value))
    }

    pub(super) fn mount_item(
        &mut self,
        looper: NodeId,
        index: usize,
        value: &Value,
        attach: Option<T::Handle>,
    ) -> ViewResult<SmallVec<[NodeId; 2]>> {
        let decls = self.instantiate(looper, index, value)?;
        self.mount_decls(looper, decls, attach)
    }

    /// Mount item roots; on failure the roots mounted so far are released.
    pub(super) fn mount_decls(
        &mut self,
        looper: NodeId,
        decls: Vec<Node>,
        attach: Option<T::Handle>,
    ) -> ViewResult<SmallVec<[NodeId; 2]>> {
        let mut roots = SmallVec::new();
        for decl in decls {
            match self.mount(decl, Some(looper), attach) {
                Ok(root) => roots.push(root),
                Err(err) => {
                    for root in roots {
                        self.abandon(root);
                    }
                    return Err(err);
                }
            }
        }
        Ok(roots)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Render-target helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Set every attribute, the text and the tail of a fresh handle.
    pub(super) fn encode(&mut self, handle: T::Handle, decl: &Element) -> ViewResult<()> {
        for attr in &decl.attrs {
            if let Some(encoded) = codec::encode(&attr.name, attr.kind, &attr.value)? {
                self.target.set_attribute(handle, &attr.name, Some(&encoded))?;
            }
        }
        for (name, value) in &decl.extra {
            self.target.set_attribute(handle, name, Some(value))?;
        }
        if let Some(text) = &decl.text {
            self.target.set_text(handle, Some(text))?;
        }
        if let Some(tail) = &decl.tail {
            self.target.set_tail(handle, Some(tail))?;
        }
        Ok(())
    }

    /// Regenerate a content node's fragment if source or configuration
    /// changed since the last run. Returns whether it regenerated.
    #[instrument(level = "trace", skip(self), fields(node = %id))]
    pub(super) fn refresh_content(&mut self, id: NodeId) -> ViewResult<bool> {
        let Self { nodes, target, .. } = self;
        let content = content_mut(nodes, id)?;

        let hasher = StableHasher::new()
            .update_str(content.transformer.name())
            .update_str(&content.source);
        let fingerprint = content.transformer.fingerprint(hasher).finish();
        if content.fingerprint == Some(fingerprint) {
            return Ok(false);
        }

        let fragment = content.transformer.transform(&content.source)?;
        target.set_fragment(content.container.handle, &fragment)?;
        content.fingerprint = Some(fingerprint);

        debug!(
            node = %id,
            transformer = content.transformer.name(),
            elements = fragment.element_count(),
            "regenerated content"
        );
        Ok(true)
    }

    /// Top-level handles of a mounted node: its own handle, or for a looper
    /// the handles of every item root in order.
    pub(super) fn expand(&self, id: NodeId, out: &mut Vec<T::Handle>) {
        match self.nodes.get(id.0).map(|m| &m.kind) {
            Some(MountedKind::Element(el)) => out.push(el.handle),
            Some(MountedKind::Content(c)) => out.push(c.container.handle),
            Some(MountedKind::Looper(l)) => {
                for entry in &l.entries {
                    for root in &entry.roots {
                        self.expand(*root, out);
                    }
                }
            }
            None => {}
        }
    }

    /// Nearest element ancestor of `id`.
    pub(super) fn host(&self, id: NodeId) -> ViewResult<NodeId> {
        let mut current = self.nodes.get(id.0).ok_or(ViewError::StaleNode(id))?.parent;
        while let Some(cur) = current {
            let node = self.nodes.get(cur.0).ok_or(ViewError::StaleNode(cur))?;
            if matches!(node.kind, MountedKind::Element(_)) {
                return Ok(cur);
            }
            current = node.parent;
        }
        Err(ViewError::Reconciliation(format!("{id} has no element ancestor")))
    }

    /// Expanded child handles of an element, in document order.
    pub(super) fn child_handles(&self, element: NodeId) -> Vec<T::Handle> {
        let mut out = Vec::new();
        if let Some(MountedKind::Element(el)) = self.nodes.get(element.0).map(|m| &m.kind) {
            for child in &el.children {
                self.expand(*child, &mut out);
            }
        }
        out
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Unmount
    // ─────────────────────────────────────────────────────────────────────────

    /// Remove a mounted subtree and release its render-target handles.
    pub(super) fn unmount(&mut self, id: NodeId) -> ViewResult<()> {
        let mut tops = Vec::new();
        self.expand(id, &mut tops);
        self.forget(id);
        for handle in tops {
            self.target.release(handle)?;
        }
        Ok(())
    }

    /// Unmount on an error path, where a second failure must not mask the first.
    fn abandon(&mut self, id: NodeId) {
        if let Err(err) = self.unmount(id) {
            warn!(node = %id, %err, "failed to release handles after a failed build");
        }
    }

    fn discard(&mut self, handle: T::Handle) {
        if let Err(err) = self.target.release(handle) {
            warn!(?handle, %err, "failed to release handle after a failed build");
        }
    }

    /// Drop arena records, subscriptions and names of a subtree.
    fn forget(&mut self, id: NodeId) {
        let Some(mounted) = self.nodes.remove(id.0) else {
            return;
        };
        let (name, bound, children): (Option<&CompactString>, bool, Vec<NodeId>) = match &mounted.kind {
            MountedKind::Element(el) => (el.decl.name.as_ref(), !el.decl.bindings.is_empty(), el.children.to_vec()),
            MountedKind::Content(c) => (
                c.container.decl.name.as_ref(),
                !c.container.decl.bindings.is_empty(),
                Vec::new(),
            ),
            MountedKind::Looper(l) => (
                l.looper.name.as_ref(),
                l.looper.binding.is_some(),
                l.entries.iter().flat_map(|e| e.roots.iter().copied()).collect(),
            ),
        };
        if bound {
            for var in self.vars.values_mut() {
                var.subscribers.retain(|(node, _)| *node != id);
            }
        }
        if let Some(name) = name {
            if self.names.get(name) == Some(&id) {
                self.names.remove(name);
            }
        }
        for child in children {
            self.forget(child);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rebuild
    // ─────────────────────────────────────────────────────────────────────────

    /// Recreate render-target handles for an already mounted subtree.
    pub(super) fn materialize(&mut self, id: NodeId, attach: Option<T::Handle>) -> ViewResult<()> {
        let (tag, children, is_content) = match self.nodes.get(id.0).map(|m| &m.kind) {
            Some(MountedKind::Element(el)) => (el.decl.tag.clone(), el.children.to_vec(), false),
            Some(MountedKind::Content(c)) => (c.container.decl.tag.clone(), Vec::new(), true),
            Some(MountedKind::Looper(l)) => {
                let roots: Vec<NodeId> = l.entries.iter().flat_map(|e| e.roots.iter().copied()).collect();
                for root in roots {
                    self.materialize(root, attach)?;
                }
                return Ok(());
            }
            None => return Err(ViewError::StaleNode(id)),
        };

        let handle = self.target.create(&tag)?;
        let decl = match self.nodes.get_mut(id.0).map(|m| &mut m.kind) {
            Some(MountedKind::Element(el)) => {
                el.handle = handle;
                mem::take(&mut el.decl)
            }
            Some(MountedKind::Content(c)) => {
                c.container.handle = handle;
                c.fingerprint = None;
                mem::take(&mut c.container.decl)
            }
            _ => return Err(ViewError::StaleNode(id)),
        };
        let encoded = self.encode(handle, &decl);
        match self.nodes.get_mut(id.0).map(|m| &mut m.kind) {
            Some(MountedKind::Element(el)) => el.decl = decl,
            Some(MountedKind::Content(c)) => c.container.decl = decl,
            _ => {}
        }
        encoded?;

        for child in children {
            self.materialize(child, Some(handle))?;
        }
        if is_content {
            self.refresh_content(id)?;
        }
        if let Some(parent_handle) = attach {
            self.target.append_child(parent_handle, handle)?;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Variables and names
    // ─────────────────────────────────────────────────────────────────────────

    pub(super) fn var_value(&self, name: &str) -> ViewResult<&Value> {
        self.vars
            .get(name)
            .map(|var| &var.value)
            .ok_or_else(|| ViewError::UnknownVariable(name.to_string()))
    }

    /// Current values of the variables `bindings` follow.
    fn resolve(&self, bindings: &[Binding]) -> ViewResult<Vec<(CompactString, Value)>> {
        bindings
            .iter()
            .map(|b| Ok((b.attr.clone(), self.var_value(&b.var)?.clone())))
            .collect()
    }

    fn subscribe(&mut self, id: NodeId, bindings: &[Binding]) {
        for binding in bindings {
            if let Some(var) = self.vars.get_mut(binding.var.as_str()) {
                var.subscribers.push((id, binding.attr.clone()));
            }
        }
    }

    fn register(&mut self, name: Option<CompactString>, id: NodeId) {
        if let Some(name) = name {
            self.names.insert(name, id);
        }
    }
}
