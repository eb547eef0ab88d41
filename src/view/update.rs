//! Update engine
//!
//! Applies change records to the mounted tree and translates them into the
//! minimal render-target mutations:
//!
//! - element attribute / text / tail: one targeted mutation
//! - looper `iterable`: keyed reconcile of its items
//! - content `source` or transformer option: regeneration, deferred to the
//!   end of the pass and skipped when the fingerprint is unchanged
//!
//! Siblings of a changed node are never touched.

use std::mem;

use compact_str::CompactString;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tracing::{debug, instrument, trace};

use crate::algo::{self, Plan, ReconcileStats};
use crate::attr::{Attr, Value};
use crate::codec::{self, AttrKind};
use crate::error::{ViewError, ViewResult};
use crate::id::NodeId;
use crate::node::{Content, Element, LoopKey, Looper, Node};
use crate::target::RenderTarget;

use super::tree::{
    assign, content_mut, element_mut, extra_value, looper_mut, text_value, LoopEntry, MountedElement, MountedKind,
};
use super::{Change, UpdateStats, View};

/// Apply one change to a mounted element. Returns the number of
/// render-target mutations issued.
///
/// The value is encoded before anything is mutated, so a rejected value
/// leaves both the element and its handle unchanged.
pub(super) fn set_on_element<T: RenderTarget>(
    target: &mut T,
    el: &mut MountedElement<T::Handle>,
    name: &str,
    value: Value,
    kind: Option<AttrKind>,
) -> ViewResult<usize> {
    let handle = el.handle;
    match name {
        "text" => {
            let text = text_value(name, &value)?;
            target.set_text(handle, text.as_deref())?;
            el.decl.text = text;
            Ok(1)
        }
        "tail" => {
            let tail = text_value(name, &value)?;
            target.set_tail(handle, tail.as_deref())?;
            el.decl.tail = tail;
            Ok(1)
        }
        "attrs" => {
            let next = extra_value(&value)?;
            let mut mutations = 0;
            for (key, _) in &el.decl.extra {
                if !next.iter().any(|(k, _)| k == key) {
                    target.set_attribute(handle, key, None)?;
                    mutations += 1;
                }
            }
            for (key, val) in &next {
                let current = el.decl.extra.iter().find(|(k, _)| k == key).map(|(_, v)| v);
                if current != Some(val) {
                    target.set_attribute(handle, key, Some(val))?;
                    mutations += 1;
                }
            }
            el.decl.extra = next;
            Ok(mutations)
        }
        _ => {
            let kind = kind
                .or_else(|| el.decl.attrs.iter().find(|a| a.name == name).map(|a| a.kind))
                .unwrap_or_else(|| AttrKind::of(name));
            let encoded = codec::encode(name, kind, &value)?;
            target.set_attribute(handle, name, encoded.as_deref())?;
            trace!(?handle, attr = name, value = ?encoded, "set attribute");
            el.decl.set(Attr::with_kind(name, kind, value));
            Ok(1)
        }
    }
}

/// Attribute changes turning `old` into `new`, skipping bound names.
fn diff_element(old: &Element, new: Element) -> Vec<(CompactString, Value, Option<AttrKind>)> {
    let mut out = Vec::new();
    for attr in &new.attrs {
        if !old.is_bound(&attr.name) && old.get(&attr.name) != Some(&attr.value) {
            out.push((attr.name.clone(), attr.value.clone(), Some(attr.kind)));
        }
    }
    for attr in &old.attrs {
        if !old.is_bound(&attr.name) && !attr.value.is_unset() && new.get(&attr.name).is_none() {
            out.push((attr.name.clone(), Value::Unset, None));
        }
    }
    if !old.is_bound("attrs") && old.extra != new.extra {
        out.push(("attrs".into(), Value::map(new.extra), None));
    }
    if !old.is_bound("text") && old.text != new.text {
        out.push(("text".into(), new.text.into(), None));
    }
    if !old.is_bound("tail") && old.tail != new.tail {
        out.push(("tail".into(), new.tail.into(), None));
    }
    out
}

/// Working state of one reconcile pass.
struct Pass<H> {
    old: Vec<Option<LoopEntry>>,
    entries: Vec<LoopEntry>,
    gone: FxHashSet<H>,
    appended: Vec<H>,
    stats: ReconcileStats,
}

#[derive(Clone, Copy)]
enum Kind {
    Element,
    Looper,
    Content,
}

impl<T: RenderTarget> View<T> {
    /// Apply changes in order, then regenerate dirty content nodes.
    ///
    /// Later changes to the same attribute win. On error the remaining
    /// changes are dropped; the tree stays structurally valid.
    pub fn apply(&mut self, changes: impl IntoIterator<Item = Change>) -> ViewResult<UpdateStats> {
        self.apply_changes(changes, false)
    }

    /// Apply changes; with `skip_stale`, changes addressed to nodes that
    /// disappeared earlier in the same pass are ignored.
    #[instrument(level = "debug", skip_all)]
    pub(super) fn apply_changes(
        &mut self,
        changes: impl IntoIterator<Item = Change>,
        skip_stale: bool,
    ) -> ViewResult<UpdateStats> {
        let mut stats = UpdateStats::default();
        let mut dirty: Vec<NodeId> = Vec::new();

        for change in changes {
            if skip_stale && !self.nodes.contains(change.node.0) {
                trace!(node = %change.node, "skipping change to unmounted node");
                continue;
            }
            self.apply_one(change, &mut stats, &mut dirty)?;
        }

        for node in dirty {
            if self.nodes.contains(node.0) && self.refresh_content(node)? {
                stats.regenerated += 1;
            }
        }

        debug!(
            changes = stats.changes,
            mutations = stats.mutations,
            regenerated = stats.regenerated,
            added = stats.reconcile.added,
            removed = stats.reconcile.removed,
            moved = stats.reconcile.moved,
            "applied changes"
        );
        Ok(stats)
    }

    fn apply_one(&mut self, change: Change, stats: &mut UpdateStats, dirty: &mut Vec<NodeId>) -> ViewResult<()> {
        let Change { node, name, value } = change;
        let kind = match self.nodes.get(node.0).map(|m| &m.kind) {
            Some(MountedKind::Element(_)) => Kind::Element,
            Some(MountedKind::Looper(_)) => Kind::Looper,
            Some(MountedKind::Content(_)) => Kind::Content,
            None => return Err(ViewError::StaleNode(node)),
        };
        stats.changes += 1;

        match kind {
            Kind::Element => {
                let Self { nodes, target, .. } = self;
                let el = element_mut(nodes, node)?;
                stats.mutations += set_on_element(target, el, &name, value, None)?;
            }
            Kind::Looper => {
                if name != "iterable" {
                    return Err(ViewError::unsupported(name, "iterable", value.shape()));
                }
                Looper::items(&value)?;
                looper_mut(&mut self.nodes, node)?.looper.iterable = value;
                stats.reconcile += self.reconcile(node)?;
            }
            Kind::Content => {
                let Self { nodes, target, .. } = self;
                let content = content_mut(nodes, node)?;
                if name == "source" {
                    content.source = text_value(&name, &value)?.map(String::from).unwrap_or_default();
                } else if !content.transformer.set_option(&name, &value)? {
                    stats.mutations += set_on_element(target, &mut content.container, &name, value, None)?;
                    return Ok(());
                }
                if !dirty.contains(&node) {
                    dirty.push(node);
                }
            }
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Looper reconcile
    // ─────────────────────────────────────────────────────────────────────────

    /// Bring a looper's rendered items in line with its iterable.
    ///
    /// Removed items are detached and released, added items are built and
    /// appended, kept items whose value changed are patched in place. When
    /// the resulting order differs from what the appends produced, the
    /// host's children are reordered with a single call.
    #[instrument(level = "debug", skip(self), fields(looper = %id))]
    pub(super) fn reconcile(&mut self, id: NodeId) -> ViewResult<ReconcileStats> {
        let host = self.host(id)?;
        let host_handle = element_mut(&mut self.nodes, host)?.handle;
        let before = self.child_handles(host);

        let looper = looper_mut(&mut self.nodes, id)?;
        let items = Looper::items(&looper.looper.iterable)?.to_vec();
        let keys = looper.looper.keys(&items);
        let prev: Vec<LoopKey> = looper.entries.iter().map(|e| e.key.clone()).collect();
        let plan = algo::plan(&prev, &keys);

        let mut pass = Pass {
            old: mem::take(&mut looper.entries).into_iter().map(Some).collect(),
            entries: Vec::with_capacity(plan.items.len()),
            gone: FxHashSet::default(),
            appended: Vec::new(),
            stats: plan.stats,
        };
        let result = self.run_pass(id, host_handle, &plan, &items, &keys, &mut pass);

        let looper = looper_mut(&mut self.nodes, id)?;
        looper.entries = mem::take(&mut pass.entries);
        if let Err(err) = result {
            looper.entries.extend(pass.old.into_iter().flatten());
            return Err(err);
        }

        let desired = self.child_handles(host);
        let actual: Vec<T::Handle> = before
            .into_iter()
            .filter(|h| !pass.gone.contains(h))
            .chain(pass.appended)
            .collect();
        if desired != actual {
            self.target.reorder_children(host_handle, &desired)?;
        }

        debug!(
            added = pass.stats.added,
            removed = pass.stats.removed,
            moved = pass.stats.moved,
            updated = pass.stats.updated,
            reordered = plan.order_changed(),
            "reconciled"
        );
        Ok(pass.stats)
    }

    fn run_pass(
        &mut self,
        id: NodeId,
        host: T::Handle,
        plan: &Plan,
        items: &[Value],
        keys: &[LoopKey],
        pass: &mut Pass<T::Handle>,
    ) -> ViewResult<()> {
        for &index in &plan.removed {
            if let Some(entry) = pass.old[index].take() {
                self.drop_roots(host, &entry.roots, &mut pass.gone)?;
            }
        }

        for planned in &plan.items {
            let value = &items[planned.item];
            let key = keys[planned.item].clone();
            match planned.prev.and_then(|prev| pass.old[prev].take()) {
                None => {
                    let roots = self.mount_item(id, planned.item, value, None)?;
                    pass.entries.push(LoopEntry {
                        key,
                        value: value.clone(),
                        index: planned.item,
                        roots: roots.clone(),
                    });
                    self.append_roots(host, &roots, &mut pass.appended)?;
                }
                Some(mut entry) => {
                    entry.key = key;
                    let result = if entry.value == *value && entry.index == planned.item {
                        Ok(())
                    } else {
                        pass.stats.updated += 1;
                        self.update_item(id, host, planned.item, value, &mut entry, pass)
                    };
                    pass.entries.push(entry);
                    result?;
                }
            }
        }
        Ok(())
    }

    /// Re-run the template for a kept item whose value or position changed. Same-shaped
    /// output is patched attribute by attribute; anything else rebuilds the
    /// item alone.
    fn update_item(
        &mut self,
        looper: NodeId,
        host: T::Handle,
        index: usize,
        value: &Value,
        entry: &mut LoopEntry,
        pass: &mut Pass<T::Handle>,
    ) -> ViewResult<()> {
        let decls = self.instantiate(looper, index, value)?;
        if self.same_shape(&entry.roots, &decls) {
            for (root, decl) in entry.roots.clone().into_iter().zip(decls) {
                self.patch(root, decl)?;
            }
        } else {
            trace!(index, "item shape changed, rebuilding");
            let old = mem::take(&mut entry.roots);
            self.drop_roots(host, &old, &mut pass.gone)?;
            entry.roots = self.mount_decls(looper, decls, None)?;
            self.append_roots(host, &entry.roots, &mut pass.appended)?;
        }
        entry.value = value.clone();
        entry.index = index;
        Ok(())
    }

    fn drop_roots(&mut self, host: T::Handle, roots: &[NodeId], gone: &mut FxHashSet<T::Handle>) -> ViewResult<()> {
        for root in roots {
            let mut handles = Vec::new();
            self.expand(*root, &mut handles);
            for handle in handles {
                self.target.remove_child(host, handle)?;
                gone.insert(handle);
            }
            self.unmount(*root)?;
        }
        Ok(())
    }

    fn append_roots(&mut self, host: T::Handle, roots: &[NodeId], appended: &mut Vec<T::Handle>) -> ViewResult<()> {
        let mut handles = Vec::new();
        for root in roots {
            self.expand(*root, &mut handles);
        }
        for handle in handles {
            self.target.append_child(host, handle)?;
            appended.push(handle);
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Patch
    // ─────────────────────────────────────────────────────────────────────────

    fn same_shape(&self, roots: &[NodeId], decls: &[Node]) -> bool {
        roots.len() == decls.len() && roots.iter().zip(decls).all(|(root, decl)| self.shape_matches(*root, decl))
    }

    fn shape_matches(&self, id: NodeId, decl: &Node) -> bool {
        match (self.nodes.get(id.0).map(|m| &m.kind), decl) {
            (Some(MountedKind::Element(el)), Node::Element(new)) => {
                el.decl.tag == new.tag
                    && el.children.len() == new.children.len()
                    && el
                        .children
                        .iter()
                        .zip(&new.children)
                        .all(|(child, decl)| self.shape_matches(*child, decl))
            }
            (Some(MountedKind::Looper(_)), Node::Looper(_)) => true,
            (Some(MountedKind::Content(c)), Node::Content(new)) => {
                c.container.decl.tag == new.container.tag && c.transformer.name() == new.transformer.name()
            }
            _ => false,
        }
    }

    /// Patch a mounted node towards a same-shaped declaration.
    fn patch(&mut self, id: NodeId, decl: Node) -> ViewResult<()> {
        match decl {
            Node::Element(new) => {
                let mut new = *new;
                let children = mem::take(&mut new.children);
                let Self { nodes, target, .. } = self;
                let el = element_mut(nodes, id)?;
                for (name, value, kind) in diff_element(&el.decl, new) {
                    set_on_element(target, el, &name, value, kind)?;
                }
                let child_ids: SmallVec<[NodeId; 8]> = el.children.clone();
                for (child, decl) in child_ids.into_iter().zip(children) {
                    self.patch(child, decl)?;
                }
            }
            Node::Looper(new) => {
                let looper = looper_mut(&mut self.nodes, id)?;
                looper.looper.template = new.template;
                if looper.looper.binding.is_none() && looper.looper.iterable != new.iterable {
                    Looper::items(&new.iterable)?;
                    looper.looper.iterable = new.iterable;
                    self.reconcile(id)?;
                }
            }
            Node::Content(new) => {
                let Content {
                    mut container,
                    source,
                    options,
                    ..
                } = new;
                container.children.clear();
                let Self { nodes, target, .. } = self;
                let content = content_mut(nodes, id)?;
                if !content.container.decl.is_bound("source") {
                    content.source = source;
                }
                for (key, value) in options {
                    if content.container.decl.is_bound(&key) {
                        continue;
                    }
                    if !content.transformer.set_option(&key, &value)? {
                        assign(&mut container, &key, value)?;
                    }
                }
                for (name, value, kind) in diff_element(&content.container.decl, container) {
                    set_on_element(target, &mut content.container, &name, value, kind)?;
                }
                self.refresh_content(id)?;
            }
        }
        Ok(())
    }
}
