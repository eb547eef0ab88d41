//! Mounted views
//!
//! A [`View`] owns a declaration tree mounted onto a [`RenderTarget`]. It
//! keeps every declared node, its current attribute state and its target
//! handle, and turns change records into targeted mutations.
//!
//! # Module Structure
//!
//! - `tree` - Mounted records, build and rebuild
//! - `update` - Change application, keyed looper reconcile, item patching
//! - `shared` - Thread-safe wrapper for concurrent renders
//!
//! # Example
//!
//! ```ignore
//! use tola_view::prelude::*;
//!
//! let mut view = View::builder(
//!     html::html().child(html::body().child(html::p().bind("class", "theme").text("hi"))),
//! )
//! .var("theme", "light")
//! .build()?;
//!
//! let page = view.render_with([("theme", "dark")])?;
//! ```

mod shared;
mod tree;
mod update;

use compact_str::CompactString;
use rustc_hash::FxHashMap;
use tracing::{debug, instrument, warn};

use crate::algo::ReconcileStats;
use crate::arena::{Arena, SlotId};
use crate::attr::Value;
use crate::error::{ViewError, ViewResult};
use crate::id::NodeId;
use crate::node::{Element, Node};
use crate::render::RenderConfig;
use crate::target::{Dom, RenderTarget};

pub use shared::{render_all, SharedView};

use tree::{Mounted, MountedKind};

/// A change record: set `name` on `node` to `value`.
///
/// Besides attribute names, `name` may be one of the reserved names
/// `text`, `tail`, `attrs` (escape-hatch mapping), `iterable` (looper)
/// or `source` (content). Transformer option keys address content nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub node: NodeId,
    pub name: CompactString,
    pub value: Value,
}

impl Change {
    pub fn new(node: NodeId, name: impl Into<CompactString>, value: impl Into<Value>) -> Self {
        Self {
            node,
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Statistics of one update pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpdateStats {
    /// Change records applied
    pub changes: usize,
    /// Attribute, text and tail mutations issued to the render target
    pub mutations: usize,
    /// Content nodes whose fragment was regenerated
    pub regenerated: usize,
    /// Looper reconcile totals
    pub reconcile: ReconcileStats,
}

impl std::ops::AddAssign for UpdateStats {
    fn add_assign(&mut self, other: Self) {
        self.changes += other.changes;
        self.mutations += other.mutations;
        self.regenerated += other.regenerated;
        self.reconcile += other.reconcile;
    }
}

/// A view-level variable and the nodes following it.
#[derive(Debug)]
struct Var {
    value: Value,
    subscribers: Vec<(NodeId, CompactString)>,
}

/// A declaration tree mounted onto a render target.
pub struct View<T: RenderTarget = Dom> {
    nodes: Arena<Mounted<T::Handle>>,
    target: T,
    root: NodeId,
    vars: FxHashMap<CompactString, Var>,
    names: FxHashMap<CompactString, NodeId>,
    queue: Vec<Change>,
}

impl View<Dom> {
    /// Start building a view rooted at `root`.
    pub fn builder(root: Element) -> ViewBuilder {
        ViewBuilder {
            root,
            vars: Vec::new(),
            config: RenderConfig::default(),
        }
    }
}

impl<T: RenderTarget> View<T> {
    /// Root element of the mounted tree.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn into_target(self) -> T {
        self.target
    }

    /// Number of mounted logical nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node registered under `name`. When several nodes share a name the
    /// most recently mounted one wins.
    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// Render-target handle of an element or content node.
    pub fn handle(&self, node: NodeId) -> Option<T::Handle> {
        match self.nodes.get(node.0).map(|m| &m.kind) {
            Some(MountedKind::Element(el)) => Some(el.handle),
            Some(MountedKind::Content(c)) => Some(c.container.handle),
            _ => None,
        }
    }

    /// Current value of a typed attribute.
    pub fn attr(&self, node: NodeId, name: &str) -> Option<&Value> {
        match self.nodes.get(node.0).map(|m| &m.kind) {
            Some(MountedKind::Element(el)) => el.decl.get(name),
            Some(MountedKind::Content(c)) => c.container.decl.get(name),
            Some(MountedKind::Looper(l)) if name == "iterable" => Some(&l.looper.iterable),
            _ => None,
        }
    }

    /// Current value of a variable.
    pub fn var(&self, name: &str) -> Option<&Value> {
        self.vars.get(name).map(|var| &var.value)
    }

    /// Queue a change for the next [`flush`](Self::flush) or render.
    pub fn set(&mut self, node: NodeId, name: impl Into<CompactString>, value: impl Into<Value>) {
        self.queue.push(Change::new(node, name, value));
    }

    /// Number of queued changes.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Apply all queued changes.
    pub fn flush(&mut self) -> ViewResult<UpdateStats> {
        let queued = std::mem::take(&mut self.queue);
        self.apply(queued)
    }

    /// Set a variable and propagate it to every subscribed node.
    pub fn set_var(&mut self, name: &str, value: impl Into<Value>) -> ViewResult<UpdateStats> {
        let mut changes = Vec::new();
        self.var_changes(name, value.into(), &mut changes)?;
        self.apply_changes(changes, true)
    }

    fn var_changes(&mut self, name: &str, value: Value, out: &mut Vec<Change>) -> ViewResult<()> {
        let var = self
            .vars
            .get_mut(name)
            .ok_or_else(|| ViewError::UnknownVariable(name.to_string()))?;
        out.extend(var.subscribers.iter().map(|(node, attr)| Change {
            node: *node,
            name: attr.clone(),
            value: value.clone(),
        }));
        var.value = value;
        Ok(())
    }

    /// Apply queued changes and serialize the document.
    pub fn render(&mut self) -> ViewResult<String> {
        self.flush()?;
        self.serialize()
    }

    /// Apply queued changes plus `values`, then serialize.
    ///
    /// Each name is a variable when one is declared under it, otherwise an
    /// attribute of the root element.
    #[instrument(level = "debug", skip_all)]
    pub fn render_with<I, K, V>(&mut self, values: I) -> ViewResult<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<CompactString>,
        V: Into<Value>,
    {
        let mut changes = std::mem::take(&mut self.queue);
        for (name, value) in values {
            let (name, value) = (name.into(), value.into());
            if self.vars.contains_key(&name) {
                self.var_changes(&name, value, &mut changes)?;
            } else {
                changes.push(Change {
                    node: self.root,
                    name,
                    value,
                });
            }
        }
        self.apply_changes(changes, true)?;
        self.serialize()
    }

    /// Serialize the current document without applying queued changes.
    pub fn serialize(&self) -> ViewResult<String> {
        let root = self.handle(self.root).ok_or(ViewError::StaleNode(self.root))?;
        self.target.serialize(root)
    }

    /// Evaluate a path query against the rendered document.
    pub fn xpath(&self, query: &str) -> ViewResult<Vec<T::Handle>> {
        let root = self.handle(self.root).ok_or(ViewError::StaleNode(self.root))?;
        self.target.find(root, query)
    }

    /// Discard the render-target document and recreate it from the
    /// mounted tree. Logical node ids stay valid; handles change.
    #[instrument(level = "debug", skip(self))]
    pub fn rebuild(&mut self) -> ViewResult<()> {
        if let Some(root) = self.handle(self.root) {
            if let Err(err) = self.target.release(root) {
                warn!(%err, "releasing the previous document failed");
            }
        }
        self.materialize(self.root, None)?;
        debug!(nodes = self.nodes.len(), "rebuilt document");
        Ok(())
    }
}

impl<T: RenderTarget> std::fmt::Debug for View<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("root", &self.root)
            .field("nodes", &self.nodes.len())
            .field("vars", &self.vars.len())
            .field("pending", &self.queue.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`View`].
#[derive(Debug)]
pub struct ViewBuilder {
    root: Element,
    vars: Vec<(CompactString, Value)>,
    config: RenderConfig,
}

impl ViewBuilder {
    /// Declare a variable with its default value.
    pub fn var(mut self, name: impl Into<CompactString>, default: impl Into<Value>) -> Self {
        self.vars.push((name.into(), default.into()));
        self
    }

    /// Serialization settings of the bundled [`Dom`].
    pub fn config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    /// Mount onto a fresh [`Dom`].
    pub fn build(self) -> ViewResult<View<Dom>> {
        let target = Dom::with_config(self.config);
        self.build_with(target)
    }

    /// Mount onto an arbitrary render target.
    #[instrument(level = "debug", skip_all)]
    pub fn build_with<T: RenderTarget>(self, target: T) -> ViewResult<View<T>> {
        let vars = self
            .vars
            .into_iter()
            .map(|(name, value)| {
                (
                    name,
                    Var {
                        value,
                        subscribers: Vec::new(),
                    },
                )
            })
            .collect();

        let mut view = View {
            nodes: Arena::new(),
            target,
            root: NodeId(SlotId::DANGLING),
            vars,
            names: FxHashMap::default(),
            queue: Vec::new(),
        };
        view.root = view.mount(Node::Element(Box::new(self.root)), None, None)?;

        debug!(nodes = view.nodes.len(), vars = view.vars.len(), "built view");
        Ok(view)
    }
}
