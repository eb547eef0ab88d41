//! Node identity
//!
//! Two id spaces exist side by side:
//! - [`NodeId`] names a node of the mounted logical tree. It is what the
//!   declarative layer puts in change records.
//! - [`DomId`] names a node of the bundled [`Dom`](crate::target::Dom)
//!   render target.
//!
//! Both are generational, so an id that outlives its node stops resolving
//! instead of silently pointing at whatever reused the slot.

use std::fmt;

use crate::arena::SlotId;

/// Identifier of a mounted logical node.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub struct NodeId(pub(crate) SlotId);

impl NodeId {
    /// Slot position of this node.
    #[inline]
    pub const fn index(&self) -> u32 {
        self.0.index()
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({:?})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}v{}", self.0.index(), self.0.generation())
    }
}

/// Handle of a node in a [`Dom`](crate::target::Dom) document.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub struct DomId(pub(crate) SlotId);

impl DomId {
    /// Slot position of this handle.
    #[inline]
    pub const fn index(&self) -> u32 {
        self.0.index()
    }
}

impl fmt::Debug for DomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DomId({:?})", self.0)
    }
}

impl fmt::Display for DomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}v{}", self.0.index(), self.0.generation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;

    #[test]
    fn test_display_includes_generation() {
        let mut arena = Arena::new();
        let first = arena.insert(());
        arena.remove(first);
        let second = NodeId(arena.insert(()));
        assert_eq!(second.to_string(), "n0v1");
        assert_eq!(NodeId(first).to_string(), "n0v0");
        assert_ne!(NodeId(first), second);
    }
}
