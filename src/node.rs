//! Filepath: src/node.rs
//!
//! Tree node: one directory of the namespace.
//!
//! A node owns its children (`Arc<Node>` inside its [`Children`]) and refers
//! to its parent through a `Weak` link that never keeps the parent alive.
//! Children and counters are only touched under the node's [`NodeSync`]
//! discipline; the inner `parking_lot` locks merely make the accesses sound
//! and are never held across a protocol wait.

use std::fmt as StdFmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::children::Children;
use crate::nodesync::NodeSync;

// ============================================================================
//  Node
// ============================================================================

/// One directory.
pub(crate) struct Node {
    children: RwLock<Children<Arc<Node>>>,

    /// Enclosing directory; empty for the root.
    parent: Mutex<Weak<Node>>,

    sync: NodeSync,
}

impl Node {
    /// Create the root of a new tree.
    pub(crate) fn new_root() -> Arc<Self> {
        Arc::new(Self {
            children: RwLock::new(Children::new()),
            parent: Mutex::new(Weak::new()),
            sync: NodeSync::new(),
        })
    }

    /// Create an empty directory whose parent link points at `parent`.
    ///
    /// The caller inserts it into `parent`'s children.
    pub(crate) fn new_child(parent: &Arc<Self>) -> Arc<Self> {
        Arc::new(Self {
            children: RwLock::new(Children::new()),
            parent: Mutex::new(Arc::downgrade(parent)),
            sync: NodeSync::new(),
        })
    }

    #[inline]
    pub(crate) const fn sync(&self) -> &NodeSync {
        &self.sync
    }

    /// The enclosing directory, or `None` for the root.
    pub(crate) fn parent(&self) -> Option<Arc<Self>> {
        self.parent.lock().upgrade()
    }

    /// Re-point the parent link after a move.
    pub(crate) fn set_parent(&self, parent: &Arc<Self>) {
        *self.parent.lock() = Arc::downgrade(parent);
    }

    /// Look up a direct child by name.
    pub(crate) fn child(&self, name: &str) -> Option<Arc<Self>> {
        self.children.read().get(name).cloned()
    }

    pub(crate) fn children(&self) -> RwLockReadGuard<'_, Children<Arc<Self>>> {
        self.children.read()
    }

    pub(crate) fn children_mut(&self) -> RwLockWriteGuard<'_, Children<Arc<Self>>> {
        self.children.write()
    }

    /// Whether the parent link of this node points at `parent`.
    pub(crate) fn has_parent(&self, parent: &Arc<Self>) -> bool {
        self.parent().is_some_and(|p| Arc::ptr_eq(&p, parent))
    }
}

impl Drop for Node {
    /// Tear the subtree down without recursing once per level.
    fn drop(&mut self) {
        let mut pending: Vec<Arc<Self>> = self.children.get_mut().drain().collect();

        while let Some(child) = pending.pop() {
            // Only the last owner takes the subtree apart; anyone else still
            // holding a handle keeps it alive.
            if let Ok(mut child) = Arc::try_unwrap(child) {
                pending.extend(child.children.get_mut().drain());
            }
        }
    }
}

impl StdFmt::Debug for Node {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("Node")
            .field("children", &self.children.read().len())
            .field("sync", &self.sync.snapshot())
            .finish_non_exhaustive()
    }
}

// ============================================================================
//  Presence release
// ============================================================================

/// Give back one unit of presence at `start` and each of its ancestors.
///
/// Stops before `bound`, or after the root when there is no bound. Each
/// parent link is read before departing from the node: while this thread is
/// still counted there the node cannot be relocated, afterwards it can.
pub(crate) fn release_presence(start: &Arc<Node>, bound: Option<&Arc<Node>>) {
    let mut current: Arc<Node> = Arc::clone(start);

    loop {
        if bound.is_some_and(|b| Arc::ptr_eq(b, &current)) {
            return;
        }

        let parent: Option<Arc<Node>> = current.parent();
        current.sync().depart();

        match parent {
            Some(parent) => current = parent,
            None => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attach(parent: &Arc<Node>, name: &str) -> Arc<Node> {
        let child = Node::new_child(parent);
        assert!(parent.children_mut().insert(name, Arc::clone(&child)));
        child
    }

    #[test]
    fn test_parent_links() {
        let root = Node::new_root();
        let a = attach(&root, "a");
        let b = attach(&a, "b");

        assert!(root.parent().is_none());
        assert!(a.has_parent(&root));
        assert!(b.has_parent(&a));

        b.set_parent(&root);
        assert!(b.has_parent(&root));
    }

    #[test]
    fn test_parent_link_does_not_own() {
        let root = Node::new_root();
        let a = attach(&root, "a");

        drop(root);
        assert!(a.parent().is_none());
    }

    #[test]
    fn test_release_presence_to_root() {
        let root = Node::new_root();
        let a = attach(&root, "a");
        let b = attach(&a, "b");

        for node in [&root, &a, &b] {
            node.sync().enter_shared();
            node.sync().exit_shared();
        }

        release_presence(&b, None);

        for node in [&root, &a, &b] {
            assert!(node.sync().is_idle());
        }
    }

    #[test]
    fn test_release_presence_stops_at_bound() {
        let root = Node::new_root();
        let a = attach(&root, "a");
        let b = attach(&a, "b");

        root.sync().enter_shared();
        root.sync().exit_shared();
        for node in [&a, &b] {
            node.sync().enter_shared();
            node.sync().exit_shared();
        }

        release_presence(&b, Some(&a));

        assert!(b.sync().is_idle());
        assert_eq!(a.sync().snapshot().presence_below, 1);
        assert_eq!(root.sync().snapshot().presence_below, 1);

        release_presence(&a, None);
        assert!(a.sync().is_idle());
        assert!(root.sync().is_idle());
    }

    #[test]
    fn test_release_presence_from_bound_is_noop() {
        let root = Node::new_root();
        root.sync().enter_shared();
        root.sync().exit_shared();

        release_presence(&root, Some(&root));
        assert_eq!(root.sync().snapshot().presence_below, 1);

        release_presence(&root, None);
        assert!(root.sync().is_idle());
    }

    #[test]
    fn test_deep_chain_drops_iteratively() {
        let root = Node::new_root();
        let mut tip = Arc::clone(&root);

        for _ in 0..100_000 {
            tip = attach(&tip, "d");
        }
        drop(tip);

        // Would overflow the stack with one drop frame per level.
        drop(root);
    }
}
