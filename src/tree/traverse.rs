//! Path-locking engine for [`Tree`](super::Tree).
//!
//! Resolves paths top-down while applying the per-node lock discipline:
//!
//! ```text
//! shared descent:      S(root) -> lookup -> X(root) -> S(a) -> lookup -> X(a) -> ... S(target)
//! exclusive-terminated: S(root) -> ... -> S(parent) -> lookup -> X(parent) -> W(target)
//! ```
//!
//! `S`/`X` are `enter_shared`/`exit_shared`, `W` is `enter_exclusive`. Exiting
//! a shared hold keeps the thread counted as present at that node, so a
//! writer above cannot mutate the path under it. Presence is given back by
//! [`release_presence`] when the final hold ends.
//!
//! Holds are [`HeldNode`] guards. Dropping one exits its mode and gives
//! presence back up to its bound, so every early return (and unwinding panic)
//! leaves no lock behind.

use std::sync::Arc;

use crate::error::TreeError;
use crate::node::{Node, release_presence};
use crate::path;
use crate::tracing_helpers::{trace_log, warn_log};

// ============================================================================
//  HeldNode
// ============================================================================

/// Mode in which a node is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Shared,
    Exclusive,
}

/// Proof that the current thread holds a node.
///
/// Dropping the guard exits the mode, then gives back presence from
/// `climb_from` up to (excluding) `bound`.
#[derive(Debug)]
#[must_use = "dropping a held node releases it immediately"]
pub(crate) struct HeldNode {
    node: Arc<Node>,
    access: Access,

    /// First node whose presence is returned once the hold ends.
    climb_from: Option<Arc<Node>>,

    /// Exclusively held ancestor the climb stops at; `None` climbs to the root.
    bound: Option<Arc<Node>>,
}

impl HeldNode {
    fn shared(node: Arc<Node>, bound: Option<&Arc<Node>>) -> Self {
        Self {
            climb_from: Some(Arc::clone(&node)),
            node,
            access: Access::Shared,
            bound: bound.cloned(),
        }
    }

    /// `via` is the node the descent came through. Exiting exclusive mode
    /// already returns the presence at `node`, so the climb starts at `via`.
    fn exclusive(node: Arc<Node>, via: Option<Arc<Node>>, bound: Option<&Arc<Node>>) -> Self {
        let climb_from: Option<Arc<Node>> =
            via.filter(|v| !bound.is_some_and(|b| Arc::ptr_eq(b, v)));

        Self {
            node,
            access: Access::Exclusive,
            climb_from,
            bound: bound.cloned(),
        }
    }

    #[inline]
    pub(crate) const fn node(&self) -> &Arc<Node> {
        &self.node
    }

    #[inline]
    pub(crate) const fn access(&self) -> Access {
        self.access
    }
}

impl Drop for HeldNode {
    fn drop(&mut self) {
        match self.access {
            Access::Shared => self.node.sync().exit_shared(),
            Access::Exclusive => self.node.sync().exit_exclusive(),
        }

        if let Some(start) = self.climb_from.take() {
            release_presence(&start, self.bound.as_ref());
        }
    }
}

// ============================================================================
//  Descent
// ============================================================================

/// Walk from `current` (already entered shared by this thread) along `rest`.
///
/// With `last == Access::Shared` the target is returned held shared. With
/// `Access::Exclusive` the last component is entered exclusively instead;
/// `rest` must then not be the root.
fn descend(
    mut current: Arc<Node>,
    mut rest: &str,
    last: Access,
    bound: Option<&Arc<Node>>,
) -> Result<HeldNode, TreeError> {
    debug_assert!(last == Access::Shared || !path::is_root(rest));

    loop {
        let Some((name, tail)) = path::split_first(rest) else {
            return Ok(HeldNode::shared(current, bound));
        };

        let child: Option<Arc<Node>> = current.child(name);
        current.sync().exit_shared();

        let Some(child) = child else {
            trace_log!(component = name, "component missing, unwinding");
            release_presence(&current, bound);
            return Err(TreeError::NotFound);
        };

        if last == Access::Exclusive && path::is_root(tail) {
            trace_log!(component = name, "entering exclusive");
            child.sync().enter_exclusive();
            return Ok(HeldNode::exclusive(child, Some(current), bound));
        }

        trace_log!(component = name, "entering shared");
        child.sync().enter_shared();
        current = child;
        rest = tail;
    }
}

/// Resolve `path` from `root` and return the target held shared.
pub(crate) fn find_as_reader(root: &Arc<Node>, path: &str) -> Result<HeldNode, TreeError> {
    root.sync().enter_shared();
    descend(Arc::clone(root), path, Access::Shared, None)
}

/// Resolve `path` from `root` and return the target held exclusively.
///
/// Every ancestor is only passed through in shared mode.
pub(crate) fn find_and_lock_writer(root: &Arc<Node>, path: &str) -> Result<HeldNode, TreeError> {
    if path::is_root(path) {
        root.sync().enter_exclusive();
        return Ok(HeldNode::exclusive(Arc::clone(root), None, None));
    }

    root.sync().enter_shared();
    descend(Arc::clone(root), path, Access::Exclusive, None)
}

/// Resolve `rel` below the exclusively held `held` and lock the target
/// exclusively.
///
/// Returns `Ok(None)` when `rel` is the root, i.e. the target is `held`
/// itself. Presence taken on the way is bounded by `held`.
pub(crate) fn lock_writer_below(held: &HeldNode, rel: &str) -> Result<Option<HeldNode>, TreeError> {
    debug_assert_eq!(held.access(), Access::Exclusive);

    let Some((name, tail)) = path::split_first(rel) else {
        return Ok(None);
    };
    let bound: &Arc<Node> = held.node();
    let child: Arc<Node> = bound.child(name).ok_or(TreeError::NotFound)?;

    if path::is_root(tail) {
        child.sync().enter_exclusive();
        return Ok(Some(HeldNode::exclusive(child, Some(Arc::clone(bound)), Some(bound))));
    }

    child.sync().enter_shared();
    descend(child, tail, Access::Exclusive, Some(bound)).map(Some)
}

/// Claim the direct child `name` of the exclusively held `parent` without
/// blocking.
///
/// The parent's hold already keeps every other thread out of the child, so
/// the claim is expected to succeed; if it does not, the child is reported
/// busy rather than waited for.
pub(crate) fn claim_child(parent: &HeldNode, name: &str) -> Result<HeldNode, TreeError> {
    debug_assert_eq!(parent.access(), Access::Exclusive);

    let bound: &Arc<Node> = parent.node();
    let child: Arc<Node> = bound.child(name).ok_or(TreeError::NotFound)?;

    if !child.sync().try_enter_exclusive() {
        warn_log!(component = name, "child occupied under an exclusively held parent");
        return Err(TreeError::Busy);
    }

    Ok(HeldNode::exclusive(child, Some(Arc::clone(bound)), Some(bound)))
}

// ============================================================================
//  PairLock
// ============================================================================

/// Everything `move` needs held: the lowest common ancestor of both parents,
/// the source parent, the source, and the target parent.
///
/// Parents that coincide with the ancestor (or with each other) are not held
/// twice; the `Option` fields are `None` then.
///
/// Fields drop in declaration order: source, target parent, source parent,
/// ancestor. Deeper holds end before the ones bounding their presence.
#[derive(Debug)]
pub(crate) struct PairLock {
    source: HeldNode,
    target_parent: Option<HeldNode>,
    source_parent: Option<HeldNode>,
    ancestor: HeldNode,
}

impl PairLock {
    /// Lock the ancestor of both parents, then both endpoints under its
    /// protection.
    ///
    /// Both paths must be valid, neither the root, and `target` must not lie
    /// inside `source`. Source-side components are resolved first, so a
    /// missing source is reported even when the target side is also broken.
    pub(crate) fn acquire(root: &Arc<Node>, source: &str, target: &str) -> Result<Self, TreeError> {
        let (source_parent_path, source_name) = path::parent_of(source).ok_or(TreeError::Busy)?;
        let (target_parent_path, _) = path::parent_of(target).ok_or(TreeError::AlreadyExists)?;
        debug_assert!(!path::is_strict_descendant(target, source));

        let lca: &str = path::common_ancestor(source_parent_path, target_parent_path);
        trace_log!(ancestor = lca, "locking common ancestor");

        let ancestor: HeldNode = find_and_lock_writer(root, lca)?;

        let source_parent: Option<HeldNode> =
            lock_writer_below(&ancestor, path::relative_to(source_parent_path, lca))?;

        let source: HeldNode = claim_child(source_parent.as_ref().unwrap_or(&ancestor), source_name)?;

        // Below the ancestor the two parents sit on different branches (or one
        // of them is the ancestor), so this descent never crosses the source
        // parent. When both parents are the same node it is the ancestor.
        let target_parent: Option<HeldNode> = if source_parent_path == target_parent_path {
            None
        } else {
            lock_writer_below(&ancestor, path::relative_to(target_parent_path, lca))?
        };

        Ok(Self {
            source,
            target_parent,
            source_parent,
            ancestor,
        })
    }

    pub(crate) fn source(&self) -> &Arc<Node> {
        self.source.node()
    }

    pub(crate) fn source_parent(&self) -> &Arc<Node> {
        self.source_parent.as_ref().unwrap_or(&self.ancestor).node()
    }

    pub(crate) fn target_parent(&self) -> &Arc<Node> {
        self.target_parent.as_ref().unwrap_or(&self.ancestor).node()
    }
}
