//! Filepath: src/tree.rs
//! [`Tree`] - a concurrent directory tree with per-node locking.
//!
//! This module provides the public operations. The lock discipline they rely
//! on lives in [`traverse`].
//!
//! # Write Protocol
//!
//! ```text
//! 1. validate the path(s)
//! 2. descend, passing ancestors in shared mode      (traverse)
//! 3. enter the node to mutate exclusively           (waits for its subtree to drain)
//! 4. mutate children                                (nobody else is inside)
//! 5. drop the holds                                 (exit + presence back to the root)
//! ```

use std::fmt as StdFmt;
use std::sync::Arc;

use crate::error::TreeError;
use crate::node::Node;
use crate::nodesync::SyncSnapshot;
use crate::path;
use crate::tracing_helpers::debug_log;

mod traverse;


use traverse::{HeldNode, PairLock, claim_child, find_and_lock_writer, find_as_reader};

// ============================================================================
//  Tree
// ============================================================================

/// A concurrent, in-memory hierarchy of named directories.
///
/// All operations take `&self`; share the tree between threads with `Arc`.
/// Operations on disjoint subtrees run in parallel. An operation that changes
/// a directory waits until no other thread is anywhere inside it.
///
/// # Example
///
/// ```rust
/// use dirtree::{Tree, TreeError};
///
/// let tree = Tree::new();
/// tree.create("/a/")?;
/// tree.create("/a/b/")?;
/// tree.create("/c/")?;
///
/// assert_eq!(tree.list("/")?, "a,c");
/// assert_eq!(tree.create("/a/"), Err(TreeError::AlreadyExists));
///
/// tree.move_node("/a/b/", "/c/b/")?;
/// assert_eq!(tree.list("/a/")?, "");
/// assert_eq!(tree.list("/c/")?, "b");
///
/// assert_eq!(tree.move_node("/c/", "/c/b/c/"), Err(TreeError::CyclicMove));
/// # Ok::<(), TreeError>(())
/// ```
pub struct Tree {
    root: Arc<Node>,
}

impl Tree {
    /// Create a tree containing only the root directory `/`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::new_root(),
        }
    }

    /// List the immediate children of `path`, sorted and comma-joined.
    ///
    /// # Errors
    /// [`TreeError::NotFound`] if `path` is malformed or does not exist.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(self), err))]
    pub fn list(&self, path: &str) -> Result<String, TreeError> {
        let held: HeldNode = self.read(path)?;
        let listing: String = held.node().children().listing();

        Ok(listing)
    }

    /// List the immediate children of `path` as a sorted vector.
    ///
    /// # Errors
    /// Same as [`list`](Self::list).
    pub fn list_names(&self, path: &str) -> Result<Vec<String>, TreeError> {
        let held: HeldNode = self.read(path)?;
        let names: Vec<String> = held
            .node()
            .children()
            .sorted_names()
            .into_iter()
            .map(str::to_owned)
            .collect();

        Ok(names)
    }

    /// Check whether `path` names an existing directory.
    #[must_use]
    pub fn exists(&self, path: &str) -> bool {
        self.read(path).is_ok()
    }

    /// Create an empty directory at `path`.
    ///
    /// # Errors
    /// - [`TreeError::InvalidArgument`] if `path` is malformed or the root.
    /// - [`TreeError::NotFound`] if the parent does not exist.
    /// - [`TreeError::AlreadyExists`] if `path` already exists.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(self), err))]
    pub fn create(&self, path: &str) -> Result<(), TreeError> {
        if !path::is_valid(path) {
            return Err(TreeError::InvalidArgument);
        }
        let (parent_path, name) = path::parent_of(path).ok_or(TreeError::InvalidArgument)?;

        let parent: HeldNode = find_and_lock_writer(&self.root, parent_path)?;
        let mut children = parent.node().children_mut();

        if children.contains(name) {
            return Err(TreeError::AlreadyExists);
        }

        let inserted: bool = children.insert(name, Node::new_child(parent.node()));
        debug_assert!(inserted);
        debug_log!(path, "created");

        Ok(())
    }

    /// Remove the empty directory at `path`.
    ///
    /// # Errors
    /// - [`TreeError::InvalidArgument`] if `path` is malformed.
    /// - [`TreeError::Busy`] if `path` is the root.
    /// - [`TreeError::NotFound`] if `path` does not exist.
    /// - [`TreeError::DirectoryNotEmpty`] if the directory has children.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(self), err))]
    pub fn remove(&self, path: &str) -> Result<(), TreeError> {
        if !path::is_valid(path) {
            return Err(TreeError::InvalidArgument);
        }
        let (parent_path, name) = path::parent_of(path).ok_or(TreeError::Busy)?;

        let parent: HeldNode = find_and_lock_writer(&self.root, parent_path)?;
        let target: HeldNode = claim_child(&parent, name)?;

        if !target.node().children().is_empty() {
            return Err(TreeError::DirectoryNotEmpty);
        }

        let removed: Option<Arc<Node>> = parent.node().children_mut().remove(name);
        debug_assert!(removed.as_ref().is_some_and(|n| Arc::ptr_eq(n, target.node())));

        drop(target);
        drop(removed);
        debug_log!(path, "removed");

        Ok(())
    }

    /// Move the directory `source`, with its whole subtree, to `target`.
    ///
    /// Moving a path onto itself succeeds without doing anything.
    ///
    /// # Errors
    /// - [`TreeError::InvalidArgument`] if either path is malformed.
    /// - [`TreeError::Busy`] if `source` is the root, whatever `target` is.
    /// - [`TreeError::AlreadyExists`] if `target` is the root or exists.
    /// - [`TreeError::CyclicMove`] if `target` lies inside `source`.
    /// - [`TreeError::NotFound`] if `source` or the parent of `target` does
    ///   not exist.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip(self, source, target), fields(from = source, to = target), err)
    )]
    pub fn move_node(&self, source: &str, target: &str) -> Result<(), TreeError> {
        if !path::is_valid(source) || !path::is_valid(target) {
            return Err(TreeError::InvalidArgument);
        }
        if path::is_root(source) {
            return Err(TreeError::Busy);
        }
        if path::is_root(target) {
            return Err(TreeError::AlreadyExists);
        }
        if path::is_strict_descendant(target, source) {
            return Err(TreeError::CyclicMove);
        }
        if source == target {
            return Ok(());
        }

        let (_, source_name) = path::parent_of(source).ok_or(TreeError::Busy)?;
        let (_, target_name) = path::parent_of(target).ok_or(TreeError::AlreadyExists)?;

        let pair: PairLock = PairLock::acquire(&self.root, source, target)?;

        if pair.target_parent().children().contains(target_name) {
            return Err(TreeError::AlreadyExists);
        }

        // Nobody else is inside the common ancestor, so the two steps below
        // are observed as one.
        let moved: Arc<Node> = pair
            .source_parent()
            .children_mut()
            .remove(source_name)
            .ok_or(TreeError::NotFound)?;
        debug_assert!(Arc::ptr_eq(&moved, pair.source()));

        moved.set_parent(pair.target_parent());
        let inserted: bool = pair.target_parent().children_mut().insert(target_name, moved);
        debug_assert!(inserted);
        debug_log!(from = source, to = target, "moved");

        Ok(())
    }

    /// Check that no thread holds, waits for, or is present in any node, and
    /// that every parent link points at the directory owning the node.
    ///
    /// Only meaningful while no operation is running; intended for tests and
    /// diagnostics after concurrent workloads.
    #[must_use]
    pub fn is_quiescent(&self) -> bool {
        let mut pending: Vec<Arc<Node>> = vec![Arc::clone(&self.root)];

        while let Some(node) = pending.pop() {
            if !node.sync().is_idle() {
                return false;
            }

            let children = node.children();
            for (_, child) in children.iter() {
                if !child.has_parent(&node) {
                    return false;
                }
                pending.push(Arc::clone(child));
            }
        }

        true
    }

    /// Counters of the root's monitor.
    #[must_use]
    pub fn root_snapshot(&self) -> SyncSnapshot {
        self.root.sync().snapshot()
    }

    fn read(&self, path: &str) -> Result<HeldNode, TreeError> {
        if !path::is_valid(path) {
            return Err(TreeError::NotFound);
        }
        find_as_reader(&self.root, path)
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl StdFmt::Debug for Tree {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("Tree")
            .field("root", &self.root)
            .finish()
    }
}
