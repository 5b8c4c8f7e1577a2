//! # `dirtree`
//!
//! A concurrent, in-memory tree of named directories with per-node locking.
//!
//! Directories are addressed by absolute paths such as `/a/b/`: a leading and
//! trailing `/`, components of lowercase ASCII letters. Four operations are
//! offered:
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | [`Tree::list`] | sorted, comma-joined names of a directory's children |
//! | [`Tree::create`] | add an empty directory |
//! | [`Tree::remove`] | delete an empty directory |
//! | [`Tree::move_node`] | relocate a directory with its whole subtree |
//!
//! ## Thread Safety
//!
//! [`Tree`] is `Send + Sync`. Every operation takes `&self`:
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use dirtree::Tree;
//!
//! let tree = Arc::new(Tree::new());
//!
//! let handles: Vec<_> = ["a", "b", "c"]
//!     .into_iter()
//!     .map(|name| {
//!         let tree = Arc::clone(&tree);
//!         thread::spawn(move || tree.create(&format!("/{name}/")))
//!     })
//!     .collect();
//!
//! for h in handles {
//!     h.join().unwrap().unwrap();
//! }
//! assert_eq!(tree.list("/").unwrap(), "a,b,c");
//! ```
//!
//! ## Design
//!
//! Each directory carries a monitor ([`nodesync::NodeSync`]) with a shared
//! mode for lookups and an exclusive mode for mutations. Walking down a path
//! passes through each ancestor in shared mode and leaves a presence count
//! behind, so a writer on a directory waits until nobody is anywhere in its
//! subtree. Waiting writers close the door to new readers; a finishing writer
//! admits every queued reader as one batch.
//!
//! A move locks the nearest common ancestor of both parents exclusively and
//! then works below it, so concurrent operations see either the old or the
//! new location, never both or neither.
//!
//! ## Tracing
//!
//! Build with `--features tracing` to emit `tracing` events for descents and
//! operation outcomes. See `tracing_helpers` for details.

#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod tracing_helpers;

pub mod children;
pub mod error;
mod node;
pub mod nodesync;
pub mod path;
pub mod tree;

pub use error::TreeError;
pub use nodesync::SyncSnapshot;
pub use tree::Tree;
