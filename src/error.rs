//! Filepath: src/error.rs
//!
//! Error taxonomy for tree operations.
//!
//! Every failure is returned as an ordinary [`Result`] value. Lock and
//! condition variable failures cannot surface here: `parking_lot` primitives
//! do not poison, so a broken invariant is a panic, never an error value.

use std::fmt as StdFmt;

/// Integer code reported for a move into the source's own subtree.
///
/// There is no POSIX equivalent; the value is the one the C interface of this
/// tree has always used.
pub const CYCLIC_MOVE_CODE: i32 = -9;

// ============================================================================
//  TreeError
// ============================================================================

/// Errors returned by [`Tree`](crate::Tree) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeError {
    /// A path component does not exist.
    NotFound,

    /// The target of `create`/`move` already exists, or the target is the root.
    AlreadyExists,

    /// `remove` on a directory that still has children.
    DirectoryNotEmpty,

    /// A structural operation targeted the root, which can never be removed
    /// or relocated.
    Busy,

    /// Malformed path string.
    InvalidArgument,

    /// Attempt to move a node into its own subtree.
    CyclicMove,
}

impl TreeError {
    /// Integer error code matching the `errno` values of the C interface.
    ///
    /// ```rust
    /// use dirtree::TreeError;
    ///
    /// assert_eq!(TreeError::NotFound.errno(), 2);
    /// assert_eq!(TreeError::CyclicMove.errno(), -9);
    /// ```
    #[must_use]
    pub const fn errno(self) -> i32 {
        match self {
            Self::NotFound => 2,
            Self::Busy => 16,
            Self::AlreadyExists => 17,
            Self::InvalidArgument => 22,
            Self::DirectoryNotEmpty => 39,
            Self::CyclicMove => CYCLIC_MOVE_CODE,
        }
    }
}

impl StdFmt::Display for TreeError {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        match self {
            Self::NotFound => write!(f, "no such directory"),

            Self::AlreadyExists => write!(f, "directory already exists"),

            Self::DirectoryNotEmpty => write!(f, "directory not empty"),

            Self::Busy => write!(f, "the root directory cannot be removed or moved"),

            Self::InvalidArgument => write!(f, "invalid path"),

            Self::CyclicMove => {
                write!(f, "cannot move a directory into its own subtree")
            }
        }
    }
}

impl std::error::Error for TreeError {}
