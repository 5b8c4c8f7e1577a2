//! Filepath: src/children.rs
//!
//! Child directory container and listing formatter.
//!
//! [`Children`] maps unique names to child handles. It carries no
//! synchronization of its own: the owning node's protocol decides who may
//! read or mutate it.

use std::collections::HashMap;

/// Separator placed between names in a listing.
pub const LISTING_SEPARATOR: char = ',';

// ============================================================================
//  Children
// ============================================================================

/// A mapping from child name to child handle. Names are unique.
///
/// # Example
///
/// ```rust
/// use dirtree::children::Children;
///
/// let mut dir: Children<u32> = Children::new();
/// assert!(dir.insert("b", 1));
/// assert!(dir.insert("a", 2));
/// assert!(!dir.insert("a", 3));
///
/// assert_eq!(dir.get("a"), Some(&2));
/// assert_eq!(dir.listing(), "a,b");
/// ```
#[derive(Debug, Clone)]
pub struct Children<T> {
    entries: HashMap<String, T>,
}

impl<T> Children<T> {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Insert `value` under `name` unless the name is taken.
    ///
    /// Returns `false` (and drops `value`) when `name` already exists.
    pub fn insert(&mut self, name: &str, value: T) -> bool {
        if self.entries.contains_key(name) {
            return false;
        }
        self.entries.insert(name.to_owned(), value);
        true
    }

    /// Look up a child by name.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.get(name)
    }

    /// Check whether a child with `name` exists.
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Remove a child, returning its handle.
    pub fn remove(&mut self, name: &str) -> Option<T> {
        self.entries.remove(name)
    }

    /// Number of children.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the directory has no children.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, child)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Remove every child, yielding the handles.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.entries.drain().map(|(_, value)| value)
    }

    /// Child names in lexicographic order.
    #[must_use]
    pub fn sorted_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Render the sorted child names as a single comma-joined string.
    #[must_use]
    pub fn listing(&self) -> String {
        format_listing(self.entries.keys().map(String::as_str))
    }
}

impl<T> Default for Children<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Render names sorted and joined by [`LISTING_SEPARATOR`].
///
/// An empty set yields an empty string; there is no trailing separator.
///
/// ```rust
/// use dirtree::children::format_listing;
///
/// assert_eq!(format_listing(["c", "a", "b"]), "a,b,c");
/// assert_eq!(format_listing(std::iter::empty::<&str>()), "");
/// ```
pub fn format_listing<'a, I>(names: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut sorted: Vec<&str> = names.into_iter().collect();
    sorted.sort_unstable();

    let capacity: usize = sorted.iter().map(|name| name.len() + 1).sum();
    let mut out = String::with_capacity(capacity);

    for (i, name) in sorted.iter().enumerate() {
        if i > 0 {
            out.push(LISTING_SEPARATOR);
        }
        out.push_str(name);
    }

    out
}
