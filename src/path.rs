//! Filepath: src/path.rs
//!
//! Path validation and splitting.
//!
//! A valid path is a `/`-separated sequence of directory names that starts
//! and ends with `/`. Names are 1 to [`MAX_NAME_LENGTH`] ASCII lowercase
//! letters, and the whole path is at most [`MAX_PATH_LENGTH`] bytes. The
//! single-character path `/` is the root.
//!
//! All helpers return subslices of their input; nothing here allocates.
//! Functions other than [`is_valid`] expect an already validated path.

/// Maximum length of a path in bytes.
pub const MAX_PATH_LENGTH: usize = 4095;

/// Maximum length of a single directory name.
pub const MAX_NAME_LENGTH: usize = 255;

/// The root path.
pub const ROOT: &str = "/";

/// Separator between path components.
const SEPARATOR: u8 = b'/';

/// Check whether `path` is a valid path.
///
/// ```rust
/// use dirtree::path::is_valid;
///
/// assert!(is_valid("/"));
/// assert!(is_valid("/a/bc/"));
/// assert!(!is_valid("/a"));
/// assert!(!is_valid("/a//b/"));
/// assert!(!is_valid("/A/"));
/// ```
#[must_use]
pub fn is_valid(path: &str) -> bool {
    let bytes: &[u8] = path.as_bytes();

    if bytes.is_empty() || bytes.len() > MAX_PATH_LENGTH {
        return false;
    }
    if bytes[0] != SEPARATOR || bytes[bytes.len() - 1] != SEPARATOR {
        return false;
    }
    if bytes.len() == 1 {
        return true;
    }

    // Between the leading and trailing separators every segment must be a
    // non-empty name of lowercase letters.
    bytes[1..bytes.len() - 1]
        .split(|&b| b == SEPARATOR)
        .all(|name| {
            (1..=MAX_NAME_LENGTH).contains(&name.len()) && name.iter().all(u8::is_ascii_lowercase)
        })
}

/// Check whether `path` is the root.
#[inline]
#[must_use]
pub fn is_root(path: &str) -> bool {
    path == ROOT
}

/// Split off the first component.
///
/// Returns `(name, rest)` where `rest` is again a valid path, or `None` for
/// the root.
///
/// ```rust
/// use dirtree::path::split_first;
///
/// assert_eq!(split_first("/a/b/"), Some(("a", "/b/")));
/// assert_eq!(split_first("/a/"), Some(("a", "/")));
/// assert_eq!(split_first("/"), None);
/// ```
#[must_use]
pub fn split_first(path: &str) -> Option<(&str, &str)> {
    let end: usize = path.get(1..)?.find('/')? + 1;

    if end == 1 {
        return None;
    }
    Some((&path[1..end], &path[end..]))
}

/// Split off the last component.
///
/// Returns `(parent_path, name)`, or `None` for the root.
///
/// ```rust
/// use dirtree::path::parent_of;
///
/// assert_eq!(parent_of("/a/b/"), Some(("/a/", "b")));
/// assert_eq!(parent_of("/a/"), Some(("/", "a")));
/// assert_eq!(parent_of("/"), None);
/// ```
#[must_use]
pub fn parent_of(path: &str) -> Option<(&str, &str)> {
    if path.len() < 2 {
        return None;
    }
    let trimmed: &str = &path[..path.len() - 1];
    let cut: usize = trimmed.rfind('/')? + 1;

    Some((&path[..cut], &trimmed[cut..]))
}

/// Iterate over the component names of a path, root first.
pub fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|name| !name.is_empty())
}

/// Number of components in a path (0 for the root).
#[must_use]
pub fn depth(path: &str) -> usize {
    components(path).count()
}

/// Check whether `path` lies strictly inside the subtree rooted at `ancestor`.
///
/// Component boundaries are respected because both paths end with `/`:
/// `/ab/` is not inside `/a/`.
#[must_use]
pub fn is_strict_descendant(path: &str, ancestor: &str) -> bool {
    path.len() > ancestor.len() && path.starts_with(ancestor)
}

/// The path of `path` as seen from `ancestor`.
///
/// `ancestor` must be an ancestor of (or equal to) `path`. The result is
/// again a valid path; it is the root when both are equal.
///
/// ```rust
/// use dirtree::path::relative_to;
///
/// assert_eq!(relative_to("/a/b/c/", "/a/"), "/b/c/");
/// assert_eq!(relative_to("/a/", "/a/"), "/");
/// ```
#[must_use]
pub fn relative_to<'a>(path: &'a str, ancestor: &str) -> &'a str {
    debug_assert!(path.starts_with(ancestor), "{ancestor} is not an ancestor of {path}");

    &path[ancestor.len() - 1..]
}

/// Lowest common ancestor of two paths.
///
/// Repeatedly trims the longer of the two candidates until they are equal.
/// Terminates because the root is an ancestor of everything.
///
/// ```rust
/// use dirtree::path::common_ancestor;
///
/// assert_eq!(common_ancestor("/a/b/c/", "/a/d/"), "/a/");
/// assert_eq!(common_ancestor("/a/b/", "/a/b/c/"), "/a/b/");
/// assert_eq!(common_ancestor("/x/", "/y/"), "/");
/// ```
#[must_use]
pub fn common_ancestor<'a>(a: &'a str, b: &str) -> &'a str {
    let mut left: &'a str = a;
    let mut right: &str = b;

    while left != right {
        if left.len() >= right.len() {
            left = parent_of(left).map_or(ROOT, |(parent, _)| parent);
        } else {
            right = parent_of(right).map_or(ROOT, |(parent, _)| parent);
        }
    }

    left
}
