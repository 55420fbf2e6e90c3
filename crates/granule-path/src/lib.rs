//! Dot-delimited paths into a JSON state tree.
//!
//! A path names a property chain from the tree root, e.g. `"user.name"` or
//! `"items.3.value"`. Array indices are rendered as decimal segments and the
//! empty string is the root itself.
//!
//! Two paths are *related* when they are equal or one is a dot-delimited
//! prefix of the other. `"user"` is related to `"user.name"` but not to
//! `"userName"`.
//!
//! # Example
//!
//! ```
//! use granule_path::{format_path, get, is_related, join, parse_path};
//!
//! let path = join("items", "0");
//! assert_eq!(path, "items.0");
//! assert_eq!(parse_path("items.0.value"), vec!["items", "0", "value"]);
//! assert_eq!(format_path(&["a".to_string(), "b".to_string()]), "a.b");
//!
//! assert!(is_related("items", "items.0.value"));
//! assert!(!is_related("items.0", "items.1"));
//!
//! let doc = serde_json::json!({"items": [{"value": 7}]});
//! assert_eq!(get(&doc, "items.0.value"), Some(&serde_json::json!(7)));
//! ```

use std::collections::BTreeSet;

use thiserror::Error;

mod get;
pub mod validate;

pub use get::{get, get_mut, get_segments};
pub use validate::{validate_path, MAX_PATH_DEPTH, MAX_PATH_LENGTH};

/// Segment separator.
pub const SEPARATOR: char = '.';

/// Segment a sequence exposes for its element count.
pub const LENGTH_SEGMENT: &str = "length";

/// Root-relative dot path.
pub type Path = String;

/// Ordered, de-duplicated set of paths.
pub type PathSet = BTreeSet<Path>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("root path has no parent")]
    NoParent,
    #[error("empty segment in path `{0}`")]
    EmptySegment(String),
    #[error("path exceeds the maximum length")]
    TooLong,
    #[error("path exceeds the maximum depth")]
    TooDeep,
}

/// Appends `segment` to `base`.
///
/// ```
/// use granule_path::join;
///
/// assert_eq!(join("", "user"), "user");
/// assert_eq!(join("user", "name"), "user.name");
/// ```
pub fn join(base: &str, segment: &str) -> Path {
    if base.is_empty() {
        return segment.to_string();
    }
    let mut out = String::with_capacity(base.len() + 1 + segment.len());
    out.push_str(base);
    out.push(SEPARATOR);
    out.push_str(segment);
    out
}

/// Appends a decimal array index to `base`.
pub fn join_index(base: &str, index: usize) -> Path {
    join(base, &index.to_string())
}

/// Splits a path into its segments. The root path has none.
///
/// ```
/// use granule_path::parse_path;
///
/// assert_eq!(parse_path(""), Vec::<String>::new());
/// assert_eq!(parse_path("a.0.b"), vec!["a", "0", "b"]);
/// ```
pub fn parse_path(path: &str) -> Vec<String> {
    if path.is_empty() {
        return Vec::new();
    }
    path.split(SEPARATOR).map(str::to_string).collect()
}

/// Joins segments back into a path.
pub fn format_path<S: AsRef<str>>(segments: &[S]) -> Path {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push(SEPARATOR);
        }
        out.push_str(segment.as_ref());
    }
    out
}

pub fn is_root(path: &str) -> bool {
    path.is_empty()
}

/// Returns `true` if `ancestor` is a strict dot-prefix of `descendant`.
///
/// The root path is an ancestor of every other path.
///
/// ```
/// use granule_path::is_ancestor;
///
/// assert!(is_ancestor("user", "user.name"));
/// assert!(is_ancestor("", "user"));
/// assert!(!is_ancestor("user", "userName"));
/// assert!(!is_ancestor("user", "user"));
/// ```
pub fn is_ancestor(ancestor: &str, descendant: &str) -> bool {
    if ancestor.is_empty() {
        return !descendant.is_empty();
    }
    descendant.len() > ancestor.len()
        && descendant.starts_with(ancestor)
        && descendant.as_bytes()[ancestor.len()] == SEPARATOR as u8
}

/// Returns `true` if the paths are equal or one is an ancestor of the other.
pub fn is_related(a: &str, b: &str) -> bool {
    a == b || is_ancestor(a, b) || is_ancestor(b, a)
}

/// Returns `true` if any path in `set` is related to `path`.
pub fn is_related_to_any<'a, I>(path: &str, set: I) -> bool
where
    I: IntoIterator<Item = &'a Path>,
{
    set.into_iter().any(|other| is_related(path, other))
}

/// Parent of a path; the parent of a top-level key is the root.
///
/// ```
/// use granule_path::parent;
///
/// assert_eq!(parent("a.b.c").unwrap(), "a.b");
/// assert_eq!(parent("a").unwrap(), "");
/// assert!(parent("").is_err());
/// ```
pub fn parent(path: &str) -> Result<&str, PathError> {
    if path.is_empty() {
        return Err(PathError::NoParent);
    }
    Ok(path.rfind(SEPARATOR).map_or("", |i| &path[..i]))
}

/// Last segment of a path, or `None` for the root.
pub fn last_segment(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    Some(path.rfind(SEPARATOR).map_or(path, |i| &path[i + 1..]))
}

/// Check if a segment is a canonical non-negative array index.
///
/// ```
/// use granule_path::is_valid_index;
///
/// assert!(is_valid_index("0"));
/// assert!(is_valid_index("123"));
/// assert!(!is_valid_index("01"));
/// assert!(!is_valid_index("-1"));
/// assert!(!is_valid_index("length"));
/// ```
pub fn is_valid_index(segment: &str) -> bool {
    if segment.is_empty() {
        return false;
    }
    let bytes = segment.as_bytes();
    if bytes.len() > 1 && bytes[0] == b'0' {
        return false;
    }
    bytes.iter().all(|&b| b.is_ascii_digit())
}

/// Parses a segment as an array index.
pub fn parse_index(segment: &str) -> Option<usize> {
    if !is_valid_index(segment) {
        return None;
    }
    segment.parse().ok()
}
