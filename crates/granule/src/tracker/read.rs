use std::borrow::Cow;
use std::cell::RefCell;

use granule_path::{join, parse_index, Path, PathSet, LENGTH_SEGMENT, SEPARATOR};
use serde_json::Value;

/// Records the leaf paths a read function dereferences.
///
/// Views are created lazily: nothing below the root is visited until the
/// read function navigates to it.
pub struct ReadTracker<'t> {
    tree: &'t Value,
    paths: RefCell<PathSet>,
}

impl<'t> ReadTracker<'t> {
    pub fn new(tree: &'t Value) -> Self {
        Self {
            tree,
            paths: RefCell::new(PathSet::new()),
        }
    }

    /// Tracked view of the tree root.
    pub fn view(&self) -> TrackedRead<'_> {
        TrackedRead {
            node: Some(Cow::Borrowed(self.tree)),
            path: Path::new(),
            log: &self.paths,
        }
    }

    /// Paths recorded so far.
    pub fn paths(&self) -> PathSet {
        self.paths.borrow().clone()
    }

    pub fn into_paths(self) -> PathSet {
        self.paths.into_inner()
    }
}

/// Runs `read` against a tracked view of `tree`.
///
/// Returns the read function's result together with the exact set of paths
/// whose primitive (or absent) value was dereferenced, plus `<array>.length`
/// for every array whose length was taken.
///
/// ```
/// use granule::tracker::track_read;
/// use serde_json::json;
///
/// let tree = json!({"a": {"b": 1}, "arr": [1, 2, 3], "theme": "dark"});
/// let (sum, paths) = track_read(&tree, |s| {
///     s.at("a.b").as_i64().unwrap_or(0) + s.key("arr").len() as i64
/// });
/// assert_eq!(sum, 4);
/// assert_eq!(paths.into_iter().collect::<Vec<_>>(), vec!["a.b", "arr.length"]);
/// ```
pub fn track_read<R>(tree: &Value, read: impl FnOnce(&TrackedRead<'_>) -> R) -> (R, PathSet) {
    let tracker = ReadTracker::new(tree);
    let result = read(&tracker.view());
    (result, tracker.into_paths())
}

/// A node of the tree seen through the read tracker.
///
/// Navigating to a child that is a primitive, or that does not exist,
/// records the child's path. Navigating to an object or array records
/// nothing; only further reads beneath it do.
#[derive(Clone)]
pub struct TrackedRead<'a> {
    node: Option<Cow<'a, Value>>,
    path: Path,
    log: &'a RefCell<PathSet>,
}

impl<'a> TrackedRead<'a> {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// `false` when the view points at a missing property.
    pub fn exists(&self) -> bool {
        self.node.is_some()
    }

    /// Child view for an object key, or an array index given as a decimal
    /// segment. `"length"` on an array is the same as [`len`](Self::len).
    pub fn key(&self, key: &str) -> TrackedRead<'a> {
        let child = match self.borrowed() {
            Some(Value::Object(map)) => map.get(key),
            Some(Value::Array(arr)) => {
                if key == LENGTH_SEGMENT {
                    return self.length_view(arr.len());
                }
                parse_index(key).and_then(|i| arr.get(i))
            }
            // Property access on a primitive or a missing value is not
            // observable.
            _ => return self.detached(join(&self.path, key)),
        };
        self.child(join(&self.path, key), child)
    }

    pub fn index(&self, index: usize) -> TrackedRead<'a> {
        self.key(&index.to_string())
    }

    /// Follows a dot path one segment at a time, recording like repeated
    /// [`key`](Self::key) calls would.
    pub fn at(&self, path: &str) -> TrackedRead<'a> {
        if path.is_empty() {
            return self.clone();
        }
        let mut current = self.clone();
        for segment in path.split(SEPARATOR) {
            current = current.key(segment);
        }
        current
    }

    /// Array length (recorded as `<path>.length`), object key count, or
    /// string char count.
    pub fn len(&self) -> usize {
        match self.node.as_deref() {
            Some(Value::Array(arr)) => {
                self.record(join(&self.path, LENGTH_SEGMENT));
                arr.len()
            }
            Some(Value::Object(map)) => map.len(),
            Some(Value::String(s)) => s.chars().count(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element views of an array. Reads the length first, as iterating a
    /// sequence does.
    pub fn iter(&self) -> impl Iterator<Item = TrackedRead<'a>> + '_ {
        let len = match self.node.as_deref() {
            Some(Value::Array(_)) => self.len(),
            _ => 0,
        };
        (0..len).map(move |i| self.index(i))
    }

    /// Keys of an object. Enumerating keys is not itself a dependency.
    pub fn keys(&self) -> Vec<&'a str> {
        match self.borrowed() {
            Some(Value::Object(map)) => map.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// `(key, child view)` pairs of an object.
    pub fn entries(&self) -> Vec<(&'a str, TrackedRead<'a>)> {
        self.keys()
            .into_iter()
            .map(|key| (key, self.key(key)))
            .collect()
    }

    /// Clones the node out of the tree and records the node's own path, so
    /// any change at or beneath it counts as a change to this read.
    pub fn snapshot(&self) -> Option<Value> {
        self.record(self.path.clone());
        self.node.as_deref().cloned()
    }

    /// Raw node, without recording anything.
    pub fn value(&self) -> Option<&Value> {
        self.node.as_deref()
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value().and_then(Value::as_str)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.value().and_then(Value::as_i64)
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.value().and_then(Value::as_u64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.value().and_then(Value::as_f64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.value().and_then(Value::as_bool)
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value(), Some(Value::Null))
    }

    pub fn is_object(&self) -> bool {
        matches!(self.value(), Some(Value::Object(_)))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.value(), Some(Value::Array(_)))
    }

    /// The node when it lives in the tree, as opposed to a synthesized
    /// length value.
    fn borrowed(&self) -> Option<&'a Value> {
        match &self.node {
            Some(Cow::Borrowed(value)) => Some(*value),
            _ => None,
        }
    }

    fn child(&self, path: Path, child: Option<&'a Value>) -> TrackedRead<'a> {
        match child {
            Some(value @ (Value::Object(_) | Value::Array(_))) => TrackedRead {
                node: Some(Cow::Borrowed(value)),
                path,
                log: self.log,
            },
            leaf => {
                self.record(path.clone());
                TrackedRead {
                    node: leaf.map(Cow::Borrowed),
                    path,
                    log: self.log,
                }
            }
        }
    }

    fn length_view(&self, len: usize) -> TrackedRead<'a> {
        let path = join(&self.path, LENGTH_SEGMENT);
        self.record(path.clone());
        TrackedRead {
            node: Some(Cow::Owned(Value::from(len))),
            path,
            log: self.log,
        }
    }

    fn detached(&self, path: Path) -> TrackedRead<'a> {
        TrackedRead {
            node: None,
            path,
            log: self.log,
        }
    }

    fn record(&self, path: Path) {
        self.log.borrow_mut().insert(path);
    }
}

impl std::fmt::Debug for TrackedRead<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedRead")
            .field("path", &self.path)
            .field("node", &self.node)
            .finish()
    }
}
