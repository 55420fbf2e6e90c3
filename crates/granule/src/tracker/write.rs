use std::cmp::Ordering;
use std::ops::{Bound, RangeBounds};

use granule_path::{join, join_index, parse_index, validate_path, Path, PathSet, SEPARATOR};
use serde_json::{Map, Value};

use crate::GranuleError;

/// How many nulls an index write past the end of an array may insert.
pub const MAX_ARRAY_PADDING: usize = 1 << 16;

/// Runs `mutate` against a draft of `tree` and returns its result together
/// with the set of paths it wrote.
///
/// Writes go straight to `tree`; there is no copy and no rollback, so if
/// `mutate` fails part-way the writes it already made stay applied and are
/// still reported.
///
/// ```
/// use granule::tracker::track_write;
/// use granule::GranuleError;
/// use serde_json::json;
///
/// let mut tree = json!({"user": {"name": "John", "age": 22}, "items": [1, 2]});
/// let (result, changed) = track_write(&mut tree, |s| {
///     s.key("user")?.set("age", 23)?;
///     s.key("items")?.push(3)?;
///     Ok::<(), GranuleError>(())
/// });
/// assert!(result.is_ok());
/// assert_eq!(changed.into_iter().collect::<Vec<_>>(), vec!["items", "user.age"]);
/// assert_eq!(tree["user"]["age"], json!(23));
/// ```
pub fn track_write<E>(
    tree: &mut Value,
    mutate: impl FnOnce(&mut Draft<'_>) -> Result<(), E>,
) -> (Result<(), E>, PathSet) {
    let mut changed = PathSet::new();
    let result = {
        let mut draft = Draft::new(tree, &mut changed);
        mutate(&mut draft)
    };
    (result, changed)
}

/// Mutable view of one node of the tree.
///
/// Property writes record the exact property path. Structural array
/// operations record the whole array path, since which indices they touch
/// is not known up front.
pub struct Draft<'a> {
    node: &'a mut Value,
    path: Path,
    changes: &'a mut PathSet,
}

impl<'a> Draft<'a> {
    pub fn new(tree: &'a mut Value, changes: &'a mut PathSet) -> Self {
        Self {
            node: tree,
            path: Path::new(),
            changes,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current value of this node. Reads inside a draft are not tracked.
    pub fn value(&self) -> &Value {
        self.node
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match &*self.node {
            Value::Object(map) => map.get(key),
            Value::Array(arr) => parse_index(key).and_then(|i| arr.get(i)),
            _ => None,
        }
    }

    /// Array or object length, or string char count.
    pub fn len(&self) -> usize {
        match &*self.node {
            Value::Array(arr) => arr.len(),
            Value::Object(map) => map.len(),
            Value::String(s) => s.chars().count(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Draft of an existing child: an object key, or an array index given
    /// as a decimal segment.
    pub fn key(&mut self, key: &str) -> Result<Draft<'_>, GranuleError> {
        self.reborrow().into_child(key)
    }

    pub fn index(&mut self, index: usize) -> Result<Draft<'_>, GranuleError> {
        let path = self.path.clone();
        match &mut *self.node {
            Value::Array(arr) => {
                let len = arr.len();
                match arr.get_mut(index) {
                    Some(node) => Ok(Draft {
                        node,
                        path: join_index(&path, index),
                        changes: &mut *self.changes,
                    }),
                    None => Err(GranuleError::IndexOutOfBounds { path, index, len }),
                }
            }
            _ => Err(GranuleError::NotArray(path)),
        }
    }

    /// Draft of the node at a dot path relative to this one.
    pub fn at(&mut self, path: &str) -> Result<Draft<'_>, GranuleError> {
        validate_path(path)?;
        let mut draft = self.reborrow();
        if path.is_empty() {
            return Ok(draft);
        }
        for segment in path.split(SEPARATOR) {
            draft = draft.into_child(segment)?;
        }
        Ok(draft)
    }

    /// Sets an object property, or an array element when `key` is an index.
    /// Returns the previous value.
    pub fn set(
        &mut self,
        key: &str,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, GranuleError> {
        match &mut *self.node {
            Value::Object(map) => {
                self.changes.insert(join(&self.path, key));
                Ok(map.insert(key.to_string(), value.into()))
            }
            Value::Array(_) => match parse_index(key) {
                Some(index) => self.set_index(index, value),
                None => Err(GranuleError::NotObject(self.path.clone())),
            },
            _ => Err(GranuleError::NotObject(self.path.clone())),
        }
    }

    /// Assigns an array element. Assigning past the end pads with nulls, up
    /// to [`MAX_ARRAY_PADDING`] of them.
    pub fn set_index(
        &mut self,
        index: usize,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, GranuleError> {
        let Value::Array(arr) = &mut *self.node else {
            return Err(GranuleError::NotArray(self.path.clone()));
        };
        let len = arr.len();
        if index >= len {
            if index - len > MAX_ARRAY_PADDING {
                return Err(GranuleError::IndexOutOfBounds {
                    path: self.path.clone(),
                    index,
                    len,
                });
            }
            self.changes.insert(join_index(&self.path, index));
            arr.resize(index, Value::Null);
            arr.push(value.into());
            return Ok(None);
        }
        self.changes.insert(join_index(&self.path, index));
        Ok(Some(std::mem::replace(&mut arr[index], value.into())))
    }

    /// Deletes an object property. On arrays the element is replaced with
    /// null and the length is kept.
    pub fn remove(&mut self, key: &str) -> Result<Option<Value>, GranuleError> {
        match &mut *self.node {
            Value::Object(map) => {
                self.changes.insert(join(&self.path, key));
                Ok(map.shift_remove(key))
            }
            Value::Array(arr) => {
                let index = parse_index(key)
                    .ok_or_else(|| GranuleError::NotObject(self.path.clone()))?;
                self.changes.insert(join_index(&self.path, index));
                Ok(arr
                    .get_mut(index)
                    .map(|slot| std::mem::replace(slot, Value::Null)))
            }
            _ => Err(GranuleError::NotObject(self.path.clone())),
        }
    }

    /// Replaces this node in its parent.
    pub fn assign(&mut self, value: impl Into<Value>) -> Result<Value, GranuleError> {
        if self.path.is_empty() {
            return Err(GranuleError::RootAssignment);
        }
        self.changes.insert(self.path.clone());
        Ok(std::mem::replace(self.node, value.into()))
    }

    /// Sets a property at a dot path relative to this node. The parent of the
    /// target must already exist.
    pub fn set_at(
        &mut self,
        path: &str,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, GranuleError> {
        validate_path(path)?;
        let (parent, key) = match path.rfind(SEPARATOR) {
            Some(i) => (&path[..i], &path[i + 1..]),
            None => ("", path),
        };
        if key.is_empty() {
            return Err(GranuleError::RootAssignment);
        }
        self.at(parent)?.set(key, value)
    }

    /// Appends to the array (`push`).
    pub fn push(&mut self, value: impl Into<Value>) -> Result<usize, GranuleError> {
        let arr = self.structural()?;
        arr.push(value.into());
        Ok(arr.len())
    }

    /// Removes the last element (`pop`).
    pub fn pop(&mut self) -> Result<Option<Value>, GranuleError> {
        Ok(self.structural()?.pop())
    }

    /// Removes the first element (`shift`).
    pub fn shift(&mut self) -> Result<Option<Value>, GranuleError> {
        let arr = self.structural()?;
        if arr.is_empty() {
            return Ok(None);
        }
        Ok(Some(arr.remove(0)))
    }

    /// Prepends to the array (`unshift`).
    pub fn unshift(&mut self, value: impl Into<Value>) -> Result<usize, GranuleError> {
        let arr = self.structural()?;
        arr.insert(0, value.into());
        Ok(arr.len())
    }

    /// Removes `delete_count` elements from `start` and inserts `items` in
    /// their place. Both bounds are clamped to the array. Returns the
    /// removed elements.
    pub fn splice<I>(
        &mut self,
        start: usize,
        delete_count: usize,
        items: I,
    ) -> Result<Vec<Value>, GranuleError>
    where
        I: IntoIterator<Item = Value>,
    {
        let arr = self.structural()?;
        let start = start.min(arr.len());
        let end = start.saturating_add(delete_count).min(arr.len());
        Ok(arr.splice(start..end, items).collect())
    }

    pub fn sort_by<F>(&mut self, compare: F) -> Result<(), GranuleError>
    where
        F: FnMut(&Value, &Value) -> Ordering,
    {
        self.structural()?.sort_by(compare);
        Ok(())
    }

    pub fn reverse(&mut self) -> Result<(), GranuleError> {
        self.structural()?.reverse();
        Ok(())
    }

    /// Copies `src` over the elements starting at `target`, without
    /// changing the length (`copyWithin`).
    pub fn copy_within<R>(&mut self, src: R, target: usize) -> Result<(), GranuleError>
    where
        R: RangeBounds<usize>,
    {
        let arr = self.structural()?;
        let (start, end) = clamp_range(&src, arr.len());
        let target = target.min(arr.len());
        let count = (end - start).min(arr.len() - target);
        let copied: Vec<Value> = arr[start..start + count].to_vec();
        for (offset, value) in copied.into_iter().enumerate() {
            arr[target + offset] = value;
        }
        Ok(())
    }

    /// Overwrites the elements in `range` with `value` (`fill`).
    pub fn fill<R>(&mut self, value: impl Into<Value>, range: R) -> Result<(), GranuleError>
    where
        R: RangeBounds<usize>,
    {
        let value = value.into();
        let arr = self.structural()?;
        let (start, end) = clamp_range(&range, arr.len());
        for slot in &mut arr[start..end] {
            *slot = value.clone();
        }
        Ok(())
    }

    pub fn truncate(&mut self, len: usize) -> Result<(), GranuleError> {
        self.structural()?.truncate(len);
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), GranuleError> {
        self.structural()?.clear();
        Ok(())
    }

    pub fn retain<F>(&mut self, keep: F) -> Result<(), GranuleError>
    where
        F: FnMut(&Value) -> bool,
    {
        self.structural()?.retain(keep);
        Ok(())
    }

    /// Object map of this node for bulk edits. The whole node is recorded
    /// as changed.
    pub fn object_mut(&mut self) -> Result<&mut Map<String, Value>, GranuleError> {
        match &mut *self.node {
            Value::Object(map) => {
                self.changes.insert(self.path.clone());
                Ok(map)
            }
            _ => Err(GranuleError::NotObject(self.path.clone())),
        }
    }

    fn structural(&mut self) -> Result<&mut Vec<Value>, GranuleError> {
        match &mut *self.node {
            Value::Array(arr) => {
                self.changes.insert(self.path.clone());
                Ok(arr)
            }
            _ => Err(GranuleError::NotArray(self.path.clone())),
        }
    }

    fn reborrow(&mut self) -> Draft<'_> {
        Draft {
            node: &mut *self.node,
            path: self.path.clone(),
            changes: &mut *self.changes,
        }
    }

    fn into_child(self, key: &str) -> Result<Draft<'a>, GranuleError> {
        let path = join(&self.path, key);
        let node = match self.node {
            Value::Object(map) => map.get_mut(key),
            Value::Array(arr) => parse_index(key).and_then(|i| arr.get_mut(i)),
            _ => return Err(GranuleError::NotObject(self.path)),
        };
        match node {
            Some(node) => Ok(Draft {
                node,
                path,
                changes: self.changes,
            }),
            None => Err(GranuleError::NotFound(path)),
        }
    }
}

fn clamp_range<R: RangeBounds<usize>>(range: &R, len: usize) -> (usize, usize) {
    let start = match range.start_bound() {
        Bound::Included(&s) => s,
        Bound::Excluded(&s) => s.saturating_add(1),
        Bound::Unbounded => 0,
    }
    .min(len);
    let end = match range.end_bound() {
        Bound::Included(&e) => e.saturating_add(1),
        Bound::Excluded(&e) => e,
        Bound::Unbounded => len,
    }
    .min(len);
    (start, end.max(start))
}

impl std::fmt::Debug for Draft<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Draft")
            .field("path", &self.path)
            .field("node", &self.node)
            .finish()
    }
}
