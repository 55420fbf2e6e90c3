use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use granule_path::{is_related_to_any, Path, PathSet};

use super::ObserverId;

pub(crate) type Listener = Rc<dyn Fn()>;

/// Observer callbacks, observer → paths, and the reverse path → observers
/// index.
///
/// Every path in an observer's set has that observer in its reverse entry,
/// and the reverse index never keeps a path with no observers.
#[derive(Default)]
pub(crate) struct Registry {
    listeners: BTreeMap<ObserverId, Listener>,
    path_map: BTreeMap<ObserverId, PathSet>,
    reverse: BTreeMap<Path, BTreeSet<ObserverId>>,
}

impl Registry {
    /// Registers `id` with an empty path set. An id that is already
    /// registered loses its old paths and callback.
    pub fn insert(&mut self, id: ObserverId, listener: Listener) {
        self.remove(id);
        self.listeners.insert(id, listener);
        self.path_map.insert(id, PathSet::new());
    }

    /// Drops the observer and its reverse entries. Returns `false` for an
    /// unknown id.
    pub fn remove(&mut self, id: ObserverId) -> bool {
        let Some(paths) = self.path_map.remove(&id) else {
            return false;
        };
        self.listeners.remove(&id);
        for path in &paths {
            self.unlink(path, id);
        }
        true
    }

    /// Replaces the observer's path set wholesale. Returns `false`, and does
    /// nothing, for an unknown id.
    pub fn update_paths(&mut self, id: ObserverId, paths: PathSet) -> bool {
        let Some(current) = self.path_map.get_mut(&id) else {
            return false;
        };
        let previous = std::mem::replace(current, paths);
        let next = &self.path_map[&id];
        let removed: Vec<Path> = previous.difference(next).cloned().collect();
        let added: Vec<Path> = next.difference(&previous).cloned().collect();
        for path in &removed {
            self.unlink(path, id);
        }
        for path in added {
            self.reverse.entry(path).or_default().insert(id);
        }
        true
    }

    pub fn contains(&self, id: ObserverId) -> bool {
        self.path_map.contains_key(&id)
    }

    pub fn paths(&self, id: ObserverId) -> Option<&PathSet> {
        self.path_map.get(&id)
    }

    pub fn listener(&self, id: ObserverId) -> Option<Listener> {
        self.listeners.get(&id).cloned()
    }

    /// Distinct paths with at least one observer.
    pub fn subscribed_paths(&self) -> PathSet {
        self.reverse.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.path_map.len()
    }

    /// Observers with a subscribed path related to some path in `changed`.
    ///
    /// Scans every subscribed path against the changed set. A segment trie
    /// would let ancestors and descendants be enumerated directly.
    pub fn affected(&self, changed: &PathSet) -> BTreeSet<ObserverId> {
        let mut notified = BTreeSet::new();
        for (path, observers) in &self.reverse {
            if is_related_to_any(path, changed) {
                notified.extend(observers.iter().copied());
            }
        }
        notified
    }

    fn unlink(&mut self, path: &str, id: ObserverId) {
        if let Some(observers) = self.reverse.get_mut(path) {
            observers.remove(&id);
            if observers.is_empty() {
                self.reverse.remove(path);
            }
        }
    }

    #[cfg(test)]
    fn assert_consistent(&self) {
        for (id, paths) in &self.path_map {
            assert!(self.listeners.contains_key(id));
            for path in paths {
                assert!(self.reverse[path].contains(id), "{id} missing under `{path}`");
            }
        }
        for (path, observers) in &self.reverse {
            assert!(!observers.is_empty(), "empty reverse entry `{path}`");
            for id in observers {
                assert!(self.path_map[id].contains(path));
            }
        }
        assert_eq!(self.listeners.len(), self.path_map.len());
    }
}
