//! Path-indexed subscription registry over a single shared tree.
//!
//! A [`Store`] owns the tree, a map from each observer to the paths it last
//! read, and the reverse index from path to observers. [`Store::set`] runs a
//! mutation through the write tracker and synchronously notifies every
//! observer holding a path related to one that changed.

mod observer;
mod registry;

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use granule_path::{Path, PathSet};
use serde_json::Value;
use tracing::debug;

use crate::config::StoreConfig;
use crate::tracker::{track_read, track_write, Draft, TrackedRead};
use crate::GranuleError;

pub use observer::{ObserverId, Subscription};
use registry::Registry;

/// Handle to a store. Clones share the same tree and registry.
///
/// Single-threaded: the handle is `!Send`, and callbacks run on the thread
/// that calls [`set`](Self::set).
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// use granule::{ObserverId, Store};
/// use serde_json::json;
///
/// let store = Store::new(json!({"user": {"name": "John", "age": 22}, "theme": "dark"}));
/// let hits = Rc::new(Cell::new(0));
/// let id = ObserverId::next();
///
/// let counter = hits.clone();
/// let _sub = store.subscribe_component(id, move || counter.set(counter.get() + 1));
/// store.update_component_paths(id, ["user.name"]);
///
/// store.set(|s| s.key("user")?.set("age", 23).map(drop)).unwrap();
/// assert_eq!(hits.get(), 0);
///
/// store.set(|s| s.key("user")?.set("name", "Jane").map(drop)).unwrap();
/// assert_eq!(hits.get(), 1);
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Rc<StoreInner>,
}

pub(crate) struct StoreInner {
    tree: RefCell<Value>,
    registry: RefCell<Registry>,
    debug: Cell<bool>,
    max_notify_depth: usize,
    notify_depth: Cell<usize>,
}

impl Store {
    pub fn new(tree: Value) -> Self {
        Self::with_config(tree, StoreConfig::default())
    }

    pub fn with_config(tree: Value, config: StoreConfig) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                tree: RefCell::new(tree),
                registry: RefCell::new(Registry::default()),
                debug: Cell::new(config.debug),
                max_notify_depth: config.max_notify_depth.max(1),
                notify_depth: Cell::new(0),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<StoreInner>) -> Self {
        Self { inner }
    }

    /// Borrows the live tree.
    ///
    /// # Panics
    ///
    /// Panics when called from inside a mutate closure. Use
    /// [`try_get`](Self::try_get) where that can happen.
    pub fn get(&self) -> Ref<'_, Value> {
        self.inner.tree.borrow()
    }

    pub fn try_get(&self) -> Result<Ref<'_, Value>, GranuleError> {
        self.inner
            .tree
            .try_borrow()
            .map_err(|_| GranuleError::MutationInProgress)
    }

    /// Runs `read` against the tree without tracking.
    pub fn read<R>(&self, read: impl FnOnce(&Value) -> R) -> R {
        read(&self.get())
    }

    /// Runs `select` through the read tracker and returns its result with the
    /// paths it depended on.
    pub fn select<R>(&self, select: impl FnOnce(&TrackedRead<'_>) -> R) -> (R, PathSet) {
        track_read(&self.get(), select)
    }

    /// Applies `mutate` to the tree in place, then notifies every observer
    /// whose paths relate to a changed path.
    ///
    /// If `mutate` fails, writes it made before failing stay applied and
    /// nobody is notified.
    pub fn set(
        &self,
        mutate: impl FnOnce(&mut Draft<'_>) -> Result<(), GranuleError>,
    ) -> Result<(), GranuleError> {
        self.try_set(mutate)
    }

    /// [`set`](Self::set) with a caller-defined error type.
    ///
    /// Fails with [`GranuleError::MutationInProgress`] when the tree is
    /// already borrowed, which is the case for a `set` issued from inside
    /// another mutate closure. Fails with
    /// [`GranuleError::NotifyDepthExceeded`] when a callback-driven chain of
    /// `set` calls nests deeper than the configured limit; the mutation has
    /// been applied by then, but its observers are not notified.
    pub fn try_set<E>(
        &self,
        mutate: impl FnOnce(&mut Draft<'_>) -> Result<(), E>,
    ) -> Result<(), E>
    where
        E: From<GranuleError>,
    {
        let changed = {
            let mut tree = self
                .inner
                .tree
                .try_borrow_mut()
                .map_err(|_| GranuleError::MutationInProgress)?;
            let (result, changed) = track_write(&mut tree, mutate);
            result?;
            changed
        };
        if self.is_debug_enabled() {
            debug!(target: "granule::store", changed = ?changed, "changed paths");
        }
        if changed.is_empty() {
            return Ok(());
        }
        self.notify(&changed)?;
        Ok(())
    }

    /// Registers `id` with an empty path set. Re-registering an id drops its
    /// previous paths and callback.
    pub fn subscribe_component(
        &self,
        id: ObserverId,
        on_change: impl Fn() + 'static,
    ) -> Subscription {
        self.inner
            .registry
            .borrow_mut()
            .insert(id, Rc::new(on_change));
        if self.is_debug_enabled() {
            debug!(target: "granule::store", observer = %id, "subscribed");
        }
        Subscription::new(id, &self.inner)
    }

    /// Removes `id` and all of its reverse-index entries. Returns `false` for
    /// an id that is not registered.
    pub fn unsubscribe_component(&self, id: ObserverId) -> bool {
        let removed = self.inner.registry.borrow_mut().remove(id);
        if removed && self.is_debug_enabled() {
            debug!(target: "granule::store", observer = %id, "unsubscribed");
        }
        removed
    }

    /// Replaces the path set of `id`. No-op for an unknown id.
    pub fn update_component_paths<I, P>(&self, id: ObserverId, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<Path>,
    {
        let paths: PathSet = paths.into_iter().map(Into::into).collect();
        let debug_paths = self.is_debug_enabled().then(|| paths.clone());
        if !self.inner.registry.borrow_mut().update_paths(id, paths) {
            return;
        }
        if let Some(paths) = debug_paths {
            debug!(target: "granule::store", observer = %id, paths = ?paths, "paths updated");
        }
    }

    pub fn clear_component_paths(&self, id: ObserverId) {
        self.update_component_paths(id, PathSet::new());
    }

    /// Turns debug tracing on or off for this store and its clones.
    pub fn enable_debug(&self, flag: bool) {
        self.inner.debug.set(flag);
    }

    pub fn is_debug_enabled(&self) -> bool {
        self.inner.debug.get()
    }

    pub fn max_notify_depth(&self) -> usize {
        self.inner.max_notify_depth
    }

    /// Current paths of `id`, or `None` if it is not registered.
    pub fn component_paths(&self, id: ObserverId) -> Option<PathSet> {
        self.inner.registry.borrow().paths(id).cloned()
    }

    pub fn is_subscribed(&self, id: ObserverId) -> bool {
        self.inner.registry.borrow().contains(id)
    }

    /// Distinct paths that at least one observer is subscribed to.
    pub fn subscribed_paths(&self) -> PathSet {
        self.inner.registry.borrow().subscribed_paths()
    }

    pub fn observer_count(&self) -> usize {
        self.inner.registry.borrow().len()
    }

    fn notify(&self, changed: &PathSet) -> Result<(), GranuleError> {
        let _depth = NotifyDepth::enter(&self.inner)?;
        let notified = self.inner.registry.borrow().affected(changed);
        if self.is_debug_enabled() {
            debug!(target: "granule::store", notified = ?notified, "notifying");
        }
        for id in notified {
            // Looked up per call: an earlier callback may have unsubscribed it.
            let listener = self.inner.registry.borrow().listener(id);
            if let Some(listener) = listener {
                listener();
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Store");
        match self.inner.tree.try_borrow() {
            Ok(tree) => out.field("tree", &*tree),
            Err(_) => out.field("tree", &"<mutating>"),
        };
        out.field("debug", &self.is_debug_enabled())
            .field("max_notify_depth", &self.inner.max_notify_depth)
            .finish_non_exhaustive()
    }
}

/// Counts nested notification passes; the count drops again when the pass
/// ends, including by unwinding out of a callback.
struct NotifyDepth<'a> {
    depth: &'a Cell<usize>,
}

impl<'a> NotifyDepth<'a> {
    fn enter(inner: &'a StoreInner) -> Result<Self, GranuleError> {
        let depth = inner.notify_depth.get() + 1;
        if depth > inner.max_notify_depth {
            return Err(GranuleError::NotifyDepthExceeded {
                limit: inner.max_notify_depth,
            });
        }
        inner.notify_depth.set(depth);
        Ok(Self {
            depth: &inner.notify_depth,
        })
    }
}

impl Drop for NotifyDepth<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);
    }
}
