//! Selector bindings: the glue a UI layer uses to re-run a read whenever one
//! of the paths it last depended on changes.
//!
//! A [`Binding`] registers an observer, runs its selector through the read
//! tracker, and keeps the store's path set for that observer in step with
//! what the selector actually read. The `on_change` callback only signals;
//! the host calls [`Binding::evaluate`] when it is ready to re-read.

use std::fmt;

use granule_path::{Path, PathSet};
use serde_json::{Map, Value};
use tracing::debug;

use crate::store::{ObserverId, Store, Subscription};
use crate::tracker::TrackedRead;

type Selector<R> = Box<dyn Fn(&TrackedRead<'_>) -> R>;
type Equality<R> = Box<dyn Fn(&R, &R) -> bool>;

pub struct BindingOptions<R> {
    /// When it reports the new value equal to the previous one, the
    /// previous value is kept.
    pub is_equal: Option<Equality<R>>,
    /// Applied to the store with [`Store::enable_debug`] on subscribe and on
    /// every path change.
    pub debug: Option<bool>,
}

impl<R> Default for BindingOptions<R> {
    fn default() -> Self {
        Self {
            is_equal: None,
            debug: None,
        }
    }
}

impl<R> BindingOptions<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_equal(mut self, is_equal: impl Fn(&R, &R) -> bool + 'static) -> Self {
        self.is_equal = Some(Box::new(is_equal));
        self
    }

    pub fn debug(mut self, flag: bool) -> Self {
        self.debug = Some(flag);
        self
    }
}

/// A selector subscribed to a store.
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// use granule::{Binding, Store};
/// use serde_json::json;
///
/// let store = Store::new(json!({"todos": [{"done": true}, {"done": false}]}));
/// let dirty = Rc::new(Cell::new(false));
/// let flag = dirty.clone();
/// let mut remaining = Binding::new(
///     &store,
///     |s| s.key("todos").iter().filter(|t| t.key("done").as_bool() == Some(false)).count(),
///     move || flag.set(true),
/// );
/// assert_eq!(*remaining.value(), 1);
///
/// store.set(|s| s.at("todos.0")?.set("done", false).map(drop)).unwrap();
/// assert!(dirty.get());
/// assert_eq!(*remaining.evaluate(), 2);
/// ```
pub struct Binding<R> {
    store: Store,
    id: ObserverId,
    subscription: Option<Subscription>,
    selector: Selector<R>,
    is_equal: Option<Equality<R>>,
    debug: Option<bool>,
    paths: PathSet,
    value: R,
}

impl<R> Binding<R> {
    pub fn new(
        store: &Store,
        selector: impl Fn(&TrackedRead<'_>) -> R + 'static,
        on_change: impl Fn() + 'static,
    ) -> Self {
        Self::with_options(store, selector, on_change, BindingOptions::default())
    }

    /// Subscribes, evaluates the selector once and registers the paths it
    /// read.
    ///
    /// # Panics
    ///
    /// Panics when called from inside a mutate closure of `store`.
    pub fn with_options(
        store: &Store,
        selector: impl Fn(&TrackedRead<'_>) -> R + 'static,
        on_change: impl Fn() + 'static,
        options: BindingOptions<R>,
    ) -> Self {
        let id = ObserverId::next();
        let subscription = store.subscribe_component(id, on_change);
        if let Some(flag) = options.debug {
            store.enable_debug(flag);
        }
        let selector: Selector<R> = Box::new(selector);
        let (value, paths) = store.select(|view| selector(view));
        store.update_component_paths(id, paths.iter().cloned());
        Self {
            store: store.clone(),
            id,
            subscription: Some(subscription),
            selector,
            is_equal: options.is_equal,
            debug: options.debug,
            paths,
            value,
        }
    }

    /// Re-runs the selector. The store's path set for this binding is only
    /// touched when the paths read differ from last time.
    ///
    /// # Panics
    ///
    /// Panics when called from inside a mutate closure of the bound store.
    pub fn evaluate(&mut self) -> &R {
        let (value, paths) = self.store.select(|view| (self.selector)(view));
        if paths != self.paths {
            if self.store.is_debug_enabled() {
                debug!(
                    target: "granule::binding",
                    observer = %self.id,
                    paths = ?paths,
                    "selector dependencies changed"
                );
            }
            self.store
                .update_component_paths(self.id, paths.iter().cloned());
            if let Some(flag) = self.debug {
                self.store.enable_debug(flag);
            }
            self.paths = paths;
        }
        let keep = self
            .is_equal
            .as_ref()
            .is_some_and(|is_equal| is_equal(&self.value, &value));
        if !keep {
            self.value = value;
        }
        &self.value
    }

    /// Value from the last evaluation.
    pub fn value(&self) -> &R {
        &self.value
    }

    /// Paths read by the last evaluation.
    pub fn paths(&self) -> &PathSet {
        &self.paths
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}

impl Binding<Option<Value>> {
    /// Binds the value at a dot path; `None` while nothing is there.
    ///
    /// The whole value is a dependency, so a change anywhere beneath `path`
    /// triggers `on_change`.
    pub fn path(store: &Store, path: impl Into<Path>, on_change: impl Fn() + 'static) -> Self {
        let path = path.into();
        Self::with_options(
            store,
            move |view| view.at(&path).snapshot(),
            on_change,
            BindingOptions::new().is_equal(|a: &Option<Value>, b: &Option<Value>| a == b),
        )
    }
}

impl Binding<Map<String, Value>> {
    /// Binds a copy of selected keys of the object at `from`. Keys that are
    /// absent are left out of the copy but still depended on.
    pub fn pick<K>(
        store: &Store,
        from: impl Into<Path>,
        keys: &[K],
        on_change: impl Fn() + 'static,
    ) -> Self
    where
        K: AsRef<str>,
    {
        let from = from.into();
        let keys: Vec<String> = keys.iter().map(|k| k.as_ref().to_owned()).collect();
        let compared = keys.clone();
        Self::with_options(
            store,
            move |view| {
                let object = view.at(&from);
                let mut out = Map::new();
                for key in &keys {
                    if let Some(value) = object.key(key).snapshot() {
                        out.insert(key.clone(), value);
                    }
                }
                out
            },
            on_change,
            BindingOptions::new().is_equal(move |a: &Map<String, Value>, b: &Map<String, Value>| {
                compared.iter().all(|key| a.get(key) == b.get(key))
            }),
        )
    }
}

impl<R> Drop for Binding<R> {
    fn drop(&mut self) {
        self.store.clear_component_paths(self.id);
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

impl<R: fmt::Debug> fmt::Debug for Binding<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("id", &self.id)
            .field("paths", &self.paths)
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counter() -> (Rc<Cell<usize>>, impl Fn() + 'static) {
        let hits = Rc::new(Cell::new(0));
        let inc = hits.clone();
        (hits, move || inc.set(inc.get() + 1))
    }

    fn paths(binding: &Binding<impl Sized>) -> Vec<&str> {
        binding.paths().iter().map(String::as_str).collect()
    }

    #[test]
    fn test_initial_evaluation_registers_paths() {
        let store = Store::new(json!({"user": {"name": "John", "age": 22}}));
        let (_, on_change) = counter();
        let binding = Binding::new(
            &store,
            |s| s.at("user.name").as_str().map(str::to_owned),
            on_change,
        );
        assert_eq!(binding.value().as_deref(), Some("John"));
        assert_eq!(paths(&binding), vec!["user.name"]);
        assert_eq!(store.component_paths(binding.id()), Some(binding.paths().clone()));
    }

    #[test]
    fn test_dependencies_follow_branches() {
        let store = Store::new(json!({"show": false, "a": 1, "b": 2}));
        let (hits, on_change) = counter();
        let mut binding = Binding::new(
            &store,
            |s| {
                if s.key("show").as_bool() == Some(true) {
                    s.key("a").as_i64()
                } else {
                    s.key("b").as_i64()
                }
            },
            on_change,
        );
        assert_eq!(paths(&binding), vec!["b", "show"]);

        store.set(|s| s.set("a", 10).map(drop)).unwrap();
        assert_eq!(hits.get(), 0);

        store.set(|s| s.set("show", true).map(drop)).unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(*binding.evaluate(), Some(10));
        assert_eq!(paths(&binding), vec!["a", "show"]);

        store.set(|s| s.set("b", 20).map(drop)).unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_equality_keeps_previous_value() {
        let store = Store::new(json!({"n": 1}));
        let (_, on_change) = counter();
        let evaluations = Rc::new(Cell::new(0u32));
        let seen = evaluations.clone();
        let mut binding = Binding::with_options(
            &store,
            move |s| {
                seen.set(seen.get() + 1);
                (s.key("n").as_i64().unwrap_or(0) % 2, seen.get())
            },
            on_change,
            BindingOptions::new().is_equal(|a: &(i64, u32), b: &(i64, u32)| a.0 == b.0),
        );
        assert_eq!(*binding.value(), (1, 1));

        store.set(|s| s.set("n", 3).map(drop)).unwrap();
        assert_eq!(*binding.evaluate(), (1, 1));

        store.set(|s| s.set("n", 4).map(drop)).unwrap();
        assert_eq!(*binding.evaluate(), (0, 3));
        assert_eq!(evaluations.get(), 3);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let store = Store::new(json!({"a": 1}));
        let (hits, on_change) = counter();
        let binding = Binding::new(&store, |s| s.key("a").as_i64(), on_change);
        let id = binding.id();
        assert!(store.is_subscribed(id));
        drop(binding);
        assert!(!store.is_subscribed(id));
        assert!(store.subscribed_paths().is_empty());
        store.set(|s| s.set("a", 2).map(drop)).unwrap();
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_path_binding() {
        let store = Store::new(json!({"user": {"address": {"city": "Oslo"}}}));
        let (hits, on_change) = counter();
        let mut city = Binding::path(&store, "user.address", on_change);
        assert_eq!(*city.value(), Some(json!({"city": "Oslo"})));

        store
            .set(|s| s.at("user.address")?.set("city", "Bergen").map(drop))
            .unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(*city.evaluate(), Some(json!({"city": "Bergen"})));

        let (_, on_change) = counter();
        let missing = Binding::path(&store, "user.nickname", on_change);
        assert_eq!(*missing.value(), None);
    }

    #[test]
    fn test_pick_binding() {
        let store = Store::new(json!({"user": {"name": "John", "age": 22, "bio": "..."}}));
        let (hits, on_change) = counter();
        let mut picked = Binding::pick(&store, "user", &["name", "age", "email"], on_change);
        assert_eq!(Value::Object(picked.value().clone()), json!({"name": "John", "age": 22}));

        store.set(|s| s.key("user")?.set("bio", "hi").map(drop)).unwrap();
        assert_eq!(hits.get(), 0);

        store
            .set(|s| s.key("user")?.set("email", "j@x.io").map(drop))
            .unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(picked.evaluate().get("email"), Some(&json!("j@x.io")));
    }

    #[test]
    fn test_debug_option_applies_to_store() {
        let store = Store::new(json!({"a": 1}));
        let (_, on_change) = counter();
        let _binding = Binding::with_options(
            &store,
            |s| s.key("a").as_i64(),
            on_change,
            BindingOptions::new().debug(true),
        );
        assert!(store.is_debug_enabled());
    }
}
