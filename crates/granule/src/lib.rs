//! Fine-grained state observation over a shared JSON tree.
//!
//! Observers declare what they depend on by reading: a read function run
//! through the [read tracker](tracker::track_read) reports the exact leaf
//! paths it touched. Mutations run through the
//! [write tracker](tracker::track_write) report the paths they wrote. The
//! [`Store`] matches the two and calls back only the observers holding a
//! path equal to, above, or below a changed one.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use granule::{ObserverId, Store};
//! use serde_json::json;
//!
//! let store = Store::new(json!({"items": [{"value": 0}, {"value": 0}]}));
//! let seen = Rc::new(RefCell::new(Vec::new()));
//!
//! let (first, list) = (ObserverId::next(), ObserverId::next());
//! let log = seen.clone();
//! let _a = store.subscribe_component(first, move || log.borrow_mut().push("first"));
//! let log = seen.clone();
//! let _b = store.subscribe_component(list, move || log.borrow_mut().push("list"));
//!
//! let (_, paths) = store.select(|s| s.at("items.0.value").as_i64());
//! store.update_component_paths(first, paths);
//! store.update_component_paths(list, ["items"]);
//!
//! store.set(|s| s.key("items")?.push(json!({"value": 1})).map(drop)).unwrap();
//! assert_eq!(*seen.borrow(), vec!["list"]);
//!
//! seen.borrow_mut().clear();
//! store.set(|s| s.at("items.0")?.set("value", 5).map(drop)).unwrap();
//! assert_eq!(*seen.borrow(), vec!["first", "list"]);
//! ```

pub mod binding;
mod config;
mod error;
pub mod store;
pub mod tracker;

pub use binding::{Binding, BindingOptions};
pub use config::{StoreConfig, DEFAULT_MAX_NOTIFY_DEPTH, ENV_DEBUG, ENV_MAX_NOTIFY_DEPTH};
pub use error::GranuleError;
pub use granule_path::{is_related, Path, PathSet};
pub use store::{ObserverId, Store, Subscription};
