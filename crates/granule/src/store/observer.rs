use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use super::{Store, StoreInner};

static NEXT_OBSERVER_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque observer identity.
///
/// Ids are only handed out by [`ObserverId::next`], so two live observers
/// never share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Allocates an id that no other call in this process returns.
    pub fn next() -> Self {
        Self(NEXT_OBSERVER_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

/// Handle returned by [`Store::subscribe_component`].
///
/// Dropping it leaves the observer registered; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
#[must_use = "dropping a Subscription does not unsubscribe"]
pub struct Subscription {
    id: ObserverId,
    store: Weak<StoreInner>,
}

impl Subscription {
    pub(super) fn new(id: ObserverId, store: &Rc<StoreInner>) -> Self {
        Self {
            id,
            store: Rc::downgrade(store),
        }
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Removes the observer and all of its path entries. No-op if the store
    /// is gone or the observer was already removed.
    pub fn unsubscribe(self) {
        if let Some(inner) = self.store.upgrade() {
            Store::from_inner(inner).unsubscribe_component(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = ObserverId::next();
        let b = ObserverId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_raw_roundtrip_and_display() {
        let id = ObserverId::from_raw(42);
        assert_eq!(id.as_u64(), 42);
        assert_eq!(id.to_string(), "observer#42");
    }
}
