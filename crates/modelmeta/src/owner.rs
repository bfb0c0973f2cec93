//! Owner capability: identity, type discriminator, post-save notification

use std::fmt;

/// Callback run after the owner's own write succeeded, with its persisted id.
/// Returns whether the listener's own work succeeded.
pub type SaveListener = Box<dyn FnMut(i64) -> bool>;

/// An entity that metadata can be attached to
pub trait MetadataOwner {
    /// Kind name of the owner; mapped to the stored discriminator through
    /// [`OwnerTypeMap`](modelmeta_common::OwnerTypeMap)
    fn owner_kind(&self) -> &str;

    /// Store-assigned id, `None` until the owner is first persisted
    fn persisted_id(&self) -> Option<i64>;

    /// Register a callback to run after every successful save
    fn register_save_listener(&mut self, listener: SaveListener);
}

/// Listener registry an owner can embed to implement
/// [`MetadataOwner::register_save_listener`]
#[derive(Default)]
pub struct SaveListeners {
    listeners: Vec<SaveListener>,
}

impl SaveListeners {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: SaveListener) {
        self.listeners.push(listener);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Call once the owner's storage write has succeeded, never before.
    /// Every listener runs; returns true only if all of them succeeded.
    pub fn notify_saved(&mut self, id: i64) -> bool {
        let mut ok = true;
        for listener in &mut self.listeners {
            ok &= listener(id);
        }
        ok
    }
}

impl fmt::Debug for SaveListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveListeners")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_notify_runs_every_listener() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut listeners = SaveListeners::new();

        let log = Rc::clone(&seen);
        listeners.register(Box::new(move |id| {
            log.borrow_mut().push(("first", id));
            false
        }));
        let log = Rc::clone(&seen);
        listeners.register(Box::new(move |id| {
            log.borrow_mut().push(("second", id));
            true
        }));

        assert_eq!(listeners.len(), 2);
        assert!(!listeners.notify_saved(9));
        assert_eq!(*seen.borrow(), vec![("first", 9), ("second", 9)]);
    }

    #[test]
    fn test_notify_without_listeners() {
        let mut listeners = SaveListeners::new();
        assert!(listeners.is_empty());
        assert!(listeners.notify_saved(1));
    }
}
