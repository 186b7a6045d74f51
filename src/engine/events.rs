//! Window event listener registry.
//!
//! Listeners are plain keys: the host dispatches each resize to every registered key and
//! the owner of a key decides what to do with it. Owners must `unsubscribe` on teardown.

use slotmap::SlotMap;

slotmap::new_key_type! {
    pub struct ListenerKey;
}

#[derive(Debug, Default)]
pub struct ResizeListeners {
    listeners: SlotMap<ListenerKey, &'static str>,
}

impl ResizeListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, owner: &'static str) -> ListenerKey {
        let key = self.listeners.insert(owner);
        tracing::debug!(owner, ?key, "resize listener added");
        key
    }

    /// Returns `false` if the key was already gone.
    pub fn unsubscribe(&mut self, key: ListenerKey) -> bool {
        match self.listeners.remove(key) {
            Some(owner) => {
                tracing::debug!(owner, ?key, "resize listener removed");
                true
            }
            None => false,
        }
    }

    pub fn is_subscribed(&self, key: ListenerKey) -> bool {
        self.listeners.contains_key(key)
    }

    /// Snapshot of current keys, safe to iterate while listeners unsubscribe.
    pub fn keys(&self) -> Vec<ListenerKey> {
        self.listeners.keys().collect()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_then_unsubscribe() {
        let mut l = ResizeListeners::new();
        let k = l.subscribe("panorama");
        assert!(l.is_subscribed(k));
        assert_eq!(l.keys(), vec![k]);

        assert!(l.unsubscribe(k));
        assert!(!l.is_subscribed(k));
        assert!(!l.unsubscribe(k));
        assert!(l.is_empty());
    }

    #[test]
    fn stale_key_does_not_alias_new_listener() {
        let mut l = ResizeListeners::new();
        let old = l.subscribe("a");
        l.unsubscribe(old);
        let new = l.subscribe("b");
        assert_ne!(old, new);
        assert!(!l.is_subscribed(old));
    }
}
