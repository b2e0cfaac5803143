//! Observer fan-out for ownership and behavior changes.
//!
//! The registry only keeps `Weak` references, so dropping the last `Arc` of a
//! listener silently unregisters it. Handles are `slotmap` keys, so a stale
//! handle never removes a listener that later reused its slot.

use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};

use crate::sync::{ObjectId, PlayerId, StateIndex};

/// A sleeping object found away from where the owner said it rests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DesyncReport {
    /// Distance between the live position and the expected rest position.
    pub drift: f32,
    /// Angle (radians) between the live rotation and the expected rest rotation.
    pub angle: f32,
}

/// Callbacks run synchronously right after a change is applied locally.
///
/// Other clients apply the same change whenever their copy of the update
/// arrives; nothing here implies network-wide simultaneity.
pub trait SyncListener: Send + Sync {
    fn on_change_owner(&self, _object: ObjectId, _old: Option<PlayerId>, _new: Option<PlayerId>) {}

    fn on_change_state(&self, _object: ObjectId, _old: StateIndex, _new: StateIndex) {}

    fn on_desync(&self, _object: ObjectId, _report: DesyncReport) {}
}

new_key_type! {
    /// Registration handle. Stale after removal, even if the slot is reused.
    pub struct ListenerHandle;
}

#[derive(Default)]
pub struct ListenerRegistry {
    listeners: SlotMap<ListenerHandle, Weak<dyn SyncListener>>,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("live", &self.len())
            .finish()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<L: SyncListener + 'static>(&mut self, listener: &Arc<L>) -> ListenerHandle {
        let weak: Weak<L> = Arc::downgrade(listener);
        let weak: Weak<dyn SyncListener> = weak;
        self.listeners.insert(weak)
    }

    /// Returns `false` when the handle is stale or was already removed.
    pub fn remove(&mut self, handle: ListenerHandle) -> bool {
        self.listeners.remove(handle).is_some()
    }

    /// Number of registered listeners that are still alive.
    pub fn len(&self) -> usize {
        self.listeners
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn notify_owner(&mut self, object: ObjectId, old: Option<PlayerId>, new: Option<PlayerId>) {
        self.for_each(|listener| listener.on_change_owner(object, old, new));
    }

    pub fn notify_state(&mut self, object: ObjectId, old: StateIndex, new: StateIndex) {
        self.for_each(|listener| listener.on_change_state(object, old, new));
    }

    pub fn notify_desync(&mut self, object: ObjectId, report: DesyncReport) {
        self.for_each(|listener| listener.on_desync(object, report));
    }

    /// Calls `f` on every live listener and drops the dead ones.
    fn for_each(&mut self, mut f: impl FnMut(&dyn SyncListener)) {
        self.listeners.retain(|_, weak| match weak.upgrade() {
            Some(listener) => {
                f(listener.as_ref());
                true
            }
            None => false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ListenerEvent, RecordingListener};

    #[test]
    fn test_notifies_every_live_listener() {
        let mut registry = ListenerRegistry::new();
        let a = Arc::new(RecordingListener::default());
        let b = Arc::new(RecordingListener::default());
        registry.add(&a);
        registry.add(&b);

        registry.notify_owner(1, None, Some(2));
        registry.notify_state(1, 0, 3);

        for listener in [&a, &b] {
            assert_eq!(
                listener.events(),
                vec![
                    ListenerEvent::Owner(1, None, Some(2)),
                    ListenerEvent::State(1, 0, 3),
                ]
            );
        }
    }

    #[test]
    fn test_dropped_listener_is_pruned() {
        let mut registry = ListenerRegistry::new();
        let kept = Arc::new(RecordingListener::default());
        registry.add(&kept);
        {
            let dropped = Arc::new(RecordingListener::default());
            registry.add(&dropped);
            assert_eq!(registry.len(), 2);
        }

        registry.notify_state(9, 1, 2);

        assert_eq!(registry.len(), 1);
        assert_eq!(kept.events().len(), 1);
    }

    #[test]
    fn test_listeners_of_different_types_share_a_registry() {
        struct Counter(parking_lot::Mutex<u32>);
        impl SyncListener for Counter {
            fn on_change_state(&self, _object: ObjectId, _old: StateIndex, _new: StateIndex) {
                *self.0.lock() += 1;
            }
        }

        let mut registry = ListenerRegistry::new();
        let counter = Arc::new(Counter(parking_lot::Mutex::new(0)));
        let recorder = Arc::new(RecordingListener::default());
        let counter_handle = registry.add(&counter);
        registry.add(&recorder);

        registry.notify_state(2, 0, 1);
        assert!(registry.remove(counter_handle));
        registry.notify_state(2, 1, 0);

        assert_eq!(*counter.0.lock(), 1);
        assert_eq!(recorder.events().len(), 2);
    }

    #[test]
    fn test_registry_does_not_keep_listener_alive() {
        let mut registry = ListenerRegistry::new();
        let listener = Arc::new(RecordingListener::default());
        registry.add(&listener);
        assert_eq!(Arc::strong_count(&listener), 1);
    }

    #[test]
    fn test_remove_is_explicit_and_stale_handles_are_rejected() {
        let mut registry = ListenerRegistry::new();
        let first = Arc::new(RecordingListener::default());
        let handle = registry.add(&first);

        assert!(registry.remove(handle));
        assert!(!registry.remove(handle));

        // The freed slot is reused; the old handle must not remove the newcomer.
        let second = Arc::new(RecordingListener::default());
        let new_handle = registry.add(&second);
        assert_ne!(handle, new_handle);
        assert!(!registry.remove(handle));

        registry.notify_owner(4, Some(1), None);
        assert!(first.events().is_empty());
        assert_eq!(registry.len(), 1);
        assert_eq!(second.events(), vec![ListenerEvent::Owner(4, Some(1), None)]);
    }
}
