//! Document change notifications.
//!
//! Provides `DocumentChangeEvent`, the `ChangeNotifier` seam sessions listen on,
//! and `EventBus`, the in-crate notifier hosts publish changes into.
//! Platform-specific implementations handle thread safety:
//! - Native: `Arc<EventBus>` with `RwLock` for multi-threaded Tokio runtime
//! - WASM: `Rc<EventBus>` with `RefCell` for single-threaded browser environment

use crate::document::DocumentUri;
use serde::Serialize;

/// A document in the workspace changed.
///
/// Emitted for every document, not just the ones with an open editor.
/// Listeners filter by `uri`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentChangeEvent {
    pub uri: DocumentUri,
}

impl DocumentChangeEvent {
    pub fn new(uri: impl Into<DocumentUri>) -> Self {
        Self { uri: uri.into() }
    }
}

/// Source of document change notifications.
///
/// The returned `Subscription` keeps the listener registered until it is
/// dropped or disposed.
pub trait ChangeNotifier {
    fn on_did_change(&self, listener: Listener) -> Subscription;
}

// ============================================================================
// Native (multi-threaded) implementation
// ============================================================================

#[cfg(not(target_arch = "wasm32"))]
mod platform {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, RwLock};

    /// Shared ownership for values captured by listeners.
    pub type Shared<T> = Arc<T>;

    /// Bound required of host capabilities captured by listeners.
    pub trait MaybeSync: Send + Sync {}
    impl<T: Send + Sync + ?Sized> MaybeSync for T {}

    pub type Listener = Box<dyn Fn(&DocumentChangeEvent) + Send + Sync>;

    type Disposer = Box<dyn FnOnce() + Send + Sync>;

    /// Subscription handle that unsubscribes automatically when dropped.
    ///
    /// Follows the disposer pattern: hold this value to keep receiving events,
    /// drop it (or call `dispose`) to unsubscribe.
    pub struct Subscription {
        pub(super) disposer: Option<Disposer>,
    }

    impl Subscription {
        pub fn new(disposer: impl FnOnce() + Send + Sync + 'static) -> Self {
            Self {
                disposer: Some(Box::new(disposer)),
            }
        }
    }

    /// Event bus for publishing document changes to subscribers.
    ///
    /// Thread-safe for use in multi-threaded Tokio runtime.
    /// Wrap in `Arc` to enable subscriptions.
    pub struct EventBus {
        listeners: RwLock<Vec<(usize, Arc<dyn Fn(&DocumentChangeEvent) + Send + Sync>)>>,
        next_id: AtomicUsize,
    }

    impl Default for EventBus {
        fn default() -> Self {
            Self {
                listeners: RwLock::new(Vec::new()),
                next_id: AtomicUsize::new(0),
            }
        }
    }

    impl EventBus {
        pub fn new() -> Self {
            Self::default()
        }

        /// Subscribe to change events. Returns `Subscription` that unsubscribes on drop.
        ///
        /// Requires `self` to be wrapped in `Arc`.
        pub fn subscribe(
            self: &Arc<Self>,
            listener: impl Fn(&DocumentChangeEvent) + Send + Sync + 'static,
        ) -> Subscription {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            self.listeners
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .push((id, Arc::new(listener)));

            let bus = Arc::downgrade(self);
            Subscription::new(move || {
                if let Some(bus) = bus.upgrade() {
                    bus.unsubscribe(id);
                }
            })
        }

        fn unsubscribe(&self, id: usize) {
            // emit releases the lock before calling listeners, so this cannot deadlock.
            self.listeners
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .retain(|(i, _)| *i != id);
        }

        /// Number of registered listeners.
        pub fn listener_count(&self) -> usize {
            self.listeners.read().unwrap_or_else(|e| e.into_inner()).len()
        }

        /// Deliver an event to all subscribers.
        pub fn emit(&self, event: &DocumentChangeEvent) {
            // Snapshot so a listener may subscribe or unsubscribe while we iterate.
            let listeners: Vec<_> = self
                .listeners
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .iter()
                .map(|(_, l)| Arc::clone(l))
                .collect();

            for listener in listeners {
                listener(event);
            }
        }
    }
}

// ============================================================================
// WASM (single-threaded) implementation
// ============================================================================

#[cfg(target_arch = "wasm32")]
mod platform {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Shared ownership for values captured by listeners.
    pub type Shared<T> = Rc<T>;

    /// Bound required of host capabilities captured by listeners.
    pub trait MaybeSync {}
    impl<T: ?Sized> MaybeSync for T {}

    pub type Listener = Box<dyn Fn(&DocumentChangeEvent)>;

    type Disposer = Box<dyn FnOnce()>;

    /// Subscription handle that unsubscribes automatically when dropped.
    ///
    /// Follows the disposer pattern: hold this value to keep receiving events,
    /// drop it (or call `dispose`) to unsubscribe.
    pub struct Subscription {
        pub(super) disposer: Option<Disposer>,
    }

    impl Subscription {
        pub fn new(disposer: impl FnOnce() + 'static) -> Self {
            Self {
                disposer: Some(Box::new(disposer)),
            }
        }
    }

    /// Event bus for publishing document changes to subscribers.
    ///
    /// Single-threaded for WASM browser environment.
    /// Wrap in `Rc` to enable subscriptions.
    pub struct EventBus {
        listeners: RefCell<Vec<(usize, Rc<dyn Fn(&DocumentChangeEvent)>)>>,
        next_id: Cell<usize>,
    }

    impl Default for EventBus {
        fn default() -> Self {
            Self {
                listeners: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
            }
        }
    }

    impl EventBus {
        pub fn new() -> Self {
            Self::default()
        }

        /// Subscribe to change events. Returns `Subscription` that unsubscribes on drop.
        ///
        /// Requires `self` to be wrapped in `Rc`.
        pub fn subscribe(
            self: &Rc<Self>,
            listener: impl Fn(&DocumentChangeEvent) + 'static,
        ) -> Subscription {
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            self.listeners.borrow_mut().push((id, Rc::new(listener)));

            let bus = Rc::downgrade(self);
            Subscription::new(move || {
                if let Some(bus) = bus.upgrade() {
                    bus.unsubscribe(id);
                }
            })
        }

        fn unsubscribe(&self, id: usize) {
            self.listeners.borrow_mut().retain(|(i, _)| *i != id);
        }

        /// Number of registered listeners.
        pub fn listener_count(&self) -> usize {
            self.listeners.borrow().len()
        }

        /// Deliver an event to all subscribers.
        pub fn emit(&self, event: &DocumentChangeEvent) {
            // Snapshot so a listener may subscribe or unsubscribe while we iterate.
            let listeners: Vec<_> = self
                .listeners
                .borrow()
                .iter()
                .map(|(_, l)| Rc::clone(l))
                .collect();

            for listener in listeners {
                listener(event);
            }
        }
    }
}

pub use platform::*;

impl Subscription {
    /// Unsubscribe now instead of waiting for drop.
    pub fn dispose(mut self) {
        if let Some(disposer) = self.disposer.take() {
            disposer();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(disposer) = self.disposer.take() {
            disposer();
        }
    }
}

impl ChangeNotifier for Shared<EventBus> {
    fn on_did_change(&self, listener: Listener) -> Subscription {
        self.subscribe(move |event| listener(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        (Arc::clone(&count), count)
    }

    #[test]
    fn test_subscribe_and_emit() {
        let bus = Shared::new(EventBus::new());
        let (count, count_clone) = counter();

        let _sub = bus.subscribe(move |_event| {
            count_clone.fetch_add(1, Ordering::Relaxed);
        });

        bus.emit(&DocumentChangeEvent::new("file:///a.cscratch"));

        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_subscription_unsubscribes_on_drop() {
        let bus = Shared::new(EventBus::new());
        let (count, count_clone) = counter();

        {
            let _sub = bus.subscribe(move |_event| {
                count_clone.fetch_add(1, Ordering::Relaxed);
            });
            bus.emit(&DocumentChangeEvent::new("file:///a.cscratch"));
            assert_eq!(count.load(Ordering::Relaxed), 1);
        }

        bus.emit(&DocumentChangeEvent::new("file:///a.cscratch"));

        assert_eq!(count.load(Ordering::Relaxed), 1);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn test_dispose_unsubscribes() {
        let bus = Shared::new(EventBus::new());
        let (count, count_clone) = counter();
        let (other, other_clone) = counter();

        let sub = bus.subscribe(move |_| {
            count_clone.fetch_add(1, Ordering::Relaxed);
        });
        let _other = bus.subscribe(move |_| {
            other_clone.fetch_add(1, Ordering::Relaxed);
        });

        sub.dispose();
        bus.emit(&DocumentChangeEvent::new("file:///a.cscratch"));

        assert_eq!(count.load(Ordering::Relaxed), 0);
        assert_eq!(other.load(Ordering::Relaxed), 1);
        assert_eq!(bus.listener_count(), 1);
    }

    #[test]
    fn test_subscription_outliving_bus_is_harmless() {
        let bus = Shared::new(EventBus::new());
        let sub = bus.subscribe(|_| {});
        drop(bus);
        drop(sub);
    }

    #[test]
    fn test_change_notifier_delivers_event() {
        let bus = Shared::new(EventBus::new());
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        let _sub = bus.on_did_change(Box::new(move |event: &DocumentChangeEvent| {
            seen_clone.lock().unwrap().push(event.uri.to_string());
        }));

        bus.emit(&DocumentChangeEvent::new("file:///b.cscratch"));

        assert_eq!(*seen.lock().unwrap(), vec!["file:///b.cscratch".to_string()]);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_unsubscribe_during_concurrent_emit() {
        use std::sync::atomic::AtomicBool;

        let bus = Shared::new(EventBus::new());
        let stop = Arc::new(AtomicBool::new(false));

        let emitters: Vec<_> = (0..8)
            .map(|_| {
                let bus = Shared::clone(&bus);
                let stop = Arc::clone(&stop);
                std::thread::spawn(move || {
                    while !stop.load(Ordering::Relaxed) {
                        bus.emit(&DocumentChangeEvent::new("file:///a.cscratch"));
                        let _ = bus.listener_count();
                    }
                })
            })
            .collect();

        for i in 0..2000 {
            let sub = bus.subscribe(|_| {});
            if i % 2 == 0 {
                sub.dispose();
            } else {
                drop(sub);
            }
        }

        stop.store(true, Ordering::Relaxed);
        for emitter in emitters {
            emitter.join().unwrap();
        }

        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn test_change_event_serialization() {
        let json = serde_json::to_string(&DocumentChangeEvent::new("file:///a.cscratch")).unwrap();
        assert_eq!(json, r#"{"uri":"file:///a.cscratch"}"#);
    }
}
