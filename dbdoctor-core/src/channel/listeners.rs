//! Listener registry with identity-based removal.
//!
//! Listeners are stored in registration order and called in that order.
//! Dispatch works on a snapshot of the list, so a listener may subscribe or
//! dispose listeners (itself included) while an event is being delivered;
//! such changes take effect from the next event.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::error;

/// Callback receiving decoded events. An `Err` or a panic is logged and
/// otherwise ignored.
pub type Listener<E> = Arc<dyn Fn(&E) -> anyhow::Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Outcome of delivering one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

struct RegistryInner<E> {
    next_id: u64,
    entries: Vec<(ListenerId, Listener<E>)>,
}

/// Shared, ordered list of listeners. Cloning yields another handle to the
/// same list.
pub struct ListenerRegistry<E> {
    inner: Arc<Mutex<RegistryInner<E>>>,
}

trait Detach: Send + Sync {
    fn detach(&self, id: ListenerId) -> bool;
}

impl<E: 'static> Detach for Mutex<RegistryInner<E>> {
    fn detach(&self, id: ListenerId) -> bool {
        let mut inner = self.lock().unwrap_or_else(PoisonError::into_inner);
        let before = inner.entries.len();
        inner.entries.retain(|(entry_id, _)| *entry_id != id);
        inner.entries.len() != before
    }
}

/// Disposer returned by [`ListenerRegistry::subscribe`].
///
/// Dropping a `Subscription` does **not** remove the listener; call
/// [`dispose`](Subscription::dispose).
pub struct Subscription {
    id: ListenerId,
    registry: Weak<dyn Detach>,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Remove the listener this subscription was created for.
    ///
    /// Returns `true` if it was still registered. Calling it again, or after
    /// the registry is gone, is a no-op.
    pub fn dispose(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.detach(self.id),
            None => false,
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl<E: 'static> ListenerRegistry<E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryInner {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner<E>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `listener` and return its disposer.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = {
            let mut inner = self.lock();
            let id = ListenerId(inner.next_id);
            inner.next_id += 1;
            inner.entries.push((id, Arc::new(listener)));
            id
        };
        let registry: Weak<dyn Detach> = Arc::downgrade(&self.inner) as Weak<dyn Detach>;
        Subscription { id, registry }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every listener with `event`, in registration order.
    ///
    /// A failing or panicking listener is logged and does not stop the
    /// others.
    pub fn dispatch(&self, event: &E) -> DispatchReport {
        let snapshot: Vec<(ListenerId, Listener<E>)> = self.lock().entries.clone();

        let mut report = DispatchReport::default();
        for (id, listener) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    error!(listener = id.0, error = %e, "Event listener failed");
                }
                Err(payload) => {
                    report.failed += 1;
                    error!(
                        listener = id.0,
                        panic = panic_message(payload.as_ref()),
                        "Event listener panicked"
                    );
                }
            }
        }
        report
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

impl<E: 'static> Default for ListenerRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for ListenerRegistry<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recorder(
        log: &Arc<Mutex<Vec<String>>>,
        tag: &'static str,
    ) -> impl Fn(&u32) -> anyhow::Result<()> + use<> {
        let log = Arc::clone(log);
        move |event: &u32| {
            log.lock().unwrap().push(format!("{tag}:{event}"));
            Ok(())
        }
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let registry = ListenerRegistry::<u32>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.subscribe(recorder(&log, "a"));
        registry.subscribe(recorder(&log, "b"));
        registry.subscribe(recorder(&log, "c"));

        let report = registry.dispatch(&7);

        assert_eq!(report, DispatchReport { delivered: 3, failed: 0 });
        assert_eq!(*log.lock().unwrap(), vec!["a:7", "b:7", "c:7"]);
    }

    #[test]
    fn test_dispose_removes_only_that_listener() {
        let registry = ListenerRegistry::<u32>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = registry.subscribe(recorder(&log, "a"));
        registry.subscribe(recorder(&log, "b"));

        assert!(first.dispose());
        registry.dispatch(&1);

        assert_eq!(*log.lock().unwrap(), vec!["b:1"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let registry = ListenerRegistry::<u32>::new();
        let sub = registry.subscribe(|_| Ok(()));
        assert!(sub.dispose());
        assert!(!sub.dispose());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_same_closure_registered_twice_is_removed_once() {
        let registry = ListenerRegistry::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let make = || {
            let calls = Arc::clone(&calls);
            move |_: &u32| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<(), anyhow::Error>(())
            }
        };
        let first = registry.subscribe(make());
        registry.subscribe(make());

        first.dispose();
        registry.dispatch(&0);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failing_listener_does_not_block_later_ones() {
        let registry = ListenerRegistry::<u32>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.subscribe(|_| anyhow::bail!("listener exploded"));
        registry.subscribe(recorder(&log, "after"));

        let report = registry.dispatch(&3);

        assert_eq!(report, DispatchReport { delivered: 1, failed: 1 });
        assert_eq!(*log.lock().unwrap(), vec!["after:3"]);
    }

    #[test]
    fn test_panicking_listener_does_not_block_later_ones() {
        let registry = ListenerRegistry::<u32>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.subscribe(|event: &u32| -> anyhow::Result<()> {
            let empty: Vec<u32> = Vec::new();
            let value = empty[*event as usize];
            anyhow::ensure!(value == 0, "unreachable");
            Ok(())
        });
        registry.subscribe(recorder(&log, "after"));

        let report = registry.dispatch(&3);
        assert_eq!(report, DispatchReport { delivered: 1, failed: 1 });

        // The registry stays usable after a panic.
        let report = registry.dispatch(&4);
        assert_eq!(report, DispatchReport { delivered: 1, failed: 1 });
        assert_eq!(*log.lock().unwrap(), vec!["after:3", "after:4"]);
    }

    #[test]
    fn test_panic_message_reads_string_payloads() {
        let literal: Box<dyn Any + Send> = Box::new("static message");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        let other: Box<dyn Any + Send> = Box::new(7_u8);

        assert_eq!(panic_message(literal.as_ref()), "static message");
        assert_eq!(panic_message(owned.as_ref()), "owned message");
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }

    #[test]
    fn test_listener_may_dispose_itself_during_dispatch() {
        let registry = ListenerRegistry::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let sub = {
            let calls = Arc::clone(&calls);
            let slot = Arc::clone(&slot);
            registry.subscribe(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                if let Some(sub) = slot.lock().unwrap().as_ref() {
                    sub.dispose();
                }
                Ok(())
            })
        };
        *slot.lock().unwrap() = Some(sub);

        registry.dispatch(&1);
        registry.dispatch(&2);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_dispose_after_registry_dropped() {
        let registry = ListenerRegistry::<u32>::new();
        let sub = registry.subscribe(|_| Ok(()));
        drop(registry);
        assert!(!sub.dispose());
    }
}
