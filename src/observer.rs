use parking_lot::ReentrantMutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Receives every state change of the component it is subscribed to.
///
/// Called synchronously by whichever operation changed the state, never while
/// the component's own lock is held, so an observer may call back into it.
pub trait StateObserver<S: ?Sized>: Send + Sync {
    fn on_state_change(&self, state: &S);
}

impl<S: ?Sized, F> StateObserver<S> for F
where
    F: Fn(&S) + Send + Sync,
{
    fn on_state_change(&self, state: &S) {
        self(state)
    }
}

struct Entry<S: ?Sized> {
    id: u64,
    active: AtomicBool,
    observer: Box<dyn StateObserver<S>>,
}

struct Registry<S: ?Sized> {
    entries: Mutex<Vec<Arc<Entry<S>>>>,
    next_id: AtomicU64,
    delivered: AtomicU64,
    // one delivery round at a time; re-entrant so observers can cause nested rounds
    round: ReentrantMutex<()>,
}

trait Deregister: Send + Sync {
    fn deregister(&self, id: u64);
}

impl<S: ?Sized + 'static> Deregister for Registry<S> {
    fn deregister(&self, id: u64) {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.retain(|entry| {
            if entry.id == id {
                entry.active.store(false, Ordering::SeqCst);
                false
            } else {
                true
            }
        });
    }
}

/// Observer list owned by a component, handing out [`Subscription`] disposers.
pub struct ObserverRegistry<S: ?Sized + 'static> {
    inner: Arc<Registry<S>>,
}

impl<S: ?Sized + 'static> ObserverRegistry<S> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Registry {
                entries: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                delivered: AtomicU64::new(0),
                round: ReentrantMutex::new(()),
            }),
        }
    }

    pub fn subscribe<O>(&self, observer: O) -> Subscription
    where
        O: StateObserver<S> + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let entry = Arc::new(Entry {
            id,
            active: AtomicBool::new(true),
            observer: Box::new(observer),
        });
        self.entries().push(entry);

        let registry: Weak<dyn Deregister> = Arc::downgrade(&self.inner) as Weak<dyn Deregister>;
        Subscription { id, registry }
    }

    /// Deliver `state` to every current observer.
    ///
    /// `revision` must grow with every state change; a snapshot older than one
    /// already delivered is dropped instead of overwriting newer state.
    ///
    /// Rounds from different threads are serialized, so an observer is never
    /// called concurrently and never sees revisions go backwards. A round
    /// started from inside an observer on the same thread runs immediately and
    /// cuts the outer, older round short.
    pub fn notify(&self, revision: u64, state: &S) {
        let _round = self.inner.round.lock();
        let previous = self.inner.delivered.fetch_max(revision, Ordering::SeqCst);
        if previous >= revision {
            log::debug!("dropping stale snapshot r{revision}, already delivered r{previous}");
            return;
        }

        let entries: Vec<Arc<Entry<S>>> = self.entries().clone();
        for entry in entries {
            // A nested change made by an observer supersedes this round.
            if self.inner.delivered.load(Ordering::SeqCst) > revision {
                break;
            }
            // An earlier observer in this round may have unsubscribed this one.
            if entry.active.load(Ordering::SeqCst) {
                entry.observer.on_state_change(state);
            }
        }
    }

    pub fn clear(&self) {
        let mut entries = self.entries();
        for entry in entries.iter() {
            entry.active.store(false, Ordering::SeqCst);
        }
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, Vec<Arc<Entry<S>>>> {
        match self.inner.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<S: ?Sized + 'static> Default for ObserverRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Disposer returned by `subscribe`.
///
/// Dropping it does not unsubscribe; call [`Subscription::unsubscribe`].
#[must_use = "call unsubscribe() to stop receiving state changes"]
pub struct Subscription {
    id: u64,
    registry: Weak<dyn Deregister>,
}

impl Subscription {
    /// Stop delivering to this observer. Safe to call more than once, and
    /// after the owning component is gone.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.deregister(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
