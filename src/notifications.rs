use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::config::QueueSettings;
use crate::data_models::{Notification, NotificationId, NotificationPayload};
use crate::observer::{ObserverRegistry, StateObserver, Subscription};
use crate::timer::TimerTable;

struct QueueState {
    // newest first
    entries: Vec<Notification>,
    last_id: u64,
    revision: u64,
    closed: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    observers: ObserverRegistry<[Notification]>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Run `change` under the lock; broadcast only if it reports a change.
    fn commit<F>(&self, change: F) -> bool
    where
        F: FnOnce(&mut QueueState) -> bool,
    {
        let (revision, snapshot) = {
            let mut state = self.lock();
            if state.closed || !change(&mut state) {
                return false;
            }
            state.revision += 1;
            (state.revision, state.entries.clone())
        };
        self.observers.notify(revision, &snapshot);
        true
    }

    fn dismiss(&self, id: NotificationId) -> bool {
        self.commit(|state| match state.entries.iter_mut().find(|n| n.id == id) {
            Some(entry) if entry.visible => {
                entry.visible = false;
                true
            }
            _ => false,
        })
    }

    fn update(&self, id: NotificationId, payload: NotificationPayload) -> bool {
        self.commit(|state| match state.entries.iter_mut().find(|n| n.id == id) {
            Some(entry) => {
                entry.apply(payload);
                true
            }
            None => false,
        })
    }

    fn remove(&self, id: NotificationId) -> bool {
        let removed = self.commit(|state| {
            let before = state.entries.len();
            state.entries.retain(|n| n.id != id);
            state.entries.len() != before
        });
        if removed {
            log::debug!("notification {id} expired");
        }
        removed
    }
}

/// Bounded, time-limited list of toast notifications shared by a session.
///
/// Entries are kept newest first. Each one is removed a fixed lifetime after
/// it was enqueued whether or not it was dismissed; dismissing only hides it.
/// Overflow beyond the capacity evicts the oldest entries. Every change is
/// pushed synchronously to all subscribers before the call returns.
///
/// Removal fires on the runtime's timer at exactly `lifetime` after enqueue.
/// Another task woken at that same instant may still observe the entry once
/// before the removal task runs.
///
/// Share one instance through an `Arc`. It must be created inside a Tokio
/// runtime but can then be used from any thread, including ones outside the
/// runtime. Dropping it cancels every pending removal.
pub struct NotificationQueue {
    shared: Arc<Shared>,
    timers: TimerTable<NotificationId>,
    settings: QueueSettings,
}

impl NotificationQueue {
    pub fn new(settings: QueueSettings) -> NotificationQueue {
        NotificationQueue {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    entries: Vec::new(),
                    last_id: 0,
                    revision: 0,
                    closed: false,
                }),
                observers: ObserverRegistry::new(),
            }),
            timers: TimerTable::new(),
            settings,
        }
    }

    pub fn settings(&self) -> QueueSettings {
        self.settings
    }

    pub fn enqueue(&self, payload: NotificationPayload) -> NotificationHandle {
        let capacity = self.settings.capacity;
        let mut id = None;
        let mut evicted = Vec::new();

        let committed = self.shared.commit(|state| {
            state.last_id += 1;
            let new_id = NotificationId::new(state.last_id);
            id = Some(new_id);
            state
                .entries
                .insert(0, Notification::new(new_id, payload));
            if state.entries.len() > capacity {
                evicted = state
                    .entries
                    .split_off(capacity)
                    .into_iter()
                    .map(|n| n.id)
                    .collect();
            }
            true
        });

        let id = match id {
            Some(id) => id,
            // closed queue: hand out an inert handle
            None => NotificationId::new(0),
        };

        for old in &evicted {
            if *old != id {
                self.timers.cancel(old);
                log::debug!("notification {old} evicted by {id}");
            }
        }

        if committed && !evicted.contains(&id) {
            let shared = Arc::clone(&self.shared);
            self.timers.schedule(id, self.settings.lifetime, async move {
                shared.remove(id);
            });
        }

        NotificationHandle {
            id,
            queue: Arc::downgrade(&self.shared),
        }
    }

    /// Hide the notification. Unknown or already hidden ids are ignored.
    pub fn dismiss(&self, id: NotificationId) {
        self.shared.dismiss(id);
    }

    /// Hide every visible notification in a single state change.
    pub fn dismiss_all(&self) {
        self.shared.commit(|state| {
            let mut changed = false;
            for entry in state.entries.iter_mut().filter(|n| n.visible) {
                entry.visible = false;
                changed = true;
            }
            changed
        });
    }

    /// Replace the payload of a queued notification. Its lifetime is unchanged.
    pub fn update(&self, id: NotificationId, payload: NotificationPayload) {
        self.shared.update(id, payload);
    }

    pub fn subscribe<O>(&self, observer: O) -> Subscription
    where
        O: StateObserver<[Notification]> + 'static,
    {
        self.shared.observers.subscribe(observer)
    }

    pub fn snapshot(&self) -> Vec<Notification> {
        self.shared.lock().entries.clone()
    }

    pub fn get(&self, id: NotificationId) -> Option<Notification> {
        self.shared
            .lock()
            .entries
            .iter()
            .find(|n| n.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.shared.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancel all removal timers and drop every observer.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.lock();
            if state.closed {
                return;
            }
            state.closed = true;
        }
        self.timers.cancel_all();
        self.shared.observers.clear();
        log::debug!("notification queue shut down");
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        NotificationQueue::new(QueueSettings::default())
    }
}

impl Drop for NotificationQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Returned by [`NotificationQueue::enqueue`]; outliving the queue is harmless.
#[derive(Debug, Clone)]
pub struct NotificationHandle {
    id: NotificationId,
    queue: Weak<Shared>,
}

impl NotificationHandle {
    pub fn id(&self) -> NotificationId {
        self.id
    }

    pub fn dismiss(&self) {
        if let Some(queue) = self.queue.upgrade() {
            queue.dismiss(self.id);
        }
    }

    pub fn update(&self, payload: NotificationPayload) {
        if let Some(queue) = self.queue.upgrade() {
            queue.update(self.id, payload);
        }
    }
}
