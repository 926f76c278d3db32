use dashmap::DashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

struct Armed {
    seq: u64,
    token: CancellationToken,
}

/// Single-shot, cancellable timers keyed by the logical operation they belong to.
///
/// Every armed timer is a Tokio task racing `sleep(delay)` followed by its
/// work against a cancellation token. Tokens are children of one root token,
/// so [`TimerTable::cancel_all`] (also run on drop) disarms everything still
/// outstanding. Arming a key that is already armed cancels the older timer.
///
/// The runtime is captured when the table is built, so timers can be armed
/// from any thread afterwards.
pub struct TimerTable<K>
where
    K: Eq + Hash,
{
    runtime: Handle,
    armed: Arc<DashMap<K, Armed>>,
    root: CancellationToken,
    next_seq: AtomicU64,
}

impl<K> TimerTable<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    /// Panics outside a Tokio runtime.
    pub fn new() -> Self {
        Self::with_runtime(Handle::current())
    }

    pub fn with_runtime(runtime: Handle) -> Self {
        Self {
            runtime,
            armed: Arc::new(DashMap::new()),
            root: CancellationToken::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Run `task` once `delay` has elapsed unless `key` is cancelled or re-armed first.
    ///
    /// Cancellation also drops `task` if it is already running. After
    /// [`TimerTable::cancel_all`] this is a no-op.
    pub fn schedule<F>(&self, key: K, delay: Duration, task: F) -> CancellationToken
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.root.child_token();
        if self.root.is_cancelled() {
            return token;
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let previous = self.armed.insert(
            key.clone(),
            Armed {
                seq,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.token.cancel();
        }

        let armed = Arc::clone(&self.armed);
        let guard = token.clone();
        self.runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = guard.cancelled() => {}
                _ = async {
                    tokio::time::sleep(delay).await;
                    task.await;
                } => {}
            }
            armed.remove_if(&key, |_, entry| entry.seq == seq);
        });

        token
    }

    /// Disarm the timer for `key`. Returns whether one was armed.
    pub fn cancel(&self, key: &K) -> bool {
        match self.armed.remove(key) {
            Some((_, entry)) => {
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Disarm every timer, including ones scheduled later.
    pub fn cancel_all(&self) {
        self.root.cancel();
        self.armed.clear();
    }

    pub fn is_armed(&self, key: &K) -> bool {
        self.armed.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.armed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }
}

impl<K> Default for TimerTable<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Drop for TimerTable<K>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        self.root.cancel();
    }
}
