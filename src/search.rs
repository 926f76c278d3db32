use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::SearchSettings;
use crate::data_models::VideoResult;
use crate::error::SearchError;
use crate::observer::{ObserverRegistry, StateObserver, Subscription};
use crate::provider::VideoLookup;
use crate::timer::TimerTable;

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchStatus {
    #[default]
    Idle,
    Pending,
    Resolved,
    Failed,
}

/// What observers of a [`DebouncedSearch`] receive.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchSnapshot {
    pub query: String,
    pub results: Vec<VideoResult>,
    pub status: SearchStatus,
    /// Only set while `status` is [`SearchStatus::Failed`].
    pub error: Option<String>,
}

struct SearchState {
    snapshot: SearchSnapshot,
    // bumped by every query mutation; a lookup may only commit under its own
    generation: u64,
    revision: u64,
    closed: bool,
}

struct Shared {
    provider: Arc<dyn VideoLookup>,
    state: Mutex<SearchState>,
    observers: ObserverRegistry<SearchSnapshot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SearchState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Apply `change` if `generation` is still current, then broadcast.
    fn commit<F>(&self, generation: u64, change: F) -> bool
    where
        F: FnOnce(&mut SearchSnapshot),
    {
        let (revision, snapshot) = {
            let mut state = self.lock();
            if state.closed || state.generation != generation {
                log::debug!(
                    "discarding stale search update for generation {generation} (current {})",
                    state.generation
                );
                return false;
            }
            change(&mut state.snapshot);
            state.revision += 1;
            (state.revision, state.snapshot.clone())
        };
        self.observers.notify(revision, &snapshot);
        true
    }

    async fn run_lookup(
        &self,
        query: String,
        generation: u64,
    ) -> Result<Vec<VideoResult>, SearchError> {
        self.commit(generation, |s| {
            s.status = SearchStatus::Pending;
            s.error = None;
        });

        log::debug!("looking up {query:?} (generation {generation})");
        let outcome = self.provider.lookup(&query).await;
        match &outcome {
            Ok(results) => {
                self.commit(generation, |s| {
                    s.results = results.clone();
                    s.status = SearchStatus::Resolved;
                    s.error = None;
                });
            }
            Err(e) => {
                log::warn!("search for {query:?} failed: {e}");
                self.commit(generation, |s| {
                    s.status = SearchStatus::Failed;
                    s.error = Some(e.to_string());
                });
            }
        }
        outcome
    }
}

/// Turns rapid query edits into at most one lookup per pause in typing.
///
/// Every [`DebouncedSearch::set_query`] restarts a quiet-period timer and
/// supersedes whatever lookup is pending or in flight; only the most recently
/// initiated lookup is ever allowed to touch `results`, `status` or `error`.
/// Lookup failures never escape: they become [`SearchStatus::Failed`].
///
/// Must be created inside a Tokio runtime; after that it may be driven from
/// any thread, and lookups run on the runtime it was created in. Dropping the
/// controller cancels its timers and any in-flight debounced lookup.
pub struct DebouncedSearch {
    shared: Arc<Shared>,
    timers: TimerTable<()>,
    settings: SearchSettings,
}

impl DebouncedSearch {
    pub fn new(provider: Arc<dyn VideoLookup>, settings: SearchSettings) -> DebouncedSearch {
        DebouncedSearch {
            shared: Arc::new(Shared {
                provider,
                state: Mutex::new(SearchState {
                    snapshot: SearchSnapshot::default(),
                    generation: 0,
                    revision: 0,
                    closed: false,
                }),
                observers: ObserverRegistry::new(),
            }),
            timers: TimerTable::new(),
            settings,
        }
    }

    pub fn settings(&self) -> SearchSettings {
        self.settings
    }

    /// Record new input and restart the debounce timer.
    ///
    /// Blank input clears the results right away and performs no lookup.
    pub fn set_query(&self, text: impl Into<String>) {
        let text = text.into();
        let Some(generation) = self.begin(&text) else {
            return;
        };

        if text.trim().is_empty() {
            self.timers.cancel(&());
            self.clear(generation);
            return;
        }

        let shared = Arc::clone(&self.shared);
        self.timers
            .schedule((), self.settings.quiet_period, async move {
                // the outcome is already folded into state
                let _ = shared.run_lookup(text, generation).await;
            });
    }

    /// Look `query` up now, skipping the quiet period.
    ///
    /// Supersedes any pending debounced lookup. The outcome is always returned
    /// to the caller, but only updates the controller's state if no newer
    /// query arrived while it was in flight.
    pub async fn search(&self, query: &str) -> Result<Vec<VideoResult>, SearchError> {
        self.timers.cancel(&());
        let Some(generation) = self.begin(query) else {
            return self.shared.provider.lookup(query).await;
        };

        if query.trim().is_empty() {
            self.clear(generation);
            return Ok(Vec::new());
        }

        self.shared.run_lookup(query.to_string(), generation).await
    }

    pub fn subscribe<O>(&self, observer: O) -> Subscription
    where
        O: StateObserver<SearchSnapshot> + 'static,
    {
        self.shared.observers.subscribe(observer)
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        self.shared.lock().snapshot.clone()
    }

    pub fn query(&self) -> String {
        self.shared.lock().snapshot.query.clone()
    }

    pub fn results(&self) -> Vec<VideoResult> {
        self.shared.lock().snapshot.results.clone()
    }

    pub fn status(&self) -> SearchStatus {
        self.shared.lock().snapshot.status
    }

    pub fn error(&self) -> Option<String> {
        self.shared.lock().snapshot.error.clone()
    }

    /// Whether a debounced lookup is waiting out its quiet period or in flight.
    pub fn has_pending_lookup(&self) -> bool {
        self.timers.is_armed(&())
    }

    /// Cancel pending work and drop all observers. Later calls leave state untouched.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.generation += 1;
        }
        self.timers.cancel_all();
        self.shared.observers.clear();
        log::debug!("search controller shut down");
    }

    fn begin(&self, query: &str) -> Option<u64> {
        let mut state = self.shared.lock();
        if state.closed {
            return None;
        }
        state.generation += 1;
        state.snapshot.query = query.to_string();
        Some(state.generation)
    }

    fn clear(&self, generation: u64) {
        self.shared.commit(generation, |s| {
            s.results.clear();
            s.status = SearchStatus::Idle;
            s.error = None;
        });
    }
}

impl Drop for DebouncedSearch {
    fn drop(&mut self) {
        self.shutdown();
    }
}
